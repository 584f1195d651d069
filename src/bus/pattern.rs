use std::fmt;

use regex::Regex;

/// Topic selector of a listener.
///
/// A plain string matches one topic exactly. `*` matches any run of
/// characters, so `items/Kitchen_*` matches every kitchen item and a lone `*`
/// matches every topic.
#[derive(Debug, Clone)]
pub enum TopicPattern {
    Any,
    Exact(String),
    Glob { source: String, regex: Regex },
}

impl TopicPattern {
    pub fn new(pattern: &str) -> Self {
        if pattern == "*" {
            return TopicPattern::Any;
        }
        if !pattern.contains('*') {
            return TopicPattern::Exact(pattern.to_string());
        }

        let body: Vec<String> = pattern.split('*').map(regex::escape).collect();
        match Regex::new(&format!("^{}$", body.join(".*"))) {
            Ok(regex) => TopicPattern::Glob {
                source: pattern.to_string(),
                regex,
            },
            // every piece is escaped, so this only guards against size limits
            Err(_) => TopicPattern::Exact(pattern.to_string()),
        }
    }

    pub fn matches(&self, topic: &str) -> bool {
        match self {
            TopicPattern::Any => true,
            TopicPattern::Exact(exact) => exact == topic,
            TopicPattern::Glob { regex, .. } => regex.is_match(topic),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TopicPattern::Any => "*",
            TopicPattern::Exact(exact) => exact,
            TopicPattern::Glob { source, .. } => source,
        }
    }
}

impl From<&str> for TopicPattern {
    fn from(pattern: &str) -> Self {
        Self::new(pattern)
    }
}

impl From<String> for TopicPattern {
    fn from(pattern: String) -> Self {
        Self::new(&pattern)
    }
}

impl fmt::Display for TopicPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
