use crate::traits::HttpError;

/// Classification of a request result, made once at the transport boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportOutcome {
    /// Connectivity to the peer is lost.
    Disconnect,
    /// The peer answered with a 5xx status.
    ServerNotReady,
    /// A request issued with `expect_success` got a status >= 400.
    ExpectedSuccessViolation,
    /// Anything else; the caller gets the result as is.
    Other,
}

impl TransportOutcome {
    /// Whether this outcome takes the connection offline.
    pub fn goes_offline(&self) -> bool {
        !matches!(self, TransportOutcome::Other)
    }
}

pub fn classify_http_error(err: &HttpError) -> TransportOutcome {
    match err {
        HttpError::ConnectionFailed(_) | HttpError::Io(_) | HttpError::Timeout(_) => {
            TransportOutcome::Disconnect
        }
        HttpError::ServerError { status, .. } if *status >= 500 => TransportOutcome::ServerNotReady,
        _ => TransportOutcome::Other,
    }
}

pub fn classify_status(status: u16, expect_success: bool) -> TransportOutcome {
    if status >= 500 {
        TransportOutcome::ServerNotReady
    } else if expect_success && status >= 400 {
        TransportOutcome::ExpectedSuccessViolation
    } else {
        TransportOutcome::Other
    }
}
