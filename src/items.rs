//! In-memory item table mirrored from the event stream.
//!
//! The stream loop applies every event here before publishing it, so a
//! callback reading the registry always sees at least the state carried by
//! the event it was triggered by.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use crate::events::{Event, ItemDefinition};

/// Last known state of one item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Item {
    pub name: String,
    /// Peer item type (`Switch`, `Number`, ...) when known.
    pub item_type: Option<String>,
    pub value: Option<String>,
    pub tags: BTreeSet<String>,
    pub groups: BTreeSet<String>,
}

impl Item {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    fn apply_definition(&mut self, def: &ItemDefinition) {
        self.item_type = Some(def.item_type.clone());
        self.tags = def.tags.clone();
        self.groups = def.groups.clone();
    }
}

/// Shared item table. Cloning shares the same table.
#[derive(Debug, Clone, Default)]
pub struct ItemRegistry {
    items: Arc<RwLock<HashMap<String, Item>>>,
}

impl ItemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update the table from an incoming event.
    pub fn apply(&self, event: &Event) {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        match event {
            Event::ItemState { name, value }
            | Event::ItemStateChanged { name, value, .. }
            | Event::GroupItemStateChanged { name, value, .. } => {
                items
                    .entry(name.clone())
                    .or_insert_with(|| Item::named(name))
                    .value = value.clone();
            }
            Event::ItemAdded(def) | Event::ItemUpdated(def) => {
                items
                    .entry(def.name.clone())
                    .or_insert_with(|| Item::named(&def.name))
                    .apply_definition(def);
            }
            Event::ItemRemoved { name } => {
                items.remove(name);
            }
            _ => {}
        }
    }

    pub fn get(&self, name: &str) -> Option<Item> {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Current value of `name`; `None` when unknown or without state.
    pub fn value(&self, name: &str) -> Option<String> {
        self.get(name).and_then(|item| item.value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.items.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
