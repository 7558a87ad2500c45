//! Keyed collections for fan-out
//!
//! Fan-out inputs are either positional lists or named mappings that keep
//! their definition order. Results come back in a container of the same shape
//! with each value at its input key, whatever order the work finished in.

use std::collections::HashMap;
use std::fmt;
use std::ops::Index;

/// Position of an entry in a [`Keyed`] collection
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Index(usize),
    Name(String),
}

impl Key {
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Key::Index(index) => Some(*index),
            Key::Name(_) => None,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Key::Index(_) => None,
            Key::Name(name) => Some(name),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Index(index) => write!(f, "{}", index),
            Key::Name(name) => write!(f, "{}", name),
        }
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Key::Index(index)
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Name(name.to_string())
    }
}

/// A list, or a mapping with stable definition order
#[derive(Debug, Clone, PartialEq)]
pub enum Keyed<T> {
    List(Vec<T>),
    Map(Vec<(String, T)>),
}

impl<T> Keyed<T> {
    pub fn list(items: impl IntoIterator<Item = T>) -> Self {
        Keyed::List(items.into_iter().collect())
    }

    /// Build a mapping. A repeated name replaces the earlier value in place.
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, T)>) -> Self {
        let mut pairs: Vec<(String, T)> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        for (name, value) in entries {
            let name = name.into();
            match positions.get(&name).copied() {
                Some(position) => pairs[position].1 = value,
                None => {
                    positions.insert(name.clone(), pairs.len());
                    pairs.push((name, value));
                }
            }
        }
        Keyed::Map(pairs)
    }

    pub fn len(&self) -> usize {
        match self {
            Keyed::List(items) => items.len(),
            Keyed::Map(pairs) => pairs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Keyed::List(_))
    }

    /// Keys in enumeration order
    pub fn keys(&self) -> Vec<Key> {
        match self {
            Keyed::List(items) => (0..items.len()).map(Key::Index).collect(),
            Keyed::Map(pairs) => pairs.iter().map(|(name, _)| Key::Name(name.clone())).collect(),
        }
    }

    pub fn get(&self, key: &Key) -> Option<&T> {
        match (self, key) {
            (Keyed::List(items), Key::Index(index)) => items.get(*index),
            (Keyed::Map(pairs), Key::Name(name)) => pairs
                .iter()
                .find(|(existing, _)| existing == name)
                .map(|(_, value)| value),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, key: &Key) -> Option<&mut T> {
        match (self, key) {
            (Keyed::List(items), Key::Index(index)) => items.get_mut(*index),
            (Keyed::Map(pairs), Key::Name(name)) => pairs
                .iter_mut()
                .find(|(existing, _)| existing == name)
                .map(|(_, value)| value),
            _ => None,
        }
    }

    /// Entries with their keys, in enumeration order
    pub fn into_entries(self) -> Vec<(Key, T)> {
        match self {
            Keyed::List(items) => items
                .into_iter()
                .enumerate()
                .map(|(index, item)| (Key::Index(index), item))
                .collect(),
            Keyed::Map(pairs) => pairs
                .into_iter()
                .map(|(name, value)| (Key::Name(name), value))
                .collect(),
        }
    }

    /// An all-empty container with the same shape and keys
    pub fn empty_like<U>(&self) -> Keyed<Option<U>> {
        match self {
            Keyed::List(items) => Keyed::List(items.iter().map(|_| None).collect()),
            Keyed::Map(pairs) => {
                Keyed::Map(pairs.iter().map(|(name, _)| (name.clone(), None)).collect())
            }
        }
    }
}

impl<T> Keyed<Option<T>> {
    /// Store a value at `key`; unknown keys are ignored
    pub fn set(&mut self, key: &Key, value: Option<T>) {
        if let Some(slot) = self.get_mut(key) {
            *slot = value;
        }
    }

    /// The value at `key`, if one was stored
    pub fn value(&self, key: impl Into<Key>) -> Option<&T> {
        self.get(&key.into()).and_then(Option::as_ref)
    }

    /// Unwrap every slot, or `None` if any slot is still empty
    pub fn into_complete(self) -> Option<Keyed<T>> {
        match self {
            Keyed::List(items) => items.into_iter().collect::<Option<Vec<_>>>().map(Keyed::List),
            Keyed::Map(pairs) => pairs
                .into_iter()
                .map(|(name, value)| value.map(|value| (name, value)))
                .collect::<Option<Vec<_>>>()
                .map(Keyed::Map),
        }
    }
}

impl<T> From<Vec<T>> for Keyed<T> {
    fn from(items: Vec<T>) -> Self {
        Keyed::List(items)
    }
}

impl<T> Index<usize> for Keyed<T> {
    type Output = T;

    /// Positional access for both shapes
    fn index(&self, index: usize) -> &T {
        match self {
            Keyed::List(items) => &items[index],
            Keyed::Map(pairs) => &pairs[index].1,
        }
    }
}

impl<T> Index<&str> for Keyed<T> {
    type Output = T;

    fn index(&self, name: &str) -> &T {
        match self.get(&Key::Name(name.to_string())) {
            Some(value) => value,
            None => panic!("no entry named `{}`", name),
        }
    }
}
