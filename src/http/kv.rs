use serde::{Deserialize, Serialize};

use crate::constants::HEADER_COMMENT_MARKER;

/// Key-Value pair for headers
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValuePair {
    #[serde(default)]
    pub id: u64,
    pub key: String,
    pub value: String,
}

impl KeyValuePair {
    pub fn new(id: u64, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id,
            key: key.into(),
            value: value.into(),
        }
    }

    /// Rows with an empty or commented-out key are kept but never sent
    pub fn is_active(&self) -> bool {
        !self.key.is_empty() && !self.key.starts_with(HEADER_COMMENT_MARKER)
    }

    /// Parse a `Key: Value` line as typed on the command line
    pub fn parse_line(id: u64, line: &str) -> Option<Self> {
        let (key, value) = line.split_once(':')?;
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        Some(Self::new(id, key, value.trim()))
    }
}

/// Ordered, editable list of key/value rows
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyValueList {
    items: Vec<KeyValuePair>,
    next_id: u64,
}

impl KeyValueList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row and return its id
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.items.push(KeyValuePair::new(id, key, value));
        id
    }

    /// Insert a row at the front
    pub fn prepend(&mut self, key: impl Into<String>, value: impl Into<String>) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.items.insert(0, KeyValuePair::new(id, key, value));
        id
    }

    pub fn update_key(&mut self, id: u64, key: impl Into<String>) -> bool {
        match self.items.iter_mut().find(|item| item.id == id) {
            Some(item) => {
                item.key = key.into();
                true
            }
            None => false,
        }
    }

    pub fn update_value(&mut self, id: u64, value: impl Into<String>) -> bool {
        match self.items.iter_mut().find(|item| item.id == id) {
            Some(item) => {
                item.value = value.into();
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: u64) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        self.items.len() != before
    }

    /// Id of the first row whose key matches, ignoring case
    pub fn id_of(&self, key: &str) -> Option<u64> {
        self.items
            .iter()
            .find(|item| item.key.eq_ignore_ascii_case(key))
            .map(|item| item.id)
    }

    /// Case-insensitive check for a key among all rows
    pub fn contains_key(&self, key: &str) -> bool {
        self.items.iter().any(|item| item.key.eq_ignore_ascii_case(key))
    }

    pub fn pairs(&self) -> &[KeyValuePair] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_pairs(self) -> Vec<KeyValuePair> {
        self.items
    }
}

impl FromIterator<(String, String)> for KeyValueList {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut list = KeyValueList::new();
        for (key, value) in iter {
            list.add(key, value);
        }
        list
    }
}
