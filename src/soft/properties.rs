//! Multi-valued section property bag.

use indexmap::IndexMap;

/// Ordered `key -> values` bag collected from `!section_key = value` lines.
///
/// A key may repeat (e.g. `!Sample_characteristics_ch1`), in which case its values
/// are kept in file order. Keys are stored without the section prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionProperties {
    values: IndexMap<String, Vec<String>>,
}

impl SectionProperties {
    /// Create an empty bag
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value for `key`
    pub fn push(&mut self, key: &str, value: String) {
        match self.values.get_mut(key) {
            Some(values) => values.push(value),
            None => {
                self.values.insert(key.to_string(), vec![value]);
            }
        }
    }

    /// All values of `key` in file order
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.values.get(key).map(Vec::as_slice)
    }

    /// First value of `key`
    pub fn first(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|values| values.first()).map(String::as_str)
    }

    /// Whether `key` occurred
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no property was collected
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `(key, values)` pairs in first-seen key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> + '_ {
        self.values.iter().map(|(key, values)| (key.as_str(), values.as_slice()))
    }
}
