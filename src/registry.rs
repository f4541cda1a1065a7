//! Dense identifier registry.
//!
//! Every numeric array in geosoft is addressed by a dense integer index rather than
//! by the string identifier it belongs to. [`IdentifierRegistry`] hands out those
//! indices in first-seen order and answers lookups in both directions.
//!
//! # Invariants
//!
//! - Indices are dense: after registering N distinct identifiers the index set is
//!   exactly `0..N`
//! - An identifier keeps its index for the lifetime of the registry; there is no
//!   removal
//!
//! # Example
//!
//! ```
//! use geosoft::registry::IdentifierRegistry;
//!
//! let mut probes = IdentifierRegistry::new();
//! assert_eq!(probes.register("1007_s_at"), 0);
//! assert_eq!(probes.register("1053_at"), 1);
//! assert_eq!(probes.register("1007_s_at"), 0);
//!
//! assert_eq!(probes.index_of("1053_at"), Some(1));
//! assert_eq!(probes.id_at(0), Some("1007_s_at"));
//! ```

use indexmap::IndexSet;

/// Bidirectional string <-> dense index mapping.
///
/// Backed by an insertion-ordered set, so the reverse direction is the set's
/// position and is kept in step with every registration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifierRegistry {
    ids: IndexSet<String>,
}

impl IdentifierRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry sized for `capacity` identifiers
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ids: IndexSet::with_capacity(capacity),
        }
    }

    /// Return the index of `id`, assigning the next free index if it is new
    pub fn register(&mut self, id: &str) -> usize {
        if let Some(index) = self.ids.get_index_of(id) {
            return index;
        }
        self.ids.insert_full(id.to_string()).0
    }

    /// Index previously assigned to `id`
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.ids.get_index_of(id)
    }

    /// Identifier registered at `index`
    pub fn id_at(&self, index: usize) -> Option<&str> {
        self.ids.get_index(index).map(String::as_str)
    }

    /// Whether `id` has been registered
    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Number of registered identifiers
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether nothing has been registered
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Identifiers in index order
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &str> + '_ {
        self.ids.iter().map(String::as_str)
    }
}

impl<S: AsRef<str>> FromIterator<S> for IdentifierRegistry {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut registry = Self::new();
        for id in iter {
            registry.register(id.as_ref());
        }
        registry
    }
}
