use std::collections::HashMap;

/// Insertion-ordered owning map from string id to entry.
///
/// Every catalog entity lives in exactly one registry; entries are never
/// removed, so positions stay stable for the lifetime of the catalog.
#[derive(Debug, Clone)]
pub struct Registry<V> {
    entries: Vec<(String, V)>,
    positions: HashMap<String, usize>,
    /// One past the largest decimal key seen so far.
    next: usize,
}

impl<V> Default for Registry<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            positions: HashMap::new(),
            next: 0,
        }
    }
}

impl<V> Registry<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.positions.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.positions.get(key).map(|&ix| &self.entries[ix].1)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        self.positions.get(key).map(|&ix| &mut self.entries[ix].1)
    }

    /// Insert a new entry; hands the value back if the key is taken.
    pub fn insert(&mut self, key: impl Into<String>, value: V) -> Result<&mut V, V> {
        let key = key.into();
        if self.positions.contains_key(&key) {
            return Err(value);
        }
        let ix = self.entries.len();
        self.note_key(&key);
        self.positions.insert(key.clone(), ix);
        self.entries.push((key, value));
        Ok(&mut self.entries[ix].1)
    }

    /// Look up an entry, creating it with `make` if absent.
    ///
    /// The flag is true when the entry was created by this call.
    pub fn get_or_insert_with(&mut self, key: &str, make: impl FnOnce() -> V) -> (&mut V, bool) {
        if let Some(&ix) = self.positions.get(key) {
            return (&mut self.entries[ix].1, false);
        }
        let ix = self.entries.len();
        self.note_key(key);
        self.positions.insert(key.to_string(), ix);
        self.entries.push((key.to_string(), make()));
        (&mut self.entries[ix].1, true)
    }

    /// Decimal id one past the largest decimal key in use, never below `len()`.
    ///
    /// Gaps left by a loaded catalog (`"0"`, `"5"`) are not refilled, so ids
    /// keep growing in creation order. For registries filled by ingestion
    /// alone this is simply `len()`.
    pub fn next_id(&self) -> String {
        self.next.max(self.entries.len()).to_string()
    }

    fn note_key(&mut self, key: &str) {
        if let Ok(n) = key.parse::<usize>() {
            self.next = self.next.max(n.saturating_add(1));
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }
}

impl<V: PartialEq> PartialEq for Registry<V> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}
