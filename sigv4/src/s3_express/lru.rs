/// A small least-recently-used map.
///
/// Entries are kept in recency order, most recent first. Lookups and
/// inserts move the entry to the front; inserts past capacity drop the
/// tail. The cache holds at most a few hundred entries so a plain vector
/// beats a linked-hash structure here.
#[derive(Debug)]
pub(crate) struct Lru<K, V> {
    capacity: usize,
    entries: Vec<(K, V)>,
}

impl<K: PartialEq, V> Lru<K, V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a key, promoting it to most recently used.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        let entry = self.entries.remove(pos);
        self.entries.insert(0, entry);
        Some(&mut self.entries[0].1)
    }

    /// Insert a value, replacing any existing entry for the key and
    /// evicting the least recently used entry when over capacity.
    pub fn insert(&mut self, key: K, value: V) {
        if let Some(pos) = self.entries.iter().position(|(k, _)| *k == key) {
            self.entries.remove(pos);
        }
        self.entries.insert(0, (key, value));
        self.entries.truncate(self.capacity);
    }

    /// Keep only entries for which the predicate returns true.
    pub fn retain(&mut self, mut f: impl FnMut(&K, &mut V) -> bool) {
        self.entries.retain_mut(|(k, v)| f(k, v));
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&K, &mut V)> {
        self.entries.iter_mut().map(|(k, v)| (&*k, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_insert_and_get_promote() {
        let mut lru = Lru::new(3);
        lru.insert("a", 1);
        lru.insert("b", 2);
        lru.insert("c", 3);

        // Touch "a" so "b" becomes the least recently used.
        assert_eq!(lru.get_mut(&"a"), Some(&mut 1));
        lru.insert("d", 4);

        assert_eq!(lru.len(), 3);
        assert!(lru.get_mut(&"b").is_none());
        assert!(lru.get_mut(&"a").is_some());
    }

    #[test]
    fn test_insert_replaces_existing() {
        let mut lru = Lru::new(2);
        lru.insert("a", 1);
        lru.insert("a", 2);

        assert_eq!(lru.len(), 1);
        assert_eq!(lru.get_mut(&"a"), Some(&mut 2));
    }

    #[test]
    fn test_retain() {
        let mut lru = Lru::new(4);
        lru.insert("a", 1);
        lru.insert("b", 2);
        lru.insert("c", 3);

        lru.retain(|_, v| *v % 2 == 1);
        assert_eq!(lru.len(), 2);
        assert!(lru.get_mut(&"b").is_none());
    }
}
