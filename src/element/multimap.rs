use std::hash::Hash;

use indexmap::IndexMap;

/// Insertion-ordered multimap; keys without values are dropped.
#[derive(Debug)]
pub(crate) struct MultiMap<K, V> {
    entries: IndexMap<K, Vec<V>>,
}

impl<K, V> Default for MultiMap<K, V> {
    fn default() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }
}

impl<K: Hash + Eq, V: PartialEq> MultiMap<K, V> {
    pub(crate) fn insert(&mut self, key: K, value: V) {
        self.entries.entry(key).or_default().push(value);
    }

    /// Remove one occurrence of `value` under `key`.
    pub(crate) fn remove(&mut self, key: &K, value: &V) -> bool {
        let Some(values) = self.entries.get_mut(key) else {
            return false;
        };
        let Some(pos) = values.iter().position(|v| v == value) else {
            return false;
        };
        values.remove(pos);
        if values.is_empty() {
            self.entries.shift_remove(key);
        }
        true
    }

    pub(crate) fn get(&self, key: &K) -> &[V] {
        self.entries.get(key).map_or(&[], Vec::as_slice)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries
            .iter()
            .flat_map(|(k, values)| values.iter().map(move |v| (k, v)))
    }

    pub(crate) fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
