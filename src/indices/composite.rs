use std::collections::{HashMap, HashSet};

use crate::errors::{Error, Result};
use crate::models::{Id, Identifier, Value};

/// A composite secondary index: an ordered list of keys → value tuple →
/// element ids, with prefix lookup support.
///
/// Two composites over the same keys in different order are distinct
/// indices. On any contributing key change the element is conservatively
/// wiped from every bucket of the affected lists before reinsertion, since
/// several keys may have changed between update calls.
#[derive(Debug, Default)]
pub struct CompositeIndex {
    indexed: HashSet<Vec<Identifier>>,
    entries: HashMap<Vec<Identifier>, HashMap<Vec<Value>, HashSet<Id>>>,
    participation: HashMap<Identifier, HashSet<Vec<Identifier>>>,
}

impl CompositeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts maintaining a composite over an ordered key list.
    ///
    /// # Errors
    /// Returns `InvalidIndexDefinition` when the list has fewer than two
    /// keys or repeats a key.
    pub fn create(&mut self, keys: Vec<Identifier>) -> Result<bool> {
        if keys.len() < 2 {
            return Err(Error::InvalidIndexDefinition);
        }
        let mut seen = HashSet::with_capacity(keys.len());
        if !keys.iter().all(|k| seen.insert(k)) {
            return Err(Error::InvalidIndexDefinition);
        }

        if !self.indexed.insert(keys.clone()) {
            return Ok(false);
        }
        for key in &keys {
            self.participation.entry(key.clone()).or_default().insert(keys.clone());
        }
        self.entries.insert(keys, HashMap::new());
        Ok(true)
    }

    /// Drops a composite. Idempotent.
    pub fn drop_index(&mut self, keys: &[Identifier]) -> bool {
        if !self.indexed.remove(keys) {
            return false;
        }
        self.entries.remove(keys);
        for key in keys {
            if let Some(lists) = self.participation.get_mut(key) {
                lists.remove(keys);
                if lists.is_empty() {
                    self.participation.remove(key);
                }
            }
        }
        true
    }

    pub fn is_indexed(&self, keys: &[Identifier]) -> bool {
        self.indexed.contains(keys)
    }

    pub fn indexed_lists(&self) -> Vec<Vec<Identifier>> {
        let mut lists: Vec<Vec<Identifier>> = self.indexed.iter().cloned().collect();
        lists.sort();
        lists
    }

    /// Exact tuple lookup against an indexed key list.
    ///
    /// # Errors
    /// Returns `NotIndexed` if `keys` is not an indexed list.
    pub fn get(&self, keys: &[Identifier], values: &[Value]) -> Result<HashSet<Id>> {
        let buckets = self.entries.get(keys).ok_or(Error::NotIndexed)?;
        Ok(buckets.get(values).cloned().unwrap_or_default())
    }

    /// Prefix lookup: finds an indexed list whose leading segment equals
    /// `prefix_keys` (preferring the shortest covering index) and unions the
    /// buckets whose tuple starts with `prefix_values`.
    ///
    /// # Errors
    /// Returns `NotIndexed` when no indexed list starts with `prefix_keys`.
    pub fn get_partial(&self, prefix_keys: &[Identifier], prefix_values: &[Value]) -> Result<HashSet<Id>> {
        let list = self
            .applicable_for_query(prefix_keys)
            .into_iter()
            .next()
            .ok_or(Error::NotIndexed)?;

        let mut ids = HashSet::new();
        if let Some(buckets) = self.entries.get(&list) {
            for (tuple, bucket) in buckets {
                if tuple.len() >= prefix_values.len() && tuple[..prefix_values.len()] == *prefix_values {
                    ids.extend(bucket.iter().copied());
                }
            }
        }
        Ok(ids)
    }

    /// Indexed lists whose leading segment equals `query_keys`, shortest
    /// first.
    pub fn applicable_for_query(&self, query_keys: &[Identifier]) -> Vec<Vec<Identifier>> {
        let mut lists: Vec<Vec<Identifier>> = self
            .indexed
            .iter()
            .filter(|list| list.len() >= query_keys.len() && list[..query_keys.len()] == *query_keys)
            .cloned()
            .collect();
        lists.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
        lists
    }

    /// The longest indexed list fully covered by a set of equality keys.
    /// Ties break to the lexicographically smallest list so planning stays
    /// deterministic.
    pub fn best_for_equality_set(&self, query_keys: &HashSet<Identifier>) -> Option<Vec<Identifier>> {
        self.indexed
            .iter()
            .filter(|list| list.iter().all(|k| query_keys.contains(k)))
            .max_by(|a, b| a.len().cmp(&b.len()).then_with(|| b.cmp(a)))
            .cloned()
    }

    /// Reindexes an element after one of its keys changed: the element is
    /// removed from every bucket of each list containing the key, then
    /// reattached iff it has a live value for every key in the list.
    /// `value_of` reads the element's current first live value per key.
    pub fn auto_update(&mut self, changed_key: &Identifier, id: Id, value_of: &dyn Fn(&Identifier) -> Option<Value>) {
        let lists: Vec<Vec<Identifier>> = match self.participation.get(changed_key) {
            Some(lists) => lists.iter().cloned().collect(),
            None => return,
        };

        for list in lists {
            self.detach_from_list(&list, id);
            let tuple: Option<Vec<Value>> = list.iter().map(value_of).collect();
            if let Some(tuple) = tuple {
                if let Some(buckets) = self.entries.get_mut(&list) {
                    buckets.entry(tuple).or_default().insert(id);
                }
            }
        }
    }

    /// Removes an element from every bucket of every list. Used on element
    /// removal.
    pub fn detach_element(&mut self, id: Id) {
        let lists: Vec<Vec<Identifier>> = self.entries.keys().cloned().collect();
        for list in lists {
            self.detach_from_list(&list, id);
        }
    }

    /// Clears a list's entries and refills them from an element scan. Scan
    /// items carry the element's value per key, in list order; elements
    /// missing any key are skipped.
    pub fn rebuild<I>(&mut self, keys: &[Identifier], elements: I)
    where
        I: IntoIterator<Item = (Id, Vec<Option<Value>>)>,
    {
        if !self.indexed.contains(keys) {
            return;
        }
        let buckets = self.entries.entry(keys.to_vec()).or_default();
        buckets.clear();
        for (id, values) in elements {
            let tuple: Option<Vec<Value>> = values.into_iter().collect();
            if let Some(tuple) = tuple {
                buckets.entry(tuple).or_default().insert(id);
            }
        }
    }

    fn detach_from_list(&mut self, list: &[Identifier], id: Id) {
        if let Some(buckets) = self.entries.get_mut(list) {
            buckets.retain(|_, bucket| {
                bucket.remove(&id);
                !bucket.is_empty()
            });
        }
    }
}
