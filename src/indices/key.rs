use std::collections::{HashMap, HashSet};

use crate::models::{Id, Identifier, Value};

/// A single-key secondary index: key → value → element ids.
///
/// The index never inspects elements itself; the owning graph drives it
/// through `auto_update` and `rebuild`, which keeps the invariant that a
/// bucket holds exactly the live elements currently carrying that value.
#[derive(Debug, Default)]
pub struct KeyIndex {
    indexed: HashSet<Identifier>,
    entries: HashMap<Identifier, HashMap<Value, HashSet<Id>>>,
}

impl KeyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts indexing a key. Idempotent; returns whether the key was new.
    pub fn create(&mut self, key: Identifier) -> bool {
        let inserted = self.indexed.insert(key.clone());
        if inserted {
            self.entries.insert(key, HashMap::new());
        }
        inserted
    }

    /// Stops indexing a key and drops its entries. Idempotent.
    pub fn drop_key(&mut self, key: &Identifier) -> bool {
        self.entries.remove(key);
        self.indexed.remove(key)
    }

    pub fn is_indexed(&self, key: &Identifier) -> bool {
        self.indexed.contains(key)
    }

    pub fn indexed_keys(&self) -> Vec<Identifier> {
        let mut keys: Vec<Identifier> = self.indexed.iter().cloned().collect();
        keys.sort();
        keys
    }

    /// Elements whose `key` property currently equals `value`. Empty when
    /// the key is not indexed or the value is absent.
    pub fn get(&self, key: &Identifier, value: &Value) -> HashSet<Id> {
        self.entries
            .get(key)
            .and_then(|buckets| buckets.get(value))
            .cloned()
            .unwrap_or_default()
    }

    /// Moves an element between value buckets. `old` detaches, `new`
    /// attaches; either may be absent for a pure add or remove. No-op when
    /// the key is not indexed.
    pub fn auto_update(&mut self, key: &Identifier, new: Option<&Value>, old: Option<&Value>, id: Id) {
        let buckets = match self.entries.get_mut(key) {
            Some(buckets) => buckets,
            None => return,
        };

        if let Some(old) = old {
            if let Some(ids) = buckets.get_mut(old) {
                ids.remove(&id);
                if ids.is_empty() {
                    buckets.remove(old);
                }
            }
        }

        if let Some(new) = new {
            buckets.entry(new.clone()).or_default().insert(id);
        }
    }

    /// Clears a key's entries and refills them from an element scan. Each
    /// scan item carries every live value the element has for the key.
    pub fn rebuild<I>(&mut self, key: &Identifier, elements: I)
    where
        I: IntoIterator<Item = (Id, Vec<Value>)>,
    {
        if !self.indexed.contains(key) {
            return;
        }
        self.entries.insert(key.clone(), HashMap::new());
        for (id, values) in elements {
            for value in values {
                self.auto_update(key, Some(&value), None, id);
            }
        }
    }

    /// Distinct indexed values under a key, for selectivity estimation.
    pub fn distinct_values(&self, key: &Identifier) -> usize {
        self.entries.get(key).map_or(0, HashMap::len)
    }

    /// Total element references under a key.
    pub fn total_entries(&self, key: &Identifier) -> usize {
        self.entries
            .get(key)
            .map_or(0, |buckets| buckets.values().map(HashSet::len).sum())
    }
}
