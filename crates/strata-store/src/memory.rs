use std::ops::Bound;
use std::sync::{Arc, Mutex, MutexGuard};

use arc_swap::ArcSwap;
use imbl::OrdMap;

use crate::error::StoreError;
use crate::store::{BatchOp, IterRange, KvPair, Store};

type Keyspace = OrdMap<Vec<u8>, Vec<u8>>;

/// In-memory ordered store backed by a persistent map.
///
/// The whole keyspace lives in one `OrdMap` published through an
/// `ArcSwap`; sublevels are key prefixes (`!{name}!`, so sublevel names
/// must not contain `!`). A batch clones the map, applies its ops, and
/// swaps the result in — readers see either the old or the new snapshot,
/// never a partial batch. Iterators hold the snapshot they started on.
pub struct MemoryStore {
    data: ArcSwap<Keyspace>,
    write_lock: Mutex<()>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            data: ArcSwap::new(Arc::new(OrdMap::new())),
            write_lock: Mutex::new(()),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only one writer may mutate at a time.
    fn acquire_write_lock(&self) -> Result<MutexGuard<'_, ()>, StoreError> {
        self.write_lock
            .lock()
            .map_err(|e| StoreError::Storage(format!("write lock poisoned: {e}")))
    }
}

fn sublevel_prefix(sublevel: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(sublevel.len() + 2);
    prefix.push(b'!');
    prefix.extend_from_slice(sublevel.as_bytes());
    prefix.push(b'!');
    prefix
}

fn full_key(sublevel: &str, key: &[u8]) -> Vec<u8> {
    let mut full = sublevel_prefix(sublevel);
    full.extend_from_slice(key);
    full
}

/// The smallest key strictly greater than every key carrying `prefix`.
/// The prefix always ends in `!`, so the increment never overflows.
fn prefix_end(prefix: &[u8]) -> Vec<u8> {
    let mut end = prefix.to_vec();
    let last = end.last_mut().expect("sublevel prefix is never empty");
    *last += 1;
    end
}

impl Store for MemoryStore {
    fn get(&self, sublevel: &str, key: &[u8]) -> Result<Vec<u8>, StoreError> {
        let snapshot = self.data.load_full();
        snapshot
            .get(&full_key(sublevel, key))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    fn put(&self, sublevel: &str, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.batch(vec![BatchOp::put(sublevel, key, value)])
    }

    fn del(&self, sublevel: &str, key: &[u8]) -> Result<(), StoreError> {
        self.batch(vec![BatchOp::del(sublevel, key)])
    }

    fn batch(&self, ops: Vec<BatchOp>) -> Result<(), StoreError> {
        let _guard = self.acquire_write_lock()?;
        let mut data = (*self.data.load_full()).clone();
        for op in ops {
            match op {
                BatchOp::Put {
                    sublevel,
                    key,
                    value,
                } => {
                    data.insert(full_key(&sublevel, &key), value);
                }
                BatchOp::Del { sublevel, key } => {
                    data.remove(&full_key(&sublevel, &key));
                }
            }
        }
        self.data.store(Arc::new(data));
        Ok(())
    }

    fn iter(
        &self,
        sublevel: &str,
        range: IterRange,
    ) -> Result<Box<dyn Iterator<Item = Result<KvPair, StoreError>> + '_>, StoreError> {
        let prefix = sublevel_prefix(sublevel);

        let lower = match (&range.gt, &range.gte) {
            (Some(gt), _) => Bound::Excluded(full_key(sublevel, gt)),
            (None, Some(gte)) => Bound::Included(full_key(sublevel, gte)),
            (None, None) => Bound::Included(prefix.clone()),
        };
        let upper = match (&range.lt, &range.lte) {
            (Some(lt), _) => Bound::Excluded(full_key(sublevel, lt)),
            (None, Some(lte)) => Bound::Included(full_key(sublevel, lte)),
            (None, None) => Bound::Excluded(prefix_end(&prefix)),
        };

        // An inverted range yields nothing rather than panicking.
        let inverted = match (&lower, &upper) {
            (
                Bound::Included(lo) | Bound::Excluded(lo),
                Bound::Included(hi) | Bound::Excluded(hi),
            ) if lo > hi => true,
            (Bound::Excluded(lo), Bound::Excluded(hi)) if lo == hi => true,
            _ => false,
        };
        if inverted {
            return Ok(Box::new(std::iter::empty()));
        }

        let snapshot = self.data.load_full();
        let mut pairs: Vec<KvPair> = snapshot
            .range((lower, upper))
            .map(|(k, v)| (k[prefix.len()..].to_vec(), v.clone()))
            .collect();
        if range.reverse {
            pairs.reverse();
        }
        Ok(Box::new(pairs.into_iter().map(Ok)))
    }

    fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.acquire_write_lock()?;
        self.data.store(Arc::new(OrdMap::new()));
        Ok(())
    }
}
