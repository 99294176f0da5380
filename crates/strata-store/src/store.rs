use crate::error::StoreError;

/// A single operation in an atomic batch. Each op names its target
/// sublevel, so one batch can span the primary sublevel and any number
/// of index sublevels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    Put {
        sublevel: String,
        key: Vec<u8>,
        value: Vec<u8>,
    },
    Del {
        sublevel: String,
        key: Vec<u8>,
    },
}

impl BatchOp {
    pub fn put(sublevel: impl Into<String>, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        BatchOp::Put {
            sublevel: sublevel.into(),
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn del(sublevel: impl Into<String>, key: impl Into<Vec<u8>>) -> Self {
        BatchOp::Del {
            sublevel: sublevel.into(),
            key: key.into(),
        }
    }
}

/// Bounds for sublevel iteration, all relative to the sublevel's keyspace.
///
/// `gt`/`lt` take precedence over `gte`/`lte` when both sides are set.
/// An empty range iterates the whole sublevel.
#[derive(Debug, Clone, Default)]
pub struct IterRange {
    pub gt: Option<Vec<u8>>,
    pub gte: Option<Vec<u8>>,
    pub lt: Option<Vec<u8>>,
    pub lte: Option<Vec<u8>>,
    pub reverse: bool,
}

pub type KvPair = (Vec<u8>, Vec<u8>);

/// An ordered key-value store with named sublevels.
///
/// A sublevel is a prefix-scoped view of the keyspace: keys passed to and
/// yielded from these methods never include the sublevel prefix. Batches
/// are atomic — a reader observes either none or all of a batch's ops.
pub trait Store {
    fn get(&self, sublevel: &str, key: &[u8]) -> Result<Vec<u8>, StoreError>;

    fn put(&self, sublevel: &str, key: &[u8], value: &[u8]) -> Result<(), StoreError>;

    fn del(&self, sublevel: &str, key: &[u8]) -> Result<(), StoreError>;

    fn batch(&self, ops: Vec<BatchOp>) -> Result<(), StoreError>;

    /// Iterate a sublevel in key order (reversed when `range.reverse`),
    /// bounded by the range.
    fn iter(
        &self,
        sublevel: &str,
        range: IterRange,
    ) -> Result<Box<dyn Iterator<Item = Result<KvPair, StoreError>> + '_>, StoreError>;

    /// Wipe the entire store, every sublevel included.
    fn clear(&self) -> Result<(), StoreError>;
}
