/// Lifecycle events emitted by long-running maintenance operations
/// (full and partial reindex, bulk delete).
///
/// `InProgress` fires on entry, then exactly one of `Complete` or
/// `Failed`; on failure the error still propagates to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    InProgress,
    Complete,
    Failed { message: String },
}

pub type StatusCallback = Box<dyn Fn(&Status) + Send + Sync>;
