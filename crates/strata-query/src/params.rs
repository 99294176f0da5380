use serde::{Deserialize, Serialize};

use crate::filter::Filter;

/// Inputs for a collection query.
///
/// `sort` names an index (the sort key); `None` sorts by primary key.
/// `first`/`after` page forward, `last`/`before` page backward; cursors
/// are the opaque strings returned in a prior page's `page_info`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryParams {
    pub collection: String,
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub first: Option<i64>,
    #[serde(default)]
    pub last: Option<i64>,
    #[serde(default)]
    pub after: Option<String>,
    #[serde(default)]
    pub before: Option<String>,
}

impl QueryParams {
    pub fn collection(name: impl Into<String>) -> Self {
        QueryParams {
            collection: name.into(),
            ..Default::default()
        }
    }
}
