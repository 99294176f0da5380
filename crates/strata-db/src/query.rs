use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::Value;
use strata_query::QueryParams;
use strata_store::{IterRange, Store};

use crate::bridge::Bridge;
use crate::database::{Database, is_config_path};
use crate::encoding::{self, MAX_BYTE};
use crate::error::DbError;
use crate::filter;
use crate::indexes::{FILEPATH_INDEX, index_sublevel};

/// Effective limit when neither `first` nor `last` is given. `-1`
/// means unlimited.
pub const DEFAULT_PAGE_SIZE: i64 = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub node: Value,
    /// Opaque position token: the raw sort key, base64-encoded.
    pub cursor: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageInfo {
    pub has_previous_page: bool,
    pub has_next_page: bool,
    /// Cursor of the first/last returned edge; empty when the page is.
    pub start_cursor: String,
    pub end_cursor: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub edges: Vec<Edge>,
    pub page_info: PageInfo,
}

pub(crate) fn encode_cursor(key: &[u8]) -> String {
    BASE64.encode(key)
}

pub(crate) fn decode_cursor(cursor: &str) -> Result<Vec<u8>, DbError> {
    BASE64
        .decode(cursor)
        .map_err(|e| DbError::InvalidCursor(e.to_string()))
}

impl<S: Store, B: Bridge> Database<S, B> {
    /// Query a collection, hydrating each edge through [`get`](Database::get).
    pub fn query(&self, params: &QueryParams) -> Result<QueryResult, DbError> {
        self.query_with(params, |path| self.get(path))
    }

    /// Query a collection with a caller-supplied hydrator (path → node).
    ///
    /// Planning: resolve the index named by `sort` (unknown sort keys
    /// fall back to the `__filepath__` default), compile the filter
    /// chain into scan bounds plus a residual, then stream the chosen
    /// sublevel. Keys of a foreign shape (schema evolution) are skipped.
    /// When the residual references fields outside the index, each
    /// candidate costs one primary-record point lookup.
    pub fn query_with<H>(&self, params: &QueryParams, hydrate: H) -> Result<QueryResult, DbError>
    where
        H: Fn(&str) -> Result<Value, DbError>,
    {
        let schema = self.schema()?;
        let collection = schema
            .collection(&params.collection)
            .ok_or_else(|| DbError::MissingIndex(params.collection.clone()))?;
        let defs = self.index_definitions()?;
        let coll_defs = defs
            .get(&collection.name)
            .ok_or_else(|| DbError::MissingIndex(collection.name.clone()))?;

        let requested = params.sort.as_deref().unwrap_or(FILEPATH_INDEX);
        let (sort_key, def) = match coll_defs.get(requested) {
            Some(def) => (requested, def),
            None => (FILEPATH_INDEX, &coll_defs[FILEPATH_INDEX]),
        };
        let sublevel = index_sublevel(&collection.name, sort_key);
        let compiled = filter::compile(&params.filters, def, collection)?;

        let reverse = params.last.is_some();
        let limit = params.first.or(params.last).unwrap_or(DEFAULT_PAGE_SIZE);
        let unlimited = limit < 0;

        let mut range = IterRange {
            reverse,
            ..Default::default()
        };
        match &params.after {
            Some(cursor) => range.gt = Some(decode_cursor(cursor)?),
            None => range.gte = Some(compiled.left.clone().unwrap_or_default()),
        }
        match &params.before {
            Some(cursor) => range.lt = Some(decode_cursor(cursor)?),
            None => {
                range.lte = Some(match &compiled.right {
                    Some(right) => encoding::prefix_upper_bound(right),
                    None => vec![MAX_BYTE],
                })
            }
        }

        let mut hits: Vec<(Vec<u8>, String)> = Vec::new();
        let mut has_next_page = false;
        let mut has_previous_page = false;

        for item in self.store.iter(&sublevel, range)? {
            let (key, _marker) = item?;
            let Some(decoded) = encoding::decode_index_key(def, &key) else {
                continue;
            };

            let matched = if compiled.is_empty() {
                true
            } else if compiled.fully_covered {
                compiled.matches(&decoded.values)
            } else {
                let record = self.get_raw(&decoded.path)?;
                compiled.matches(&record)
            };
            if !matched {
                continue;
            }

            if !unlimited && hits.len() as i64 >= limit {
                if reverse {
                    has_previous_page = true;
                } else {
                    has_next_page = true;
                }
                break;
            }
            hits.push((key, decoded.path));
        }

        let page_info = PageInfo {
            has_previous_page,
            has_next_page,
            start_cursor: hits
                .first()
                .map(|(key, _)| encode_cursor(key))
                .unwrap_or_default(),
            end_cursor: hits
                .last()
                .map(|(key, _)| encode_cursor(key))
                .unwrap_or_default(),
        };

        let mut edges = Vec::with_capacity(hits.len());
        for (key, path) in hits {
            let node = hydrate(&path).map_err(|e| {
                // generated config records re-raise unadorned
                if is_config_path(&path) {
                    e
                } else {
                    DbError::Query {
                        path: path.clone(),
                        collection: collection.name.clone(),
                        source: Box::new(e),
                    }
                }
            })?;
            edges.push(Edge {
                node,
                cursor: encode_cursor(&key),
                path,
            });
        }

        Ok(QueryResult { edges, page_info })
    }
}
