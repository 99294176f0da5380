mod bridge;
mod database;
mod encoding;
mod error;
mod filter;
mod format;
mod indexes;
mod query;
mod schema;
mod status;

pub use bridge::{Bridge, FilesystemBridge, MemoryBridge};
pub use database::{Database, ROOT_SUBLEVEL, TEMPLATE_KEY};
pub use encoding::DecodedKey;
pub use error::DbError;
pub use indexes::{
    FILEPATH_INDEX, IndexDefinition, IndexDefinitions, IndexField, Pad, build_index_definitions,
    index_sublevel,
};
pub use query::{DEFAULT_PAGE_SIZE, Edge, PageInfo, QueryResult};
pub use schema::{Collection, Field, FieldType, Format, IndexSpec, Schema, Template};
pub use status::{Status, StatusCallback};

pub use strata_query::{Condition, Filter, QueryParams, QueryValue};
