mod filter;
mod params;
mod value;

pub use filter::{Condition, Filter};
pub use params::QueryParams;
pub use value::QueryValue;
