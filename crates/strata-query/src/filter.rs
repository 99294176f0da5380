use serde::{Deserialize, Serialize};

use crate::value::QueryValue;

/// One clause of a filter chain: a field name and a condition on it.
/// A chain is the conjunction of its clauses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub condition: Condition,
}

impl Filter {
    pub fn new(field: impl Into<String>, condition: Condition) -> Self {
        Filter {
            field: field.into(),
            condition,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Eq(QueryValue),
    StartsWith(String),
    Gt(QueryValue),
    Gte(QueryValue),
    Lt(QueryValue),
    Lte(QueryValue),
    /// Inclusive on both ends.
    Between(QueryValue, QueryValue),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_json_roundtrip() {
        let filter = Filter::new("rank", Condition::Gte(QueryValue::Int(2)));
        let json = serde_json::to_string(&filter).unwrap();
        assert_eq!(json, r#"{"field":"rank","condition":{"gte":2}}"#);
        let back: Filter = serde_json::from_str(&json).unwrap();
        assert_eq!(back, filter);
    }

    #[test]
    fn between_json_shape() {
        let filter = Filter::new(
            "rank",
            Condition::Between(QueryValue::Int(1), QueryValue::Int(5)),
        );
        let json = serde_json::to_string(&filter).unwrap();
        assert_eq!(json, r#"{"field":"rank","condition":{"between":[1,5]}}"#);
    }
}
