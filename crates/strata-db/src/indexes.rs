use std::collections::HashMap;

use crate::schema::{Collection, FieldType, Schema};

/// Name of the default index present on every collection: the empty
/// composite, sorted by primary key (document path) alone.
pub const FILEPATH_INDEX: &str = "__filepath__";

/// `collection → sort key → definition`.
pub type IndexDefinitions = HashMap<String, HashMap<String, IndexDefinition>>;

/// An ordered list of indexed fields. The encoded composite key is the
/// encoded field values in this order, separator-joined, with the
/// document path as the trailing component.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDefinition {
    pub fields: Vec<IndexField>,
}

impl IndexDefinition {
    /// The default definition: zero fields, keys are bare paths.
    pub fn filepath() -> Self {
        IndexDefinition { fields: vec![] }
    }

    pub fn covers(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f.name == field)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexField {
    pub name: String,
    pub field_type: FieldType,
    /// Number padding override; `None` uses the default (`'0'` × 4).
    pub pad: Option<Pad>,
}

impl IndexField {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        IndexField {
            name: name.into(),
            field_type,
            pad: None,
        }
    }
}

/// Left-pad scheme for number fields: `fill` repeated up to `width`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pad {
    pub fill: char,
    pub width: usize,
}

impl Default for Pad {
    fn default() -> Self {
        Pad {
            fill: '0',
            width: 4,
        }
    }
}

/// The sublevel holding one collection's entries for one sort key.
pub fn index_sublevel(collection: &str, sort_key: &str) -> String {
    format!("{collection}/{sort_key}")
}

/// Project the schema into per-collection index definition tables:
/// the default `__filepath__` entry, one single-column index per
/// indexable field, and one entry per user-declared composite.
pub fn build_index_definitions(schema: &Schema) -> IndexDefinitions {
    schema
        .collections
        .iter()
        .map(|collection| {
            (
                collection.name.clone(),
                collection_definitions(collection),
            )
        })
        .collect()
}

fn collection_definitions(collection: &Collection) -> HashMap<String, IndexDefinition> {
    let mut defs = HashMap::new();
    defs.insert(FILEPATH_INDEX.to_string(), IndexDefinition::filepath());

    for field in collection.indexable_fields() {
        defs.insert(
            field.name.clone(),
            IndexDefinition {
                fields: vec![IndexField::new(&field.name, field.field_type)],
            },
        );
    }

    for spec in &collection.indexes {
        let fields = spec
            .fields
            .iter()
            .map(|name| {
                let field_type = collection
                    .field(name)
                    .map(|f| f.field_type)
                    .unwrap_or(FieldType::String);
                IndexField::new(name, field_type)
            })
            .collect();
        defs.insert(spec.name.clone(), IndexDefinition { fields });
    }

    defs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Field, Format, IndexSpec, Template};

    fn posts() -> Collection {
        Collection {
            name: "posts".to_string(),
            path: "content/posts".to_string(),
            format: Format::Json,
            fields: vec![
                Field::new("title", FieldType::String),
                Field::new("rank", FieldType::Number),
                Field {
                    indexed: false,
                    ..Field::new("draft", FieldType::Boolean)
                },
                Field::new("meta", FieldType::Object),
            ],
            templates: vec![],
            indexes: vec![IndexSpec {
                name: "category-rank".to_string(),
                fields: vec!["category".to_string(), "rank".to_string()],
            }],
        }
    }

    #[test]
    fn every_collection_gets_the_filepath_index() {
        let defs = collection_definitions(&posts());
        assert_eq!(defs[FILEPATH_INDEX], IndexDefinition::filepath());
    }

    #[test]
    fn single_column_indexes_for_indexable_fields_only() {
        let defs = collection_definitions(&posts());
        assert!(defs.contains_key("title"));
        assert!(defs.contains_key("rank"));
        // indexed=false and object fields are skipped
        assert!(!defs.contains_key("draft"));
        assert!(!defs.contains_key("meta"));
    }

    #[test]
    fn composite_fields_resolve_declared_types() {
        let defs = collection_definitions(&posts());
        let composite = &defs["category-rank"];
        assert_eq!(composite.fields.len(), 2);
        // "category" is not declared on the collection → string fallback
        assert_eq!(composite.fields[0].field_type, FieldType::String);
        assert_eq!(composite.fields[1].field_type, FieldType::Number);
    }

    #[test]
    fn union_collections_index_the_union_of_template_fields() {
        let collection = Collection {
            name: "blocks".to_string(),
            path: "content/blocks".to_string(),
            format: Format::Json,
            fields: vec![],
            templates: vec![
                Template {
                    name: "blocks/hero".to_string(),
                    fields: vec![Field::new("headline", FieldType::String)],
                },
                Template {
                    name: "blocks/cta".to_string(),
                    fields: vec![
                        Field::new("headline", FieldType::String),
                        Field::new("url", FieldType::String),
                    ],
                },
            ],
            indexes: vec![],
        };
        let defs = collection_definitions(&collection);
        assert!(defs.contains_key("headline"));
        assert!(defs.contains_key("url"));
        assert_eq!(defs.len(), 3); // + __filepath__
    }
}
