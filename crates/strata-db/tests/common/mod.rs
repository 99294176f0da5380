#![allow(dead_code)]

use serde_json::{Value, json};
use strata_db::{
    Collection, Database, Field, FieldType, Format, IndexSpec, MemoryBridge, QueryResult, Schema,
    Template,
};
use strata_store::MemoryStore;

pub type TestDb = Database<MemoryStore, MemoryBridge>;

pub fn schema() -> Schema {
    Schema {
        collections: vec![
            Collection {
                name: "posts".to_string(),
                path: "content/posts".to_string(),
                format: Format::Json,
                fields: vec![
                    Field::new("title", FieldType::String),
                    Field::new("category", FieldType::String),
                    Field::new("rank", FieldType::Number),
                    Field::new("published", FieldType::Boolean),
                    Field::new("created_at", FieldType::Datetime),
                ],
                templates: vec![],
                indexes: vec![IndexSpec {
                    name: "category-rank".to_string(),
                    fields: vec!["category".to_string(), "rank".to_string()],
                }],
            },
            Collection {
                name: "pages".to_string(),
                path: "content/pages".to_string(),
                format: Format::Md,
                fields: vec![
                    Field::new("title", FieldType::String),
                    Field {
                        name: "body".to_string(),
                        field_type: FieldType::RichText,
                        indexed: true,
                        is_body: true,
                    },
                ],
                templates: vec![],
                indexes: vec![],
            },
            Collection {
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
            },
        ],
    }
}

/// A database with config records in place (full reindex over an empty
/// bridge), ready for `put`/`query`.
pub fn indexed_db() -> TestDb {
    let db = Database::new(MemoryStore::new(), MemoryBridge::new());
    db.index_content(&json!({"version": "test"}), &schema())
        .unwrap();
    db
}

pub fn post_path(slug: &str) -> String {
    format!("content/posts/{slug}.json")
}

pub fn post(title: &str, category: &str, rank: i64) -> Value {
    json!({
        "title": title,
        "category": category,
        "rank": rank,
        "published": true,
        "created_at": "2024-01-01T00:00:00Z",
    })
}

/// Seed one post per rank, path `content/posts/p{rank}.json`.
pub fn seed_ranked(db: &TestDb, ranks: impl IntoIterator<Item = i64>) {
    for rank in ranks {
        db.put(
            &post_path(&format!("p{rank}")),
            post(&format!("Post {rank}"), "news", rank),
            Some("posts"),
        )
        .unwrap();
    }
}

pub fn edge_paths(result: &QueryResult) -> Vec<String> {
    result.edges.iter().map(|e| e.path.clone()).collect()
}

pub fn edge_ranks(result: &QueryResult) -> Vec<i64> {
    result
        .edges
        .iter()
        .map(|e| e.node["rank"].as_i64().unwrap())
        .collect()
}
