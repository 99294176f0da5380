use serde::{Deserialize, Serialize};

/// The validated, enriched schema the engine consumes. Building and
/// validating it is the schema-authoring surface's job, not ours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub collections: Vec<Collection>,
}

impl Schema {
    pub fn collection(&self, name: &str) -> Option<&Collection> {
        self.collections.iter().find(|c| c.name == name)
    }

    /// Resolve the collection owning `path` by longest root-prefix match.
    /// System files outside every collection root resolve to `None`.
    pub fn collection_for_path(&self, path: &str) -> Option<&Collection> {
        self.collections
            .iter()
            .filter(|c| {
                path.strip_prefix(c.path.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
            })
            .max_by_key(|c| c.path.len())
    }
}

/// A named group of documents sharing a schema, rooted at `path`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub name: String,
    /// Root path prefix, forward-slashed, no trailing slash.
    pub path: String,
    #[serde(default)]
    pub format: Format,
    #[serde(default)]
    pub fields: Vec<Field>,
    /// Union collections declare templates instead of a flat field list;
    /// documents then carry a `_template` discriminator.
    #[serde(default)]
    pub templates: Vec<Template>,
    /// User-declared composite indexes.
    #[serde(default)]
    pub indexes: Vec<IndexSpec>,
}

impl Collection {
    pub fn has_templates(&self) -> bool {
        !self.templates.is_empty()
    }

    pub fn template(&self, name: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.name == name)
    }

    /// Look a field up by name across the flat list and every template.
    /// The first declaration wins when templates disagree.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .or_else(|| {
                self.templates
                    .iter()
                    .flat_map(|t| t.fields.iter())
                    .find(|f| f.name == name)
            })
    }

    /// All indexable fields in declaration order, deduplicated by name.
    pub fn indexable_fields(&self) -> Vec<&Field> {
        let mut seen = Vec::new();
        let mut out = Vec::new();
        let all = self
            .fields
            .iter()
            .chain(self.templates.iter().flat_map(|t| t.fields.iter()));
        for field in all {
            if field.is_indexed() && !seen.contains(&field.name.as_str()) {
                seen.push(field.name.as_str());
                out.push(field);
            }
        }
        out
    }

    /// The field marked `is_body`, if any.
    pub fn body_field(&self) -> Option<&Field> {
        self.fields
            .iter()
            .find(|f| f.is_body)
            .or_else(|| {
                self.templates
                    .iter()
                    .flat_map(|t| t.fields.iter())
                    .find(|f| f.is_body)
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    /// May be namespaced with `/`; the last segment is what `get`
    /// reports as `_template`.
    pub name: String,
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl Template {
    pub fn short_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default = "default_true")]
    pub indexed: bool,
    #[serde(default)]
    pub is_body: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Field {
            name: name.into(),
            field_type,
            indexed: true,
            is_body: false,
        }
    }

    pub fn is_indexed(&self) -> bool {
        self.indexed && self.field_type.is_indexable()
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Datetime,
    Reference,
    Object,
    RichText,
}

impl FieldType {
    /// Object and rich-text fields never get an index.
    pub fn is_indexable(&self) -> bool {
        !matches!(self, FieldType::Object | FieldType::RichText)
    }
}

/// A user-declared composite index: an ordered list of field names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub name: String,
    pub fields: Vec<String>,
}

/// On-disk file format of a collection's documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Md,
    Mdx,
    Markdown,
    Json,
}

impl Format {
    pub fn extension(&self) -> &'static str {
        match self {
            Format::Md => "md",
            Format::Mdx => "mdx",
            Format::Markdown => "markdown",
            Format::Json => "json",
        }
    }

    /// Markdown-like formats carry a body field (`$_body` in storage).
    pub fn is_markdown_like(&self) -> bool {
        matches!(self, Format::Md | Format::Mdx | Format::Markdown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema {
            collections: vec![
                Collection {
                    name: "posts".to_string(),
                    path: "content/posts".to_string(),
                    format: Format::Json,
                    fields: vec![
                        Field::new("title", FieldType::String),
                        Field::new("rank", FieldType::Number),
                    ],
                    templates: vec![],
                    indexes: vec![],
                },
                Collection {
                    name: "featured".to_string(),
                    path: "content/posts/featured".to_string(),
                    format: Format::Json,
                    fields: vec![],
                    templates: vec![],
                    indexes: vec![],
                },
            ],
        }
    }

    #[test]
    fn collection_for_path_prefers_longest_prefix() {
        let schema = schema();
        let c = schema.collection_for_path("content/posts/featured/a.json");
        assert_eq!(c.unwrap().name, "featured");
        let c = schema.collection_for_path("content/posts/a.json");
        assert_eq!(c.unwrap().name, "posts");
    }

    #[test]
    fn collection_for_path_requires_segment_boundary() {
        let schema = schema();
        // "content/postscript/..." must not match "content/posts".
        assert!(schema.collection_for_path("content/postscript/a.json").is_none());
    }

    #[test]
    fn system_files_have_no_collection() {
        let schema = schema();
        assert!(schema.collection_for_path(".tina/__generated__/_schema.json").is_none());
    }

    #[test]
    fn indexed_flag_and_type_gate_indexing() {
        let field = Field {
            name: "body".to_string(),
            field_type: FieldType::RichText,
            indexed: true,
            is_body: true,
        };
        assert!(!field.is_indexed());

        let field = Field {
            indexed: false,
            ..Field::new("draft", FieldType::Boolean)
        };
        assert!(!field.is_indexed());
    }

    #[test]
    fn template_short_name_is_last_segment() {
        let t = Template {
            name: "blocks/hero".to_string(),
            fields: vec![],
        };
        assert_eq!(t.short_name(), "hero");
    }

    #[test]
    fn schema_json_defaults() {
        let json = r#"{
            "collections": [{
                "name": "posts",
                "path": "content/posts",
                "format": "json",
                "fields": [{"name": "title", "type": "string"}]
            }]
        }"#;
        let schema: Schema = serde_json::from_str(json).unwrap();
        let field = &schema.collections[0].fields[0];
        assert!(field.indexed);
        assert!(!field.is_body);
    }
}
