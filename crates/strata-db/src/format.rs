use serde_json::{Map, Value};

use crate::error::DbError;
use crate::schema::Format;

/// Storage key for the body-bearing field of markdown-like documents.
/// A file-format convention, not a store feature: the write path moves
/// the declared body field here, and `get` moves it back.
pub(crate) const BODY_KEY: &str = "$_body";

/// Parse file contents into a stored-shape payload (body under
/// [`BODY_KEY`] for markdown-like formats).
pub(crate) fn parse_file(format: Format, contents: &str) -> Result<Map<String, Value>, DbError> {
    if format.is_markdown_like() {
        let (front, body) = split_front_matter(contents);
        let mut payload = match front {
            Some(front) => as_object(serde_json::from_str(front)?)?,
            None => Map::new(),
        };
        payload.insert(BODY_KEY.to_string(), Value::String(body.to_string()));
        Ok(payload)
    } else {
        as_object(serde_json::from_str(contents)?)
    }
}

/// Stringify a named-shape payload (body under its declared field name)
/// to file form: JSON for `json`, front matter + body for markdown-like.
pub(crate) fn stringify_file(
    format: Format,
    data: &Map<String, Value>,
    body_field: Option<&str>,
) -> Result<String, DbError> {
    if format.is_markdown_like() {
        let mut front = data.clone();
        let body = body_field
            .and_then(|name| front.remove(name))
            .and_then(|v| match v {
                Value::String(s) => Some(s),
                _ => None,
            })
            .unwrap_or_default();
        let front_json = serde_json::to_string_pretty(&Value::Object(front))?;
        Ok(format!("---\n{front_json}\n---\n{body}"))
    } else {
        Ok(serde_json::to_string_pretty(&Value::Object(data.clone()))?)
    }
}

/// Named shape → stored shape: the body field moves under [`BODY_KEY`].
pub(crate) fn to_stored(mut data: Map<String, Value>, body_field: Option<&str>) -> Map<String, Value> {
    if let Some(name) = body_field
        && let Some(body) = data.remove(name)
    {
        data.insert(BODY_KEY.to_string(), body);
    }
    data
}

/// Stored shape → named shape: [`BODY_KEY`] moves back under the
/// declared body field.
pub(crate) fn reshape_body(
    mut stored: Map<String, Value>,
    body_field: Option<&str>,
) -> Map<String, Value> {
    if let Some(name) = body_field
        && let Some(body) = stored.remove(BODY_KEY)
    {
        stored.insert(name.to_string(), body);
    }
    stored
}

pub(crate) fn as_object(value: Value) -> Result<Map<String, Value>, DbError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(DbError::Serialization(format!(
            "document payload must be an object, got {other}"
        ))),
    }
}

/// Front matter is a JSON object between `---` fences. Files without a
/// leading fence are all body.
fn split_front_matter(contents: &str) -> (Option<&str>, &str) {
    let Some(rest) = contents.strip_prefix("---\n") else {
        return (None, contents);
    };
    if let Some(idx) = rest.find("\n---\n") {
        (Some(&rest[..idx]), &rest[idx + 5..])
    } else if let Some(front) = rest.strip_suffix("\n---") {
        (Some(front), "")
    } else {
        (None, contents)
    }
}
