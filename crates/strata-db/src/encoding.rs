use serde_json::{Map, Value};

use crate::error::DbError;
use crate::indexes::{IndexDefinition, IndexField};
use crate::schema::FieldType;

/// Separator between the encoded fields of a composite key. Encoded
/// values must never contain it; the encoder rejects values that would.
pub(crate) const INDEX_FIELD_SEP: u8 = 0x00;

/// Sort-order sentinel: appended to a prefix it forms an exclusive-ish
/// upper bound for "starts-with" scans (no encoded byte reaches 0xFF).
pub(crate) const MAX_BYTE: u8 = 0xFF;

/// Encode a single field value into its sort-preserving textual form.
///
/// - string / reference / datetime: the literal string (datetimes are
///   already ISO-8601, which sorts chronologically)
/// - number: left-padded non-negative integer (`"0012" < "0100"`)
/// - boolean: `"0"` / `"1"`
///
/// `Null` encodes as the empty string so a document missing the field
/// still gets exactly one entry per index, sorted first.
pub(crate) fn encode_value(field: &IndexField, value: &Value) -> Result<String, DbError> {
    let encoded = match (field.field_type, value) {
        (_, Value::Null) => String::new(),
        (FieldType::Number, _) => {
            let n = value.as_i64().ok_or_else(|| {
                DbError::InvalidValue(format!(
                    "field {} expects an integer, got {value}",
                    field.name
                ))
            })?;
            if n < 0 {
                return Err(DbError::InvalidValue(format!(
                    "field {} cannot index negative number {n} with the default pad",
                    field.name
                )));
            }
            let pad = field.pad.unwrap_or_default();
            let digits = n.to_string();
            if digits.len() >= pad.width {
                digits
            } else {
                let mut padded = String::with_capacity(pad.width);
                for _ in 0..pad.width - digits.len() {
                    padded.push(pad.fill);
                }
                padded.push_str(&digits);
                padded
            }
        }
        (FieldType::Boolean, Value::Bool(b)) => if *b { "1" } else { "0" }.to_string(),
        (FieldType::Boolean, _) => {
            return Err(DbError::InvalidValue(format!(
                "field {} expects a boolean, got {value}",
                field.name
            )));
        }
        (_, Value::String(s)) => s.clone(),
        _ => {
            return Err(DbError::InvalidValue(format!(
                "field {} expects a string, got {value}",
                field.name
            )));
        }
    };

    if encoded.as_bytes().contains(&INDEX_FIELD_SEP) {
        return Err(DbError::InvalidValue(format!(
            "field {} value contains the reserved index key separator",
            field.name
        )));
    }
    Ok(encoded)
}

/// Invert [`encode_value`]: recover a typed value from its key form.
/// The empty string decodes to `Null` (the missing-field encoding),
/// except for plain strings where emptiness is not distinguishable.
pub(crate) fn decode_value(field: &IndexField, raw: &str) -> Value {
    match field.field_type {
        FieldType::Number => {
            let pad = field.pad.unwrap_or_default();
            let digits = raw.trim_start_matches(pad.fill);
            if raw.is_empty() {
                Value::Null
            } else if digits.is_empty() {
                // all fill characters: the value was zero
                Value::from(0i64)
            } else {
                digits.parse::<i64>().map(Value::from).unwrap_or(Value::Null)
            }
        }
        FieldType::Boolean => match raw {
            "0" => Value::Bool(false),
            "1" => Value::Bool(true),
            _ => Value::Null,
        },
        _ => Value::String(raw.to_string()),
    }
}

/// A composite key parsed against an index definition.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedKey {
    /// Field name → decoded value, in the definition's shape.
    pub values: Map<String, Value>,
    /// The trailing path component that makes every key unique.
    pub path: String,
}

/// Build the composite key for one document in one index:
/// `f1 SEP f2 SEP … SEP path`. The zero-field default index yields the
/// bare path.
pub(crate) fn encode_index_key(
    def: &IndexDefinition,
    path: &str,
    doc: &Map<String, Value>,
) -> Result<Vec<u8>, DbError> {
    let mut key = Vec::new();
    for field in &def.fields {
        let value = doc.get(&field.name).unwrap_or(&Value::Null);
        key.extend_from_slice(encode_value(field, value)?.as_bytes());
        key.push(INDEX_FIELD_SEP);
    }
    key.extend_from_slice(path.as_bytes());
    Ok(key)
}

/// Parse a stored key back into named groups plus the trailing path.
///
/// Returns `None` when the separator arity does not match the
/// definition — the key belongs to a different index shape (schema
/// evolution) and callers skip it.
pub(crate) fn decode_index_key(def: &IndexDefinition, key: &[u8]) -> Option<DecodedKey> {
    let parts: Vec<&[u8]> = key.split(|b| *b == INDEX_FIELD_SEP).collect();
    if parts.len() != def.fields.len() + 1 {
        return None;
    }

    let mut values = Map::new();
    for (field, raw) in def.fields.iter().zip(&parts) {
        let raw = std::str::from_utf8(raw).ok()?;
        values.insert(field.name.clone(), decode_value(field, raw));
    }
    let path = std::str::from_utf8(parts[parts.len() - 1]).ok()?.to_string();
    Some(DecodedKey { values, path })
}

/// Upper bound for a "starts-with" scan over `prefix`.
pub(crate) fn prefix_upper_bound(prefix: &[u8]) -> Vec<u8> {
    let mut bound = prefix.to_vec();
    bound.push(MAX_BYTE);
    bound
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::indexes::Pad;

    fn number_field() -> IndexField {
        IndexField::new("rank", FieldType::Number)
    }

    fn def(fields: Vec<IndexField>) -> IndexDefinition {
        IndexDefinition { fields }
    }

    #[test]
    fn number_padding_preserves_numeric_order() {
        let field = number_field();
        let one = encode_value(&field, &json!(1)).unwrap();
        let two = encode_value(&field, &json!(2)).unwrap();
        let ten = encode_value(&field, &json!(10)).unwrap();
        assert_eq!(one, "0001");
        assert!(one < two);
        assert!(two < ten);
    }

    #[test]
    fn number_wider_than_pad_is_kept() {
        let field = number_field();
        assert_eq!(encode_value(&field, &json!(123456)).unwrap(), "123456");
    }

    #[test]
    fn custom_pad() {
        let field = IndexField {
            pad: Some(Pad {
                fill: '0',
                width: 8,
            }),
            ..number_field()
        };
        assert_eq!(encode_value(&field, &json!(42)).unwrap(), "00000042");
    }

    #[test]
    fn negative_numbers_are_rejected() {
        let err = encode_value(&number_field(), &json!(-1)).unwrap_err();
        assert!(matches!(err, DbError::InvalidValue(_)));
    }

    #[test]
    fn fractional_numbers_are_rejected() {
        let err = encode_value(&number_field(), &json!(1.5)).unwrap_err();
        assert!(matches!(err, DbError::InvalidValue(_)));
    }

    #[test]
    fn booleans_sort_false_before_true() {
        let field = IndexField::new("published", FieldType::Boolean);
        let f = encode_value(&field, &json!(false)).unwrap();
        let t = encode_value(&field, &json!(true)).unwrap();
        assert_eq!((f.as_str(), t.as_str()), ("0", "1"));
    }

    #[test]
    fn datetime_is_the_iso_literal() {
        let field = IndexField::new("created_at", FieldType::Datetime);
        let v = encode_value(&field, &json!("2023-04-01T12:00:00Z")).unwrap();
        assert_eq!(v, "2023-04-01T12:00:00Z");
    }

    #[test]
    fn missing_value_encodes_empty_and_sorts_first() {
        let field = number_field();
        let missing = encode_value(&field, &Value::Null).unwrap();
        let zero = encode_value(&field, &json!(0)).unwrap();
        assert_eq!(missing, "");
        assert!(missing < zero);
    }

    #[test]
    fn separator_bearing_value_is_rejected() {
        let field = IndexField::new("title", FieldType::String);
        let err = encode_value(&field, &json!("bad\u{0}title")).unwrap_err();
        assert!(matches!(err, DbError::InvalidValue(_)));
    }

    #[test]
    fn composite_key_roundtrip() {
        let def = def(vec![
            IndexField::new("category", FieldType::String),
            IndexField::new("rank", FieldType::Number),
        ]);
        let doc = json!({"category": "news", "rank": 7});
        let key = encode_index_key(&def, "content/posts/a.json", doc.as_object().unwrap()).unwrap();
        assert_eq!(key, b"news\x000007\x00content/posts/a.json");

        let decoded = decode_index_key(&def, &key).unwrap();
        assert_eq!(decoded.path, "content/posts/a.json");
        assert_eq!(decoded.values["category"], json!("news"));
        assert_eq!(decoded.values["rank"], json!(7));
    }

    #[test]
    fn composite_keys_sort_like_their_tuples() {
        let def = def(vec![
            IndexField::new("category", FieldType::String),
            IndexField::new("rank", FieldType::Number),
        ]);
        let key = |category: &str, rank: i64, path: &str| {
            let doc = json!({"category": category, "rank": rank});
            encode_index_key(&def, path, doc.as_object().unwrap()).unwrap()
        };
        let mut keys = vec![
            key("news", 10, "b"),
            key("art", 99, "a"),
            key("news", 2, "c"),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![key("art", 99, "a"), key("news", 2, "c"), key("news", 10, "b")]
        );
    }

    #[test]
    fn filepath_index_key_is_the_bare_path() {
        let def = IndexDefinition::filepath();
        let doc = Map::new();
        let key = encode_index_key(&def, "content/posts/a.json", &doc).unwrap();
        assert_eq!(key, b"content/posts/a.json");
        let decoded = decode_index_key(&def, &key).unwrap();
        assert_eq!(decoded.path, "content/posts/a.json");
        assert!(decoded.values.is_empty());
    }

    #[test]
    fn arity_mismatch_decodes_to_none() {
        let two = def(vec![
            IndexField::new("a", FieldType::String),
            IndexField::new("b", FieldType::String),
        ]);
        let one = def(vec![IndexField::new("a", FieldType::String)]);
        let doc = json!({"a": "x", "b": "y"});
        let key = encode_index_key(&two, "p", doc.as_object().unwrap()).unwrap();
        assert!(decode_index_key(&one, &key).is_none());
        assert!(decode_index_key(&two, &key).is_some());
    }

    #[test]
    fn upper_bound_covers_the_prefix() {
        let prefix = b"news\x00";
        let bound = prefix_upper_bound(prefix);
        assert!(bound.as_slice() > b"news\x000010\x00z".as_slice());
        assert!(bound.as_slice() < b"newt".as_slice());
    }

    #[test]
    fn zero_decodes_back_to_zero() {
        let field = number_field();
        let raw = encode_value(&field, &json!(0)).unwrap();
        assert_eq!(decode_value(&field, &raw), json!(0));
    }
}
