use std::cmp::Ordering;

use serde_json::{Map, Value};
use strata_query::{Condition, Filter, QueryValue};

use crate::encoding::{self, INDEX_FIELD_SEP};
use crate::error::DbError;
use crate::indexes::{IndexDefinition, IndexField};
use crate::schema::{Collection, FieldType};

/// A filter chain compiled against one index definition.
///
/// `left`/`right` are the byte prefixes bounding the scan (conservative
/// supersets); the residual re-checks every clause per candidate.
#[derive(Debug)]
pub(crate) struct CompiledFilter {
    pub left: Option<Vec<u8>>,
    pub right: Option<Vec<u8>>,
    pub clauses: Vec<CompiledClause>,
    /// True when every clause's field is part of the index definition,
    /// so the decoded key alone can answer the residual.
    pub fully_covered: bool,
}

#[derive(Debug)]
pub(crate) struct CompiledClause {
    pub field: String,
    pub condition: Condition,
    pub field_type: FieldType,
}

impl CompiledFilter {
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Evaluate the residual over a candidate record (decoded key groups
    /// or a primary payload).
    pub fn matches(&self, subject: &Map<String, Value>) -> bool {
        self.clauses.iter().all(|clause| clause.matches(subject))
    }
}

/// Compile a filter chain against an index definition.
///
/// Walks the definition's fields in order, consuming clauses into the
/// prefix bounds: an equality keeps the prefix extending to the next
/// field; a range, between, or starts-with contributes one final bound
/// segment and stops extension. Contradictory clauses on one field
/// narrow by intersection; the residual still enforces every clause.
pub(crate) fn compile(
    filters: &[Filter],
    def: &IndexDefinition,
    collection: &Collection,
) -> Result<CompiledFilter, DbError> {
    let mut left: Vec<u8> = Vec::new();
    let mut right: Vec<u8> = Vec::new();
    let mut left_set = false;
    let mut right_set = false;

    'fields: for field in &def.fields {
        let clauses: Vec<&Filter> = filters.iter().filter(|f| f.field == field.name).collect();
        if clauses.is_empty() {
            break;
        }

        let mut eq: Option<String> = None;
        let mut lower: Option<String> = None;
        let mut upper: Option<String> = None;
        for clause in clauses {
            match &clause.condition {
                Condition::Eq(v) => {
                    let enc = encode_operand(field, v)?;
                    eq.get_or_insert(enc);
                }
                Condition::StartsWith(s) => {
                    narrow_lower(&mut lower, s.clone());
                    narrow_upper(&mut upper, s.clone());
                }
                Condition::Gt(v) | Condition::Gte(v) => {
                    narrow_lower(&mut lower, encode_operand(field, v)?);
                }
                Condition::Lt(v) | Condition::Lte(v) => {
                    narrow_upper(&mut upper, encode_operand(field, v)?);
                }
                Condition::Between(lo, hi) => {
                    narrow_lower(&mut lower, encode_operand(field, lo)?);
                    narrow_upper(&mut upper, encode_operand(field, hi)?);
                }
            }
        }

        if let Some(enc) = eq {
            // Equality pins this slot exactly; the prefix keeps extending.
            left.extend_from_slice(enc.as_bytes());
            left.push(INDEX_FIELD_SEP);
            right.extend_from_slice(enc.as_bytes());
            right.push(INDEX_FIELD_SEP);
            left_set = true;
            right_set = true;
            continue 'fields;
        }

        // A non-equality bound ends the prefix; no trailing separator so
        // starts-with and open ranges cover the whole slot.
        if let Some(lo) = lower {
            left.extend_from_slice(lo.as_bytes());
            left_set = true;
        }
        if let Some(hi) = upper {
            right.extend_from_slice(hi.as_bytes());
            right_set = true;
        }
        break;
    }

    let clauses: Vec<CompiledClause> = filters
        .iter()
        .map(|f| CompiledClause {
            field: f.field.clone(),
            condition: f.condition.clone(),
            field_type: collection
                .field(&f.field)
                .map(|field| field.field_type)
                .unwrap_or(FieldType::String),
        })
        .collect();
    let fully_covered = clauses.iter().all(|c| def.covers(&c.field));

    Ok(CompiledFilter {
        left: left_set.then_some(left),
        right: right_set.then_some(right),
        clauses,
        fully_covered,
    })
}

/// Intersection narrowing: keep the larger lower bound.
fn narrow_lower(current: &mut Option<String>, candidate: String) {
    match current {
        Some(existing) if *existing >= candidate => {}
        _ => *current = Some(candidate),
    }
}

/// Intersection narrowing: keep the smaller upper bound.
fn narrow_upper(current: &mut Option<String>, candidate: String) {
    match current {
        Some(existing) if *existing <= candidate => {}
        _ => *current = Some(candidate),
    }
}

/// Coerce a filter operand through the field's declared type and encode
/// it with the same codec that built the keys.
fn encode_operand(field: &IndexField, operand: &QueryValue) -> Result<String, DbError> {
    encoding::encode_value(field, &operand_to_json(operand))
}

fn operand_to_json(operand: &QueryValue) -> Value {
    match operand {
        QueryValue::Bool(b) => Value::Bool(*b),
        QueryValue::Int(n) => Value::from(*n),
        QueryValue::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        QueryValue::String(s) => Value::String(s.clone()),
    }
}

impl CompiledClause {
    pub fn matches(&self, subject: &Map<String, Value>) -> bool {
        let value = subject.get(&self.field).unwrap_or(&Value::Null);
        match &self.condition {
            Condition::Eq(operand) => compare(self.field_type, value, operand) == Some(Ordering::Equal),
            Condition::StartsWith(prefix) => {
                value.as_str().is_some_and(|s| s.starts_with(prefix.as_str()))
            }
            Condition::Gt(operand) => compare(self.field_type, value, operand) == Some(Ordering::Greater),
            Condition::Gte(operand) => matches!(
                compare(self.field_type, value, operand),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Condition::Lt(operand) => compare(self.field_type, value, operand) == Some(Ordering::Less),
            Condition::Lte(operand) => matches!(
                compare(self.field_type, value, operand),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Condition::Between(lo, hi) => {
                matches!(
                    compare(self.field_type, value, lo),
                    Some(Ordering::Greater | Ordering::Equal)
                ) && matches!(
                    compare(self.field_type, value, hi),
                    Some(Ordering::Less | Ordering::Equal)
                )
            }
        }
    }
}

/// Compare a document value with a filter operand under the field's
/// declared semantics. `None` (incomparable, including a missing value)
/// fails every condition.
fn compare(field_type: FieldType, value: &Value, operand: &QueryValue) -> Option<Ordering> {
    match field_type {
        FieldType::Number => value.as_f64()?.partial_cmp(&operand.as_f64()?),
        FieldType::Boolean => Some(value.as_bool()?.cmp(&operand.as_bool()?)),
        _ => Some(value.as_str()?.cmp(operand.as_str()?)),
    }
}
