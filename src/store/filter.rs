//! Metadata (`where`) and document-content (`where_document`) filters
//!
//! Filters arrive as JSON values and are validated into typed trees before
//! any record is touched:
//!
//! ```json
//! {"$and": [{"author": "jane"}, {"year": {"$gte": 2020}}]}
//! {"$or": [{"$contains": "rust"}, {"$regex": "^fn "}]}
//! ```

use regex::Regex;
use serde_json::Value;

use super::error::{Result, StoreError};
use super::types::Metadata;

/// Comparison applied to a single metadata field
#[derive(Debug, Clone)]
pub enum Comparison {
    Eq(Value),
    Ne(Value),
    Gt(f64),
    Gte(f64),
    Lt(f64),
    Lte(f64),
    In(Vec<Value>),
    Nin(Vec<Value>),
}

/// Metadata filter tree
#[derive(Debug, Clone)]
pub enum Where {
    Field { key: String, cmp: Comparison },
    And(Vec<Where>),
    Or(Vec<Where>),
}

/// Document-content filter tree
#[derive(Debug, Clone)]
pub enum WhereDocument {
    Contains(String),
    NotContains(String),
    Regex(Regex),
    NotRegex(Regex),
    And(Vec<WhereDocument>),
    Or(Vec<WhereDocument>),
}

impl Where {
    /// Validate a JSON `where` clause
    pub fn from_json(value: &Value) -> Result<Self> {
        let obj = value.as_object().ok_or_else(|| {
            StoreError::InvalidWhere(format!("expected an object, got {}", value))
        })?;

        if obj.is_empty() {
            return Err(StoreError::InvalidWhere(
                "expected at least one field or operator".to_string(),
            ));
        }

        let mut clauses = Vec::with_capacity(obj.len());
        for (key, operand) in obj {
            let clause = match key.as_str() {
                "$and" => Where::And(Self::sub_clauses(key, operand)?),
                "$or" => Where::Or(Self::sub_clauses(key, operand)?),
                op if op.starts_with('$') => {
                    return Err(StoreError::InvalidWhere(format!(
                        "unknown logical operator {}",
                        op
                    )))
                }
                field => Where::Field {
                    key: field.to_string(),
                    cmp: Comparison::from_json(field, operand)?,
                },
            };
            clauses.push(clause);
        }

        Ok(collapse(clauses, Where::And))
    }

    fn sub_clauses(op: &str, operand: &Value) -> Result<Vec<Where>> {
        let items = operand
            .as_array()
            .filter(|items| !items.is_empty())
            .ok_or_else(|| {
                StoreError::InvalidWhere(format!(
                    "expected {} to be a non-empty list of where expressions",
                    op
                ))
            })?;
        items.iter().map(Where::from_json).collect()
    }

    /// Check if a record's metadata satisfies this filter
    pub fn matches(&self, metadata: Option<&Metadata>) -> bool {
        match self {
            Where::Field { key, cmp } => cmp.matches(metadata.and_then(|m| m.get(key))),
            Where::And(clauses) => clauses.iter().all(|c| c.matches(metadata)),
            Where::Or(clauses) => clauses.iter().any(|c| c.matches(metadata)),
        }
    }
}

impl Comparison {
    fn from_json(field: &str, operand: &Value) -> Result<Self> {
        let Some(obj) = operand.as_object() else {
            return Ok(Comparison::Eq(scalar(field, operand)?));
        };

        if obj.len() != 1 {
            return Err(StoreError::InvalidWhere(format!(
                "expected exactly one operator for field '{}', got {}",
                field, operand
            )));
        }

        let (op, value) = obj.iter().next().ok_or_else(|| {
            StoreError::InvalidWhere(format!("missing operator for field '{}'", field))
        })?;

        let cmp = match op.as_str() {
            "$eq" => Comparison::Eq(scalar(field, value)?),
            "$ne" => Comparison::Ne(scalar(field, value)?),
            "$gt" => Comparison::Gt(number(field, op, value)?),
            "$gte" => Comparison::Gte(number(field, op, value)?),
            "$lt" => Comparison::Lt(number(field, op, value)?),
            "$lte" => Comparison::Lte(number(field, op, value)?),
            "$in" => Comparison::In(scalar_list(field, op, value)?),
            "$nin" => Comparison::Nin(scalar_list(field, op, value)?),
            other => {
                return Err(StoreError::InvalidWhere(format!(
                    "unknown operator {} for field '{}'",
                    other, field
                )))
            }
        };

        Ok(cmp)
    }

    fn matches(&self, field_value: Option<&Value>) -> bool {
        match self {
            Comparison::Eq(v) => field_value.map_or(false, |f| values_equal(f, v)),
            Comparison::Ne(v) => field_value.map_or(true, |f| !values_equal(f, v)),
            Comparison::Gt(n) => numeric(field_value).map_or(false, |f| f > *n),
            Comparison::Gte(n) => numeric(field_value).map_or(false, |f| f >= *n),
            Comparison::Lt(n) => numeric(field_value).map_or(false, |f| f < *n),
            Comparison::Lte(n) => numeric(field_value).map_or(false, |f| f <= *n),
            Comparison::In(items) => {
                field_value.map_or(false, |f| items.iter().any(|item| values_equal(f, item)))
            }
            Comparison::Nin(items) => {
                field_value.map_or(true, |f| !items.iter().any(|item| values_equal(f, item)))
            }
        }
    }
}

impl WhereDocument {
    /// Validate a JSON `where_document` clause
    pub fn from_json(value: &Value) -> Result<Self> {
        let obj = value.as_object().ok_or_else(|| {
            StoreError::InvalidWhereDocument(format!("expected an object, got {}", value))
        })?;

        if obj.is_empty() {
            return Err(StoreError::InvalidWhereDocument(
                "expected at least one operator".to_string(),
            ));
        }

        let mut clauses = Vec::with_capacity(obj.len());
        for (op, operand) in obj {
            let clause = match op.as_str() {
                "$contains" => WhereDocument::Contains(text(op, operand)?),
                "$not_contains" => WhereDocument::NotContains(text(op, operand)?),
                "$regex" => WhereDocument::Regex(pattern(op, operand)?),
                "$not_regex" => WhereDocument::NotRegex(pattern(op, operand)?),
                "$and" => WhereDocument::And(Self::sub_clauses(op, operand)?),
                "$or" => WhereDocument::Or(Self::sub_clauses(op, operand)?),
                other => {
                    return Err(StoreError::InvalidWhereDocument(format!(
                        "unknown operator {}",
                        other
                    )))
                }
            };
            clauses.push(clause);
        }

        Ok(collapse(clauses, WhereDocument::And))
    }

    fn sub_clauses(op: &str, operand: &Value) -> Result<Vec<WhereDocument>> {
        let items = operand
            .as_array()
            .filter(|items| !items.is_empty())
            .ok_or_else(|| {
                StoreError::InvalidWhereDocument(format!(
                    "expected {} to be a non-empty list of where_document expressions",
                    op
                ))
            })?;
        items.iter().map(WhereDocument::from_json).collect()
    }

    /// Check if a document's text satisfies this filter
    pub fn matches(&self, document: &str) -> bool {
        match self {
            WhereDocument::Contains(s) => document.contains(s.as_str()),
            WhereDocument::NotContains(s) => !document.contains(s.as_str()),
            WhereDocument::Regex(re) => re.is_match(document),
            WhereDocument::NotRegex(re) => !re.is_match(document),
            WhereDocument::And(clauses) => clauses.iter().all(|c| c.matches(document)),
            WhereDocument::Or(clauses) => clauses.iter().any(|c| c.matches(document)),
        }
    }
}

/// A single clause stays as-is; several are joined with `and`
fn collapse<T>(mut clauses: Vec<T>, and: fn(Vec<T>) -> T) -> T {
    if clauses.len() == 1 {
        clauses.remove(0)
    } else {
        and(clauses)
    }
}

fn scalar(field: &str, value: &Value) -> Result<Value> {
    match value {
        Value::String(_) | Value::Number(_) | Value::Bool(_) => Ok(value.clone()),
        other => Err(StoreError::InvalidWhere(format!(
            "expected a string, number or bool operand for field '{}', got {}",
            field, other
        ))),
    }
}

fn number(field: &str, op: &str, value: &Value) -> Result<f64> {
    value.as_f64().ok_or_else(|| {
        StoreError::InvalidWhere(format!(
            "expected a numeric operand for {} on field '{}', got {}",
            op, field, value
        ))
    })
}

fn scalar_list(field: &str, op: &str, value: &Value) -> Result<Vec<Value>> {
    let items = value
        .as_array()
        .filter(|items| !items.is_empty())
        .ok_or_else(|| {
            StoreError::InvalidWhere(format!(
                "expected {} on field '{}' to be a non-empty list, got {}",
                op, field, value
            ))
        })?;
    items.iter().map(|item| scalar(field, item)).collect()
}

fn text(op: &str, value: &Value) -> Result<String> {
    value.as_str().map(str::to_string).ok_or_else(|| {
        StoreError::InvalidWhereDocument(format!("expected a string operand for {}, got {}", op, value))
    })
}

fn pattern(op: &str, value: &Value) -> Result<Regex> {
    let source = text(op, value)?;
    Regex::new(&source).map_err(|e| {
        StoreError::InvalidWhereDocument(format!("invalid pattern for {}: {}", op, e))
    })
}

fn numeric(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64)
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::String(s1), Value::String(s2)) => s1 == s2,
        (Value::Number(n1), Value::Number(n2)) => {
            n1.as_f64().zip(n2.as_f64()).map_or(false, |(a, b)| (a - b).abs() < f64::EPSILON)
        }
        (Value::Bool(b1), Value::Bool(b2)) => b1 == b2,
        _ => false,
    }
}
