use serde_json::Value;
use std::fmt;

/// A validated send request: one payload, fanned out to every routing key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    pub payload: String,
    pub routing_keys: Vec<String>,
}

/// One field-level problem found while validating a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: &'static str,
    pub problem: String,
}

impl FieldViolation {
    fn new(field: &'static str, problem: impl Into<String>) -> Self {
        Self {
            field,
            problem: problem.into(),
        }
    }
}

/// Request validation failure carrying every violated field, not just the
/// first one found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub violations: Vec<FieldViolation>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, violation) in self.violations.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", violation.field, violation.problem)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

impl PublishRequest {
    /// Validate a decoded JSON value against the request shape.
    ///
    /// Unknown extra fields are permitted and ignored. Rejection happens
    /// before any publish attempt or audit write.
    pub fn parse(value: &Value) -> Result<Self, ValidationError> {
        let Some(fields) = value.as_object() else {
            return Err(ValidationError {
                violations: vec![FieldViolation::new("request", "must be a JSON object")],
            });
        };

        let mut violations = Vec::new();

        let payload = match fields.get("payload") {
            Some(Value::String(payload)) => Some(payload.clone()),
            Some(_) => {
                violations.push(FieldViolation::new("payload", "must be a string"));
                None
            }
            None => {
                violations.push(FieldViolation::new("payload", "required field is missing"));
                None
            }
        };

        let routing_keys = match fields.get("routing_keys") {
            Some(Value::Array(items)) => {
                let mut keys = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    match item {
                        Value::String(key) => keys.push(key.clone()),
                        _ => violations.push(FieldViolation::new(
                            "routing_keys",
                            format!("element at index {index} must be a string"),
                        )),
                    }
                }
                Some(keys)
            }
            Some(_) => {
                violations.push(FieldViolation::new("routing_keys", "must be a list of strings"));
                None
            }
            None => {
                violations.push(FieldViolation::new("routing_keys", "required field is missing"));
                None
            }
        };

        match (payload, routing_keys) {
            (Some(payload), Some(routing_keys)) if violations.is_empty() => Ok(PublishRequest {
                payload,
                routing_keys,
            }),
            _ => Err(ValidationError { violations }),
        }
    }
}
