use thiserror::Error;

use crate::{FieldType, Operator, RegisterId};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SeclError {
    #[error("field not found: {field}")]
    FieldNotFound { field: String },
    #[error("iterator not supported: {field}")]
    IteratorNotSupported { field: String },
    #[error("value type mismatch for {field}")]
    ValueTypeMismatch { field: String },
    #[error("value {value} out of range for {field}")]
    ValueOutOfRange { field: String, value: i64 },
    #[error("error parsing value {value} as {expected}")]
    FieldValueParseError { value: String, expected: FieldType },
    #[error("operator {0} not allowed on type {1}")]
    OperatorNotAllowedOnType(Operator, String),
    #[error("comparing fields of different types: {0} and {1}")]
    DifferentFieldsType(String, String),
    #[error("comparing field not scalar: {0}")]
    ComparingFieldNotScalar(String),
    #[error("unary expression field not bool: {0}")]
    UnaryExpressionFieldNotBool(String),
    #[error("rule mixes event types {first} and {second}")]
    MultipleEventTypes { first: String, second: String },
    #[error("register {0} used outside of its quantifier")]
    UnknownRegister(RegisterId),
    #[error("field {field} is not reachable from register {register}")]
    RegisterNotBound { field: String, register: RegisterId },
}

impl SeclError {
    pub fn field_not_found(field: &str) -> Self {
        Self::FieldNotFound {
            field: field.to_string(),
        }
    }
}
