//! Operators available on field values.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{FieldType, SeclError};

/// An operator closure takes two &T and returns whether the supplied arguments
/// satisfy the Operator this closure implements.
pub type OperatorFn<T> = Box<dyn Fn(&T, &T) -> bool + Send + Sync + 'static>;

/// Enum of all possible operators.
/// These represent the abstract operators, for the concrete
/// implementations of these, see [OperatorFn].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "content")]
pub enum Operator {
    Relational(RelationalOperator),
    String(StringOperator),
    Multi(MultiOperator),
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Operator::Relational(op) => write!(f, "{op}"),
            Operator::String(op) => write!(f, "{op}"),
            Operator::Multi(op) => write!(f, "{op}"),
        }
    }
}

/// Operators intended to be used on strings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "content")]
pub enum StringOperator {
    StartsWith,
    EndsWith,
}

impl StringOperator {
    pub fn apply<T: AsRef<str>>(&self, first: T, second: T) -> bool {
        match self {
            StringOperator::StartsWith => first.as_ref().starts_with(second.as_ref()),
            StringOperator::EndsWith => first.as_ref().ends_with(second.as_ref()),
        }
    }
}

impl fmt::Display for StringOperator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StringOperator::StartsWith => write!(f, "starts_with"),
            StringOperator::EndsWith => write!(f, "ends_with"),
        }
    }
}

/// Relational operators.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "content")]
pub enum RelationalOperator {
    Equals,
    NotEquals,
    Greater,
    Less,
    GreaterEqual,
    LessEqual,
}

impl RelationalOperator {
    pub fn apply<T: PartialEq + PartialOrd>(&self, first: T, second: T) -> bool {
        match self {
            RelationalOperator::Equals => first == second,
            RelationalOperator::NotEquals => first != second,
            RelationalOperator::Greater => first > second,
            RelationalOperator::Less => first < second,
            RelationalOperator::GreaterEqual => first >= second,
            RelationalOperator::LessEqual => first <= second,
        }
    }
}

impl fmt::Display for RelationalOperator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let symbol = match self {
            RelationalOperator::Equals => "==",
            RelationalOperator::NotEquals => "!=",
            RelationalOperator::Greater => ">",
            RelationalOperator::Less => "<",
            RelationalOperator::GreaterEqual => ">=",
            RelationalOperator::LessEqual => "<=",
        };
        write!(f, "{symbol}")
    }
}

/// Operators intended to be used on collections.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "content")]
pub enum MultiOperator {
    Contains,
}

impl fmt::Display for MultiOperator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MultiOperator::Contains => write!(f, "contains"),
        }
    }
}

/// A scalar type a field can evaluate to.
///
/// Knows how to parse a rule literal into itself and which operators it supports.
pub(crate) trait Primitive: PartialEq + Send + Sync + Sized + 'static {
    const TYPE: FieldType;

    fn parse(value: &str) -> Result<Self, SeclError>;

    fn operator_fn(op: &Operator) -> Result<OperatorFn<Self>, SeclError>;
}

impl Primitive for i64 {
    const TYPE: FieldType = FieldType::Int;

    fn parse(value: &str) -> Result<Self, SeclError> {
        parse_int(value).ok_or_else(|| SeclError::FieldValueParseError {
            value: value.to_string(),
            expected: Self::TYPE,
        })
    }

    fn operator_fn(op: &Operator) -> Result<OperatorFn<Self>, SeclError> {
        match op {
            Operator::Relational(op) => {
                let op = *op;
                Ok(Box::new(move |a, b| op.apply(a, b)))
            }
            _ => Err(SeclError::OperatorNotAllowedOnType(
                op.clone(),
                Self::TYPE.to_string(),
            )),
        }
    }
}

impl Primitive for String {
    const TYPE: FieldType = FieldType::String;

    fn parse(value: &str) -> Result<Self, SeclError> {
        Ok(value.to_string())
    }

    fn operator_fn(op: &Operator) -> Result<OperatorFn<Self>, SeclError> {
        match op {
            Operator::Relational(op) => {
                let op = *op;
                Ok(Box::new(move |a, b| op.apply(a, b)))
            }
            Operator::String(op) => {
                let op = *op;
                Ok(Box::new(move |a, b| op.apply(a, b)))
            }
            Operator::Multi(MultiOperator::Contains) => Ok(Box::new(|a, b| a.contains(b.as_str()))),
        }
    }
}

impl Primitive for bool {
    const TYPE: FieldType = FieldType::Bool;

    fn parse(value: &str) -> Result<Self, SeclError> {
        value
            .parse()
            .map_err(|_| SeclError::FieldValueParseError {
                value: value.to_string(),
                expected: Self::TYPE,
            })
    }

    fn operator_fn(op: &Operator) -> Result<OperatorFn<Self>, SeclError> {
        match op {
            Operator::Relational(RelationalOperator::Equals) => Ok(Box::new(|a, b| a == b)),
            Operator::Relational(RelationalOperator::NotEquals) => Ok(Box::new(|a, b| a != b)),
            _ => Err(SeclError::OperatorNotAllowedOnType(
                op.clone(),
                Self::TYPE.to_string(),
            )),
        }
    }
}

/// Parse an integer literal: decimal, `0x` hexadecimal, `0o` octal or `0b` binary,
/// optionally negative.
pub(crate) fn parse_int(value: &str) -> Option<i64> {
    let value = value.trim();
    let (negative, digits) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value),
    };

    let (radix, digits) = if let Some(rest) = digits.strip_prefix("0x") {
        (16, rest)
    } else if let Some(rest) = digits.strip_prefix("0o") {
        (8, rest)
    } else if let Some(rest) = digits.strip_prefix("0b") {
        (2, rest)
    } else {
        (10, digits)
    };

    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return None;
    }

    // Parsing as i128 lets u64 masks (capabilities, inodes) be written in full.
    let magnitude = i128::from_str_radix(digits, radix).ok()?;
    let value = if negative { -magnitude } else { magnitude };

    if let Ok(value) = i64::try_from(value) {
        Some(value)
    } else {
        u64::try_from(value).ok().map(|value| value as i64)
    }
}
