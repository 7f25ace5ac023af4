//! secl-eval is the evaluation runtime of security rules over kernel events.
//!
//! A [Model] exposes a registry of dotted field names (`open.file.path`,
//! `process.ancestors.uid`, ...) and turns each of them into a typed [Evaluator]:
//! a closure over an evaluation [Context] with an associated [Weight]. Rules are
//! trees of [Condition]s which reference those fields; compiling a rule validates
//! every field against the model, parses the literals into the field type and
//! produces a single closure.
//!
//! The compiler orders the operands of AND/OR chains by ascending weight, so a cheap
//! field read decides the outcome before any resolver or ancestor traversal runs:
//!
//! ```text
//! open.file.path == "/etc/shadow" && open.file.inode == 42
//!                  ^ handler              ^ function, evaluated first
//! ```
//!
//! A [Context] lives for a single evaluation pass over one event. It memoizes the
//! results of array fields, so several rules referencing the same ancestor field pay
//! for one traversal only.
//!
//! Rules which fail validation are rejected one by one when building a [Ruleset];
//! the remaining rules are still loaded.

use std::fmt;

use serde::{Deserialize, Serialize};

mod compiler;
mod context;
mod error;
mod evaluator;
mod model;
mod operators;
mod ruleset;
#[cfg(test)]
mod test_model;
mod value;

pub use compiler::*;
pub use context::*;
pub use error::SeclError;
pub use evaluator::*;
pub use model::*;
pub use operators::*;
pub use ruleset::*;
pub use value::*;

/// Representation of a simple rule.
///
/// It consists of a name and a [Condition] AST.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rule {
    pub name: String,
    pub condition: Condition,
}

impl Rule {
    pub fn compile<M: Model>(self, model: &M) -> Result<CompiledRule<M>, SeclError> {
        compile_rule(model, self.name, self.condition)
    }
}

/// Identifier of a variable bound by [Condition::Any].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct RegisterId(pub u32);

impl fmt::Display for RegisterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Representation of conditions before validation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "content")]
pub enum Condition {
    And {
        l: Box<Condition>,
        r: Box<Condition>,
    },
    Or {
        l: Box<Condition>,
        r: Box<Condition>,
    },
    Not {
        inner: Box<Condition>,
    },
    Base {
        field: String,
        #[serde(default)]
        register: Option<RegisterId>,
        op: Operator,
        value: Match,
    },
    /// A boolean field used as a condition on its own.
    Unary {
        field: String,
        #[serde(default)]
        register: Option<RegisterId>,
    },
    /// True when `inner` holds for at least one element of `iterator`, bound to `register`.
    Any {
        register: RegisterId,
        iterator: String,
        inner: Box<Condition>,
    },
}

/// Argument of the operator. It can be a literal, parsed into the type of the field,
/// or another field of the same type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Match {
    Value(String),
    Field {
        field: String,
        #[serde(default)]
        register: Option<RegisterId>,
    },
}
