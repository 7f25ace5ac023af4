use std::{fmt, rc::Rc};

use crate::{Context, FieldType, FieldValue, Model};

/// Relative evaluation cost of an evaluator.
///
/// Used by the compiler to test cheap operands before expensive ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Weight {
    /// Direct read of a struct field.
    Function,
    /// Needs a resolver call.
    Handler,
    /// Walks the ancestor chain.
    Iterator,
}

impl Weight {
    pub const fn cost(self) -> u32 {
        match self {
            Weight::Function => 5,
            Weight::Handler => 50,
            Weight::Iterator => 2000,
        }
    }
}

impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Weight::Function => write!(f, "function"),
            Weight::Handler => write!(f, "handler"),
            Weight::Iterator => write!(f, "iterator"),
        }
    }
}

/// Closure computing a value of type `T` from an evaluation [Context].
pub type EvalFn<M, T> = Box<dyn Fn(&Context<'_, M>) -> T + Send + Sync>;

/// Evaluator of a single field, returning values of type `T`.
pub struct TypedEvaluator<M: Model, T> {
    pub field: String,
    pub eval_fn: EvalFn<M, T>,
    pub weight: Weight,
}

impl<M: Model, T> TypedEvaluator<M, T> {
    pub fn new(
        field: impl Into<String>,
        weight: Weight,
        eval_fn: impl Fn(&Context<'_, M>) -> T + Send + Sync + 'static,
    ) -> Self {
        Self {
            field: field.into(),
            eval_fn: Box::new(eval_fn),
            weight,
        }
    }

    pub fn eval(&self, ctx: &Context<'_, M>) -> T {
        (self.eval_fn)(ctx)
    }
}

pub type IntEvaluator<M> = TypedEvaluator<M, i64>;
pub type StringEvaluator<M> = TypedEvaluator<M, String>;
pub type BoolEvaluator<M> = TypedEvaluator<M, bool>;
pub type IntArrayEvaluator<M> = TypedEvaluator<M, Rc<[i64]>>;
pub type StringArrayEvaluator<M> = TypedEvaluator<M, Rc<[String]>>;

/// Compiled, typed accessor of a field, built once per rule.
pub enum Evaluator<M: Model> {
    Int(IntEvaluator<M>),
    String(StringEvaluator<M>),
    Bool(BoolEvaluator<M>),
    IntArray(IntArrayEvaluator<M>),
    StringArray(StringArrayEvaluator<M>),
}

impl<M: Model> Evaluator<M> {
    pub fn field(&self) -> &str {
        match self {
            Evaluator::Int(e) => &e.field,
            Evaluator::String(e) => &e.field,
            Evaluator::Bool(e) => &e.field,
            Evaluator::IntArray(e) => &e.field,
            Evaluator::StringArray(e) => &e.field,
        }
    }

    pub fn weight(&self) -> Weight {
        match self {
            Evaluator::Int(e) => e.weight,
            Evaluator::String(e) => e.weight,
            Evaluator::Bool(e) => e.weight,
            Evaluator::IntArray(e) => e.weight,
            Evaluator::StringArray(e) => e.weight,
        }
    }

    /// Element type for array evaluators.
    pub fn field_type(&self) -> FieldType {
        match self {
            Evaluator::Int(_) | Evaluator::IntArray(_) => FieldType::Int,
            Evaluator::String(_) | Evaluator::StringArray(_) => FieldType::String,
            Evaluator::Bool(_) => FieldType::Bool,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Evaluator::IntArray(_) | Evaluator::StringArray(_))
    }

    pub fn eval(&self, ctx: &Context<'_, M>) -> FieldValue {
        match self {
            Evaluator::Int(e) => FieldValue::Int(e.eval(ctx)),
            Evaluator::String(e) => FieldValue::String(e.eval(ctx)),
            Evaluator::Bool(e) => FieldValue::Bool(e.eval(ctx)),
            Evaluator::IntArray(e) => FieldValue::IntArray(e.eval(ctx).to_vec()),
            Evaluator::StringArray(e) => FieldValue::StringArray(e.eval(ctx).to_vec()),
        }
    }
}

impl<M: Model> fmt::Debug for Evaluator<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Evaluator")
            .field("field", &self.field())
            .field("type", &self.field_type())
            .field("array", &self.is_array())
            .field("weight", &self.weight())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::Weight;

    #[test]
    fn weights_are_ordered_by_cost() {
        assert!(Weight::Function < Weight::Handler);
        assert!(Weight::Handler < Weight::Iterator);
        assert!(Weight::Function.cost() < Weight::Handler.cost());
        assert!(Weight::Handler.cost() < Weight::Iterator.cost());
    }
}
