use std::rc::Rc;

use crate::{
    Condition, Context, Evaluator, FieldEventType, FieldIterator, Match, Model, MultiOperator,
    Operator, RegisterId, RelationalOperator, SeclError, TypedEvaluator, Weight,
    operators::{OperatorFn, Primitive},
};

type ConditionFn<M> = Box<dyn Fn(&Context<'_, M>) -> bool + Send + Sync>;

/// Final form of a rule for a model `M`.
pub struct CompiledRule<M: Model> {
    pub name: String,
    event_type: FieldEventType<M::EventType>,
    fields: Vec<String>,
    condition: CompiledCondition<M>,
}

impl<M: Model> CompiledRule<M> {
    pub fn is_match(&self, ctx: &Context<'_, M>) -> bool {
        self.condition.eval(ctx)
    }

    /// Event type the rule applies to, inferred from its fields.
    pub fn event_type(&self) -> FieldEventType<M::EventType> {
        self.event_type
    }

    /// Fields referenced by the rule, in order of first appearance.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn weight(&self) -> u32 {
        self.condition.weight
    }
}

/// The logic of a rule: a closure returning [bool] and its cumulative weight.
pub struct CompiledCondition<M: Model> {
    weight: u32,
    eval_fn: ConditionFn<M>,
}

impl<M: Model> CompiledCondition<M> {
    fn new(weight: u32, eval_fn: impl Fn(&Context<'_, M>) -> bool + Send + Sync + 'static) -> Self {
        Self {
            weight,
            eval_fn: Box::new(eval_fn),
        }
    }

    pub fn eval(&self, ctx: &Context<'_, M>) -> bool {
        (self.eval_fn)(ctx)
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }
}

/// Compiler entrypoint.
///
/// Validates every field of `condition` against `model`, infers the event type of the
/// rule and generates a single closure.
pub fn compile_rule<M: Model>(
    model: &M,
    name: String,
    condition: Condition,
) -> Result<CompiledRule<M>, SeclError> {
    let mut compiler = Compiler {
        model,
        event_type: FieldEventType::Any,
        fields: Vec::new(),
        scopes: Vec::new(),
    };

    let condition = compiler.compile(condition)?;

    Ok(CompiledRule {
        name,
        event_type: compiler.event_type,
        fields: compiler.fields,
        condition,
    })
}

/// Compiles a standalone condition, without rule metadata.
pub fn compile_condition<M: Model>(
    model: &M,
    condition: Condition,
) -> Result<CompiledCondition<M>, SeclError> {
    compile_rule(model, String::new(), condition).map(|rule| rule.condition)
}

struct Compiler<'m, M: Model> {
    model: &'m M,
    event_type: FieldEventType<M::EventType>,
    fields: Vec<String>,
    // registers bound by the enclosing quantifiers, innermost last
    scopes: Vec<(RegisterId, String)>,
}

impl<M: Model> Compiler<'_, M> {
    fn compile(&mut self, condition: Condition) -> Result<CompiledCondition<M>, SeclError> {
        match condition {
            condition @ Condition::And { .. } => {
                let mut operands = Vec::new();
                flatten_and(condition, &mut operands);
                let operands = self.compile_all(operands)?;
                Ok(all(operands))
            }
            condition @ Condition::Or { .. } => {
                let mut operands = Vec::new();
                flatten_or(condition, &mut operands);
                let operands = self.compile_all(operands)?;
                Ok(any(operands))
            }
            Condition::Not { inner } => {
                let inner = self.compile(*inner)?;
                Ok(CompiledCondition::new(inner.weight, move |ctx| !inner.eval(ctx)))
            }
            Condition::Base {
                field,
                register,
                op,
                value,
            } => {
                let evaluator = self.evaluator(&field, register)?;
                match value {
                    Match::Value(literal) => compare_with_value(evaluator, &op, &literal),
                    Match::Field { field, register } => {
                        let other = self.evaluator(&field, register)?;
                        compare_with_field(evaluator, &op, other)
                    }
                }
            }
            Condition::Unary { field, register } => match self.evaluator(&field, register)? {
                Evaluator::Bool(evaluator) => Ok(CompiledCondition::new(
                    evaluator.weight.cost(),
                    move |ctx| evaluator.eval(ctx),
                )),
                other => Err(SeclError::UnaryExpressionFieldNotBool(
                    other.field().to_string(),
                )),
            },
            Condition::Any {
                register,
                iterator,
                inner,
            } => {
                let factory = self.model.get_iterator(&iterator)?;

                self.scopes.push((register, iterator));
                let inner = self.compile(*inner);
                self.scopes.pop();
                let inner = inner?;

                let weight = Weight::Iterator.cost().saturating_add(inner.weight);

                Ok(CompiledCondition::new(weight, move |ctx| {
                    let mut iterator = factory();
                    let mut current = iterator.front(ctx);
                    while let Some(element) = current {
                        let previous = ctx.bind_register(register, element);
                        let matched = inner.eval(ctx);
                        ctx.restore_register(register, previous);
                        if matched {
                            return true;
                        }
                        current = FieldIterator::next(iterator.as_mut());
                    }
                    false
                }))
            }
        }
    }

    fn compile_all(
        &mut self,
        operands: Vec<Condition>,
    ) -> Result<Vec<CompiledCondition<M>>, SeclError> {
        operands
            .into_iter()
            .map(|operand| self.compile(operand))
            .collect()
    }

    /// Validates a field reference and records it on the rule.
    fn evaluator(
        &mut self,
        field: &str,
        register: Option<RegisterId>,
    ) -> Result<Evaluator<M>, SeclError> {
        if let Some(register) = register {
            let Some((_, iterator)) = self.scopes.iter().rev().find(|(id, _)| *id == register)
            else {
                return Err(SeclError::UnknownRegister(register));
            };

            let reachable = field
                .strip_prefix(iterator.as_str())
                .is_some_and(|rest| rest.starts_with('.'));
            if !reachable {
                return Err(SeclError::RegisterNotBound {
                    field: field.to_string(),
                    register,
                });
            }
        }

        let field_event_type = self.model.get_field_event_type(field)?;
        self.merge_event_type(field_event_type)?;

        let evaluator = self.model.get_evaluator(field, register)?;

        if !self.fields.iter().any(|known| known == field) {
            self.fields.push(field.to_string());
        }

        Ok(evaluator)
    }

    fn merge_event_type(
        &mut self,
        field_event_type: FieldEventType<M::EventType>,
    ) -> Result<(), SeclError> {
        match (self.event_type, field_event_type) {
            (_, FieldEventType::Any) => Ok(()),
            (FieldEventType::Any, only) => {
                self.event_type = only;
                Ok(())
            }
            (FieldEventType::Only(first), FieldEventType::Only(second)) if first == second => {
                Ok(())
            }
            (FieldEventType::Only(first), FieldEventType::Only(second)) => {
                Err(SeclError::MultipleEventTypes {
                    first: first.to_string(),
                    second: second.to_string(),
                })
            }
        }
    }
}

fn flatten_and(condition: Condition, operands: &mut Vec<Condition>) {
    match condition {
        Condition::And { l, r } => {
            flatten_and(*l, operands);
            flatten_and(*r, operands);
        }
        other => operands.push(other),
    }
}

fn flatten_or(condition: Condition, operands: &mut Vec<Condition>) {
    match condition {
        Condition::Or { l, r } => {
            flatten_or(*l, operands);
            flatten_or(*r, operands);
        }
        other => operands.push(other),
    }
}

fn total_weight<M: Model>(operands: &[CompiledCondition<M>]) -> u32 {
    operands
        .iter()
        .fold(0u32, |total, operand| total.saturating_add(operand.weight))
}

// Sorting is stable: operands of equal weight keep the order of the rule.
fn all<M: Model>(mut operands: Vec<CompiledCondition<M>>) -> CompiledCondition<M> {
    operands.sort_by_key(|operand| operand.weight);
    let weight = total_weight(&operands);
    CompiledCondition::new(weight, move |ctx| {
        operands.iter().all(|operand| operand.eval(ctx))
    })
}

fn any<M: Model>(mut operands: Vec<CompiledCondition<M>>) -> CompiledCondition<M> {
    operands.sort_by_key(|operand| operand.weight);
    let weight = total_weight(&operands);
    CompiledCondition::new(weight, move |ctx| {
        operands.iter().any(|operand| operand.eval(ctx))
    })
}

fn compare_with_value<M: Model>(
    evaluator: Evaluator<M>,
    op: &Operator,
    literal: &str,
) -> Result<CompiledCondition<M>, SeclError> {
    match evaluator {
        Evaluator::Int(evaluator) => scalar_with_value(evaluator, op, literal),
        Evaluator::String(evaluator) => scalar_with_value(evaluator, op, literal),
        Evaluator::Bool(evaluator) => scalar_with_value(evaluator, op, literal),
        Evaluator::IntArray(evaluator) => array_with_value(evaluator, op, literal),
        Evaluator::StringArray(evaluator) => array_with_value(evaluator, op, literal),
    }
}

fn compare_with_field<M: Model>(
    first: Evaluator<M>,
    op: &Operator,
    second: Evaluator<M>,
) -> Result<CompiledCondition<M>, SeclError> {
    match (first, second) {
        (Evaluator::Int(first), Evaluator::Int(second)) => scalar_with_field(first, op, second),
        (Evaluator::String(first), Evaluator::String(second)) => {
            scalar_with_field(first, op, second)
        }
        (Evaluator::Bool(first), Evaluator::Bool(second)) => scalar_with_field(first, op, second),
        (Evaluator::IntArray(first), Evaluator::Int(second)) => {
            array_with_field(first, op, second)
        }
        (Evaluator::StringArray(first), Evaluator::String(second)) => {
            array_with_field(first, op, second)
        }
        (first, second) if first.field_type() == second.field_type() => Err(
            SeclError::ComparingFieldNotScalar(second.field().to_string()),
        ),
        (first, second) => Err(SeclError::DifferentFieldsType(
            first.field().to_string(),
            second.field().to_string(),
        )),
    }
}

fn scalar_with_value<M: Model, T: Primitive>(
    evaluator: TypedEvaluator<M, T>,
    op: &Operator,
    literal: &str,
) -> Result<CompiledCondition<M>, SeclError> {
    let value = T::parse(literal)?;
    let compare_fn = T::operator_fn(op)?;

    Ok(CompiledCondition::new(evaluator.weight.cost(), move |ctx| {
        compare_fn(&evaluator.eval(ctx), &value)
    }))
}

fn array_with_value<M: Model, T: Primitive>(
    evaluator: TypedEvaluator<M, Rc<[T]>>,
    op: &Operator,
    literal: &str,
) -> Result<CompiledCondition<M>, SeclError> {
    let value = T::parse(literal)?;
    let compare_fn = element_operator_fn::<T>(op)?;

    Ok(CompiledCondition::new(evaluator.weight.cost(), move |ctx| {
        evaluator
            .eval(ctx)
            .iter()
            .any(|item| compare_fn(item, &value))
    }))
}

fn scalar_with_field<M: Model, T: Primitive>(
    first: TypedEvaluator<M, T>,
    op: &Operator,
    second: TypedEvaluator<M, T>,
) -> Result<CompiledCondition<M>, SeclError> {
    let compare_fn = T::operator_fn(op)?;
    let weight = first.weight.cost().saturating_add(second.weight.cost());

    Ok(CompiledCondition::new(weight, move |ctx| {
        compare_fn(&first.eval(ctx), &second.eval(ctx))
    }))
}

fn array_with_field<M: Model, T: Primitive>(
    first: TypedEvaluator<M, Rc<[T]>>,
    op: &Operator,
    second: TypedEvaluator<M, T>,
) -> Result<CompiledCondition<M>, SeclError> {
    let compare_fn = element_operator_fn::<T>(op)?;
    let weight = first.weight.cost().saturating_add(second.weight.cost());

    Ok(CompiledCondition::new(weight, move |ctx| {
        let value = second.eval(ctx);
        first.eval(ctx).iter().any(|item| compare_fn(item, &value))
    }))
}

// On arrays `contains` means "one of the elements is equal to".
fn element_operator_fn<T: Primitive>(op: &Operator) -> Result<OperatorFn<T>, SeclError> {
    match op {
        Operator::Multi(MultiOperator::Contains) => {
            T::operator_fn(&Operator::Relational(RelationalOperator::Equals))
        }
        op => T::operator_fn(op),
    }
}
