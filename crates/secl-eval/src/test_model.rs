//! Minimal model used by the unit tests of the compiler and the ruleset.

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use crate::{
    Condition, Context, Evaluator, FieldEventType, FieldIterator, FieldType, FieldValue,
    IteratorFactory, Match, Model, Operator, RegisterId, RelationalOperator, SeclError,
    TypedEvaluator, Weight,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Open,
    Exec,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Open => write!(f, "open"),
            Kind::Exec => write!(f, "exec"),
        }
    }
}

pub struct TestEvent {
    pub kind: Kind,
    pub pid: i64,
    pub path: String,
    pub flag: bool,
    pub argv: Vec<String>,
    pub ancestors: Vec<i64>,
}

impl TestEvent {
    pub fn open(pid: i64, path: &str) -> Self {
        Self {
            kind: Kind::Open,
            pid,
            path: path.to_string(),
            flag: false,
            argv: Vec::new(),
            ancestors: Vec::new(),
        }
    }

    pub fn exec(pid: i64, argv: &[&str]) -> Self {
        Self {
            kind: Kind::Exec,
            pid,
            path: String::new(),
            flag: false,
            argv: argv.iter().map(|arg| arg.to_string()).collect(),
            ancestors: Vec::new(),
        }
    }

    pub fn with_ancestors(mut self, ancestors: &[i64]) -> Self {
        self.ancestors = ancestors.to_vec();
        self
    }
}

/// Counts the calls of the expensive accessors.
#[derive(Default)]
pub struct Counters {
    pub path: AtomicUsize,
    pub walk: AtomicUsize,
}

impl Counters {
    pub fn path_calls(&self) -> usize {
        self.path.load(Ordering::SeqCst)
    }

    pub fn walks(&self) -> usize {
        self.walk.load(Ordering::SeqCst)
    }
}

pub struct TestModel;

const ANCESTORS_PID: &str = "process.ancestors.pid";

struct AncestorIterator {
    len: usize,
    pos: usize,
}

impl FieldIterator<TestModel> for AncestorIterator {
    fn front(&mut self, ctx: &Context<'_, TestModel>) -> Option<usize> {
        self.len = ctx.event().ancestors.len();
        self.pos = 0;
        (self.pos < self.len).then_some(self.pos)
    }

    fn next(&mut self) -> Option<usize> {
        self.pos += 1;
        (self.pos < self.len).then_some(self.pos)
    }
}

type TestContext<'a> = Context<'a, TestModel>;

impl Model for TestModel {
    type Event = TestEvent;
    type Resolvers = Counters;
    type EventType = Kind;
    type Element = usize;

    fn get_event_types(&self) -> Vec<Kind> {
        vec![Kind::Open, Kind::Exec]
    }

    fn event_type_of(&self, event: &TestEvent) -> Kind {
        event.kind
    }

    fn get_evaluator(
        &self,
        field: &str,
        register: Option<RegisterId>,
    ) -> Result<Evaluator<Self>, SeclError> {
        let evaluator: Evaluator<Self> = match field {
            "process.pid" => Evaluator::Int(TypedEvaluator::new(
                field,
                Weight::Function,
                |ctx: &TestContext| ctx.event().pid,
            )),
            "open.path" => Evaluator::String(TypedEvaluator::new(
                field,
                Weight::Handler,
                |ctx: &TestContext| {
                    ctx.resolvers().path.fetch_add(1, Ordering::SeqCst);
                    ctx.event().path.clone()
                },
            )),
            "open.flag" => Evaluator::Bool(TypedEvaluator::new(
                field,
                Weight::Function,
                |ctx: &TestContext| ctx.event().flag,
            )),
            "exec.argv" => Evaluator::StringArray(TypedEvaluator::new(
                field,
                Weight::Handler,
                |ctx: &TestContext| ctx.string_array("exec.argv", || ctx.event().argv.clone()),
            )),
            ANCESTORS_PID => match register {
                None => Evaluator::IntArray(TypedEvaluator::new(
                    field,
                    Weight::Iterator,
                    |ctx: &TestContext| {
                        ctx.int_array(ANCESTORS_PID, || {
                            ctx.resolvers().walk.fetch_add(1, Ordering::SeqCst);
                            ctx.event().ancestors.clone()
                        })
                    },
                )),
                Some(register) => Evaluator::IntArray(TypedEvaluator::new(
                    field,
                    Weight::Iterator,
                    move |ctx: &TestContext| {
                        let bound = ctx
                            .register(register)
                            .and_then(|index| ctx.event().ancestors.get(index).copied());
                        bound.into_iter().collect::<Vec<_>>().into()
                    },
                )),
            },
            _ => return Err(SeclError::field_not_found(field)),
        };
        Ok(evaluator)
    }

    fn get_iterator(&self, field: &str) -> Result<IteratorFactory<Self>, SeclError> {
        match field {
            "process.ancestors" => Ok(Arc::new(|| {
                Box::new(AncestorIterator { len: 0, pos: 0 }) as Box<dyn FieldIterator<Self>>
            })),
            _ => Err(SeclError::IteratorNotSupported {
                field: field.to_string(),
            }),
        }
    }

    fn get_field_type(&self, field: &str) -> Result<FieldType, SeclError> {
        match field {
            "process.pid" | ANCESTORS_PID => Ok(FieldType::Int),
            "open.path" | "exec.argv" => Ok(FieldType::String),
            "open.flag" => Ok(FieldType::Bool),
            _ => Err(SeclError::field_not_found(field)),
        }
    }

    fn get_field_event_type(&self, field: &str) -> Result<FieldEventType<Kind>, SeclError> {
        match field {
            "process.pid" | ANCESTORS_PID => Ok(FieldEventType::Any),
            "open.path" | "open.flag" => Ok(FieldEventType::Only(Kind::Open)),
            "exec.argv" => Ok(FieldEventType::Only(Kind::Exec)),
            _ => Err(SeclError::field_not_found(field)),
        }
    }

    fn get_all_field_names(&self) -> Vec<&'static str> {
        vec![
            "exec.argv",
            "open.flag",
            "open.path",
            ANCESTORS_PID,
            "process.pid",
        ]
    }

    fn set_value(
        &self,
        event: &mut TestEvent,
        field: &str,
        value: FieldValue,
    ) -> Result<(), SeclError> {
        match (field, value) {
            ("process.pid", FieldValue::Int(pid)) => event.pid = pid,
            ("open.path", FieldValue::String(path)) => event.path = path,
            ("open.flag", FieldValue::Bool(flag)) => event.flag = flag,
            (field, _) => {
                self.get_field_type(field)?;
                return Err(SeclError::ValueTypeMismatch {
                    field: field.to_string(),
                });
            }
        }
        Ok(())
    }
}

pub fn base(field: &str, op: RelationalOperator, value: &str) -> Condition {
    Condition::Base {
        field: field.to_string(),
        register: None,
        op: Operator::Relational(op),
        value: Match::Value(value.to_string()),
    }
}

pub fn eq(field: &str, value: &str) -> Condition {
    base(field, RelationalOperator::Equals, value)
}

pub fn and(l: Condition, r: Condition) -> Condition {
    Condition::And {
        l: Box::new(l),
        r: Box::new(r),
    }
}

pub fn or(l: Condition, r: Condition) -> Condition {
    Condition::Or {
        l: Box::new(l),
        r: Box::new(r),
    }
}
