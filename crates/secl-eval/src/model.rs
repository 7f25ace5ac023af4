use std::{fmt, hash::Hash, sync::Arc};

use crate::{Context, Evaluator, FieldEventType, FieldType, FieldValue, RegisterId, SeclError};

/// Stateful cursor over the elements of an iterable field, like the ancestors of a process.
///
/// A fresh instance must be created for every traversal.
pub trait FieldIterator<M: Model> {
    /// Positions the cursor on the first element and returns it.
    fn front(&mut self, ctx: &Context<'_, M>) -> Option<M::Element>;

    /// Advances the cursor.
    fn next(&mut self) -> Option<M::Element>;
}

/// Builds a new [FieldIterator] for every traversal.
pub type IteratorFactory<M> = Arc<dyn Fn() -> Box<dyn FieldIterator<M>> + Send + Sync>;

/// The field registry of an event type.
///
/// Rule compilation only goes through this trait: it resolves dotted field names
/// into typed evaluators and answers static questions about them. Every lookup of
/// an unknown field fails with [SeclError::FieldNotFound].
pub trait Model: Send + Sync + Sized + 'static {
    /// Type rules are evaluated against.
    type Event;
    /// Backends turning raw values into human readable ones.
    type Resolvers: ?Sized;
    /// Tag of an event kind, used to select candidate rules.
    type EventType: Copy + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static;
    /// Element produced by the iterators of this model.
    type Element: Clone;

    fn get_event_types(&self) -> Vec<Self::EventType>;

    fn event_type_of(&self, event: &Self::Event) -> Self::EventType;

    /// Returns the evaluator of `field`.
    ///
    /// With a `register`, iterator-scoped fields evaluate the element currently bound to
    /// that register instead of walking the whole iterator.
    fn get_evaluator(
        &self,
        field: &str,
        register: Option<RegisterId>,
    ) -> Result<Evaluator<Self>, SeclError>;

    fn get_iterator(&self, field: &str) -> Result<IteratorFactory<Self>, SeclError>;

    fn get_field_type(&self, field: &str) -> Result<FieldType, SeclError>;

    fn get_field_event_type(
        &self,
        field: &str,
    ) -> Result<FieldEventType<Self::EventType>, SeclError>;

    /// All the field names, sorted.
    fn get_all_field_names(&self) -> Vec<&'static str>;

    fn set_value(
        &self,
        event: &mut Self::Event,
        field: &str,
        value: FieldValue,
    ) -> Result<(), SeclError>;

    /// Ad-hoc value fetch, sharing the caches of `ctx`.
    fn get_value(&self, ctx: &Context<'_, Self>, field: &str) -> Result<FieldValue, SeclError> {
        self.get_evaluator(field, None)
            .map(|evaluator| evaluator.eval(ctx))
    }
}
