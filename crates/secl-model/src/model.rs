use std::sync::Arc;

use secl_eval::{
    Evaluator, FieldEventType, FieldIterator, FieldType, FieldValue, IteratorFactory, Model,
    RegisterId, SeclError, Weight,
};
use strum::IntoEnumIterator;

use crate::{
    Event, EventType, ProcessAncestorsIterator, ProcessCacheEntry, Resolvers, registry::REGISTRY,
};

/// Name of the only iterable field: the lineage of the event process.
pub const ANCESTORS_ITERATOR: &str = "process.ancestors";

/// The security event model: kernel events with their process and container context.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecurityModel;

/// Static description of a field, as listed by [SecurityModel::fields].
#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
    pub name: &'static str,
    pub field_type: FieldType,
    pub is_array: bool,
    pub event_type: FieldEventType<EventType>,
    pub weight: Weight,
    /// Event attribute the field reads from.
    pub backing: &'static str,
}

impl SecurityModel {
    /// All the registered fields, sorted by name.
    pub fn fields(&self) -> impl Iterator<Item = FieldInfo> {
        REGISTRY.descriptors().map(|descriptor| FieldInfo {
            name: descriptor.name(),
            field_type: descriptor.field_type(),
            is_array: descriptor.is_array(),
            event_type: descriptor.event_type(),
            weight: descriptor.weight(),
            backing: descriptor.backing(),
        })
    }
}

impl Model for SecurityModel {
    type Event = Event;
    type Resolvers = dyn Resolvers;
    type EventType = EventType;
    type Element = Arc<ProcessCacheEntry>;

    fn get_event_types(&self) -> Vec<EventType> {
        EventType::iter().collect()
    }

    fn event_type_of(&self, event: &Event) -> EventType {
        event.event_type()
    }

    fn get_evaluator(
        &self,
        field: &str,
        register: Option<RegisterId>,
    ) -> Result<Evaluator<Self>, SeclError> {
        REGISTRY
            .get(field)
            .map(|descriptor| descriptor.evaluator(register))
    }

    fn get_iterator(&self, field: &str) -> Result<IteratorFactory<Self>, SeclError> {
        match field {
            ANCESTORS_ITERATOR => Ok(Arc::new(|| {
                Box::new(ProcessAncestorsIterator::default()) as Box<dyn FieldIterator<Self>>
            })),
            _ => Err(SeclError::IteratorNotSupported {
                field: field.to_string(),
            }),
        }
    }

    fn get_field_type(&self, field: &str) -> Result<FieldType, SeclError> {
        REGISTRY.get(field).map(|descriptor| descriptor.field_type())
    }

    fn get_field_event_type(&self, field: &str) -> Result<FieldEventType<EventType>, SeclError> {
        REGISTRY.get(field).map(|descriptor| descriptor.event_type())
    }

    fn get_all_field_names(&self) -> Vec<&'static str> {
        REGISTRY.descriptors().map(|descriptor| descriptor.name()).collect()
    }

    fn set_value(
        &self,
        event: &mut Event,
        field: &str,
        value: FieldValue,
    ) -> Result<(), SeclError> {
        REGISTRY.get(field)?.set(event, value)
    }
}
