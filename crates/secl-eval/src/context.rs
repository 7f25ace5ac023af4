use std::{
    cell::RefCell,
    collections::HashMap,
    fmt,
    rc::Rc,
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Model, RegisterId};

/// Scope of the in-place cache used for scalar resolutions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScalarCache {
    /// A resolved value is stored on the event and reused by every later access.
    #[default]
    PerEvent,
    /// Values already present on the event are used, fresh resolutions are not stored.
    Disabled,
}

impl ScalarCache {
    pub fn stores(self) -> bool {
        self == ScalarCache::PerEvent
    }
}

impl fmt::Display for ScalarCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarCache::PerEvent => write!(f, "per-event"),
            ScalarCache::Disabled => write!(f, "disabled"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown scalar cache scope '{0}', expected 'per-event' or 'disabled'")]
pub struct ParseScalarCacheError(String);

impl FromStr for ScalarCache {
    type Err = ParseScalarCacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "per-event" => Ok(ScalarCache::PerEvent),
            "disabled" => Ok(ScalarCache::Disabled),
            other => Err(ParseScalarCacheError(other.to_string())),
        }
    }
}

enum CachedArray {
    Int(Rc<[i64]>),
    String(Rc<[String]>),
}

/// Scratch space of a single evaluation pass over one event.
///
/// It borrows the event and the resolvers, memoizes array results by field name and
/// holds the registers bound by quantified sub-expressions. A context must not
/// outlive the pass it was created for and is never shared between passes.
pub struct Context<'a, M: Model> {
    event: &'a M::Event,
    resolvers: &'a M::Resolvers,
    scalar_cache: ScalarCache,
    cache: RefCell<HashMap<String, CachedArray>>,
    registers: RefCell<HashMap<RegisterId, M::Element>>,
}

impl<'a, M: Model> Context<'a, M> {
    pub fn new(event: &'a M::Event, resolvers: &'a M::Resolvers) -> Self {
        Self {
            event,
            resolvers,
            scalar_cache: ScalarCache::default(),
            cache: RefCell::new(HashMap::new()),
            registers: RefCell::new(HashMap::new()),
        }
    }

    pub fn with_scalar_cache(mut self, scalar_cache: ScalarCache) -> Self {
        self.scalar_cache = scalar_cache;
        self
    }

    pub fn event(&self) -> &'a M::Event {
        self.event
    }

    pub fn resolvers(&self) -> &'a M::Resolvers {
        self.resolvers
    }

    pub fn scalar_cache(&self) -> ScalarCache {
        self.scalar_cache
    }

    /// Returns the cached int array of `field`, computing and storing it on the first call.
    pub fn int_array(&self, field: &str, compute: impl FnOnce() -> Vec<i64>) -> Rc<[i64]> {
        if let Some(CachedArray::Int(values)) = self.cache.borrow().get(field) {
            return Rc::clone(values);
        }

        let values: Rc<[i64]> = compute().into();
        self.cache
            .borrow_mut()
            .insert(field.to_string(), CachedArray::Int(Rc::clone(&values)));
        values
    }

    /// Returns the cached string array of `field`, computing and storing it on the first call.
    pub fn string_array(
        &self,
        field: &str,
        compute: impl FnOnce() -> Vec<String>,
    ) -> Rc<[String]> {
        if let Some(CachedArray::String(values)) = self.cache.borrow().get(field) {
            return Rc::clone(values);
        }

        let values: Rc<[String]> = compute().into();
        self.cache
            .borrow_mut()
            .insert(field.to_string(), CachedArray::String(Rc::clone(&values)));
        values
    }

    pub fn is_cached(&self, field: &str) -> bool {
        self.cache.borrow().contains_key(field)
    }

    /// Binds `element` to `register`, returning the previous binding.
    pub fn bind_register(&self, register: RegisterId, element: M::Element) -> Option<M::Element> {
        self.registers.borrow_mut().insert(register, element)
    }

    /// Restores `register` to a previous binding, or clears it.
    pub fn restore_register(&self, register: RegisterId, previous: Option<M::Element>) {
        let mut registers = self.registers.borrow_mut();
        match previous {
            Some(element) => registers.insert(register, element),
            None => registers.remove(&register),
        };
    }

    pub fn register(&self, register: RegisterId) -> Option<M::Element> {
        self.registers.borrow().get(&register).cloned()
    }
}
