use std::{fmt, sync::OnceLock};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Write-once slot for a value computed by a resolver.
///
/// The event decoder may fill it upfront; otherwise the first resolution stores the
/// value here and every later access reuses it. Filling goes through a shared
/// reference, so an event can be enriched while rules borrow it.
pub struct Resolved<T>(OnceLock<T>);

impl<T> Resolved<T> {
    pub const fn new() -> Self {
        Self(OnceLock::new())
    }

    pub fn with_value(value: T) -> Self {
        Self(OnceLock::from(value))
    }

    pub fn get(&self) -> Option<&T> {
        self.0.get()
    }

    pub fn is_resolved(&self) -> bool {
        self.0.get().is_some()
    }

    /// Overwrite the slot.
    pub fn set(&mut self, value: T) {
        self.0 = OnceLock::from(value);
    }
}

impl<T: Clone> Resolved<T> {
    /// Returns the stored value or calls `resolve`.
    ///
    /// With `store` the fresh value is kept in the slot, otherwise the slot is left
    /// untouched and the next access resolves again.
    pub fn get_or_resolve(&self, store: bool, resolve: impl FnOnce() -> T) -> T {
        if let Some(value) = self.0.get() {
            return value.clone();
        }

        if store {
            self.0.get_or_init(resolve).clone()
        } else {
            resolve()
        }
    }
}

impl<T> Default for Resolved<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Clone for Resolved<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: fmt::Debug> fmt::Debug for Resolved<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(value) => write!(f, "{value:?}"),
            None => write!(f, "<unresolved>"),
        }
    }
}

impl<T: PartialEq> PartialEq for Resolved<T> {
    fn eq(&self, other: &Self) -> bool {
        self.get() == other.get()
    }
}

impl<T: Serialize> Serialize for Resolved<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.get().serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Resolved<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Option::<T>::deserialize(deserializer)?
            .map(Resolved::with_value)
            .unwrap_or_default())
    }
}
