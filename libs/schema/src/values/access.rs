//! Field accessor and instance factory capabilities
//!
//! Accessors are resolved once per field when a schema is bound, so the
//! encode/decode hot path dispatches on a small closed enum instead of
//! looking anything up by reflection.

use super::{Message, Value};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// Caller-supplied get/set logic for one field
pub trait FieldAccess: Send + Sync {
    fn get(&self, instance: &Message) -> Option<Value>;
    fn set(&self, instance: &mut Message, value: Option<Value>);
}

struct FnAccess<G, S> {
    get: G,
    set: S,
}

impl<G, S> FieldAccess for FnAccess<G, S>
where
    G: Fn(&Message) -> Option<Value> + Send + Sync,
    S: Fn(&mut Message, Option<Value>) + Send + Sync,
{
    fn get(&self, instance: &Message) -> Option<Value> {
        (self.get)(instance)
    }

    fn set(&self, instance: &mut Message, value: Option<Value>) {
        (self.set)(instance, value)
    }
}

/// How a field's value is read from and written to an instance
#[derive(Clone)]
pub enum Accessor {
    /// Slot on the [`Message`] keyed by `key`
    Direct { key: String },
    /// Computed get/set
    Computed(Arc<dyn FieldAccess>),
    /// Decoded values are dropped; encoding sees an absent value
    Ignore,
}

impl Accessor {
    pub fn direct(key: impl Into<String>) -> Self {
        Accessor::Direct { key: key.into() }
    }

    /// Computed accessor from a getter and a setter
    pub fn computed<G, S>(get: G, set: S) -> Self
    where
        G: Fn(&Message) -> Option<Value> + Send + Sync + 'static,
        S: Fn(&mut Message, Option<Value>) + Send + Sync + 'static,
    {
        Accessor::Computed(Arc::new(FnAccess { get, set }))
    }

    pub fn read<'a>(&self, instance: &'a Message) -> Option<Cow<'a, Value>> {
        match self {
            Accessor::Direct { key } => instance.get(key).map(Cow::Borrowed),
            Accessor::Computed(access) => access.get(instance).map(Cow::Owned),
            Accessor::Ignore => None,
        }
    }

    pub fn write(&self, instance: &mut Message, value: Option<Value>) {
        match self {
            Accessor::Direct { key } => instance.set(key, value),
            Accessor::Computed(access) => access.set(instance, value),
            Accessor::Ignore => {}
        }
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Accessor::Direct { key } => f.debug_struct("Direct").field("key", key).finish(),
            Accessor::Computed(_) => f.write_str("Computed"),
            Accessor::Ignore => f.write_str("Ignore"),
        }
    }
}

/// Produces fresh instances of a bound runtime type
#[derive(Clone)]
pub struct Factory(Arc<dyn Fn() -> Message + Send + Sync>);

impl Factory {
    /// Empty instance tagged with `type_name`
    pub fn for_type(type_name: impl Into<String>) -> Self {
        let type_name: String = type_name.into();
        Self(Arc::new(move || Message::new(type_name.clone())))
    }

    pub fn custom<F>(create: F) -> Self
    where
        F: Fn() -> Message + Send + Sync + 'static,
    {
        Self(Arc::new(create))
    }

    pub fn create(&self) -> Message {
        (self.0)()
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Factory")
    }
}
