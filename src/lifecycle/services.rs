//! # Shared service context.
//!
//! [`Services`] is handed to every lifecycle event. It exposes the same
//! [`EventBus`] and [`Config`] the orchestrator runs with, plus a
//! type-keyed extension map integrations use to share their own state.
//!
//! Cloning is cheap; all clones see the same bus, config and extensions.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::config::Config;
use crate::events::EventBus;

type Extensions = HashMap<TypeId, Arc<dyn Any + Send + Sync>>;

/// Shared handle to the orchestrator's services.
#[derive(Clone)]
pub struct Services {
    bus: Arc<EventBus>,
    config: Arc<Config>,
    extensions: Arc<RwLock<Extensions>>,
}

impl Services {
    /// Creates a context around an existing bus and config.
    pub fn new(bus: Arc<EventBus>, config: Arc<Config>) -> Self {
        Self {
            bus,
            config,
            extensions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// The event bus (same instance the pipeline publishes on).
    pub fn eventing(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Runtime configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Stores a service, returning the previous one of the same type.
    pub fn insert<T: Any + Send + Sync>(&self, value: T) -> Option<Arc<T>> {
        self.extensions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(TypeId::of::<T>(), Arc::new(value))
            .and_then(|prev| prev.downcast::<T>().ok())
    }

    /// Looks up a service by type.
    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.extensions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|v| v.downcast::<T>().ok())
    }
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let extensions = self.extensions.read().unwrap_or_else(PoisonError::into_inner).len();
        f.debug_struct("Services")
            .field("bus", &self.bus)
            .field("config", &self.config)
            .field("extensions", &extensions)
            .finish()
    }
}
