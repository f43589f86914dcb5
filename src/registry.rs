//! Registry of adapter factories keyed by sub-protocol name.
//!
//! The registry is the seam where the connection manager selects the right
//! [`ProtocolAdapter`] for a freshly accepted connection, based on the
//! negotiated (or configured) sub-protocol name. Whether a registration
//! yields one instance per connection or a single shared instance is a
//! registry-level choice made via [`Activation`], not a property hardwired
//! into the adapter type: stateless adapters are cheap to share, stateful
//! ones want isolation.
//!
//! `configure` runs at most once per instance, always before the instance
//! sees any lifecycle event. For shared registrations that happens once at
//! registration time; for per-connection registrations it happens on every
//! [`AdapterRegistry::activate`].

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::{adapter::ProtocolAdapter, config::AdapterConfig, error::AdapterError};

/// Factory producing unconfigured adapter instances.
pub type AdapterFactory = dyn Fn() -> Box<dyn ProtocolAdapter> + Send + Sync;

/// Instance policy for a registered sub-protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Activation {
    /// A fresh instance is built and configured for every connection.
    PerConnection,
    /// One configured instance is shared across all connections.
    ///
    /// Shared adapters must keep any mutable state partitioned per
    /// connection, since hooks for distinct connections run concurrently.
    Shared,
}

enum Entry {
    Shared(Arc<dyn ProtocolAdapter>),
    PerConnection {
        factory: Arc<AdapterFactory>,
        config: AdapterConfig,
    },
}

/// Concurrent registry mapping sub-protocol names to adapter factories.
#[derive(Default)]
pub struct AdapterRegistry {
    entries: DashMap<String, Entry>,
}

impl AdapterRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Register a sub-protocol.
    ///
    /// For [`Activation::Shared`], the instance is built and configured
    /// immediately so configuration faults surface at registration rather
    /// than at the first connection.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] if `name` is already
    /// registered, or if a shared instance fails to configure.
    pub fn register<F>(
        &self,
        name: impl Into<String>,
        activation: Activation,
        config: AdapterConfig,
        factory: F,
    ) -> Result<(), AdapterError>
    where
        F: Fn() -> Box<dyn ProtocolAdapter> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.entries.contains_key(&name) {
            return Err(AdapterError::configuration(format!(
                "sub-protocol `{name}` is already registered"
            )));
        }
        let entry = match activation {
            Activation::Shared => {
                let mut adapter = factory();
                adapter.configure(&config)?;
                Entry::Shared(Arc::from(adapter))
            }
            Activation::PerConnection => Entry::PerConnection {
                factory: Arc::new(factory),
                config,
            },
        };
        debug!(sub_protocol = %name, ?activation, "registered adapter");
        self.entries.insert(name, entry);
        Ok(())
    }

    /// Produce the configured adapter for `name`.
    ///
    /// Shared registrations return the same instance every time;
    /// per-connection registrations build and configure a fresh one.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] for an unknown sub-protocol
    /// or when a fresh instance fails to configure.
    pub fn activate(&self, name: &str) -> Result<Arc<dyn ProtocolAdapter>, AdapterError> {
        let entry = self.entries.get(name).ok_or_else(|| {
            AdapterError::configuration(format!("unknown sub-protocol `{name}`"))
        })?;
        match entry.value() {
            Entry::Shared(adapter) => Ok(Arc::clone(adapter)),
            Entry::PerConnection { factory, config } => {
                let mut adapter = factory();
                adapter.configure(config)?;
                Ok(Arc::from(adapter))
            }
        }
    }

    /// Whether `name` has been registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool { self.entries.contains_key(name) }

    /// Names of all registered sub-protocols.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.key().clone()).collect()
    }
}
