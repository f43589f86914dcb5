//! Immutable init-param configuration bound to an adapter.
//!
//! An [`AdapterConfig`] is a read-only snapshot of named string options taken
//! before the first lifecycle event. Adapters declare the keys they
//! recognize; unrecognized keys are ignored, missing required keys are a
//! [`AdapterError::Configuration`] at configure time.

use std::{collections::BTreeMap, str::FromStr};

use crate::error::AdapterError;

/// Read-only mapping of init-param-style options.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AdapterConfig {
    options: BTreeMap<String, String>,
}

impl AdapterConfig {
    /// An empty configuration.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Add an option, returning the updated configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use wsbridge::config::AdapterConfig;
    ///
    /// let config = AdapterConfig::new().with_option("method", "GET");
    /// assert_eq!(config.get("method"), Some("GET"));
    /// ```
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Look up an optional key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> { self.options.get(key).map(String::as_str) }

    /// Look up a required key.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] if the key is absent.
    pub fn require(&self, key: &str) -> Result<&str, AdapterError> {
        self.get(key).ok_or_else(|| AdapterError::missing_key(key))
    }

    /// Parse an optional key into `T`.
    ///
    /// Absent keys yield `Ok(None)`; a present but unparsable value is a
    /// configuration error naming the key.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] if the value does not parse.
    pub fn parse<T>(&self, key: &str) -> Result<Option<T>, AdapterError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(key)
            .map(|raw| {
                raw.parse().map_err(|err| {
                    AdapterError::configuration(format!("init param `{key}` is invalid: {err}"))
                })
            })
            .transpose()
    }

    /// Number of options in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize { self.options.len() }

    /// Whether the snapshot holds no options.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.options.is_empty() }
}

impl FromIterator<(String, String)> for AdapterConfig {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            options: iter.into_iter().collect(),
        }
    }
}
