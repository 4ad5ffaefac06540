//! Dispatcher settings and handler-to-interceptor binding configuration.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Dispatcher-level configuration.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Identifier of this node, stamped on contexts that arrive without one.
    pub node_id: String,
    /// Tenant assigned to contexts that arrive without one. `None` for
    /// single-tenant deployments.
    pub default_tenant: Option<String>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            node_id: "local".to_string(),
            default_tenant: None,
        }
    }
}

/// Errors raised while loading or validating a [`BindingConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read bindings from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed bindings: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("binding with an empty handler id")]
    EmptyHandler,
    #[error("handler {handler} has a blank interceptor id at position {position}")]
    BlankInterceptor { handler: String, position: usize },
    #[error("handler {handler} lists interceptor {interceptor} more than once")]
    DuplicateInterceptor { handler: String, interceptor: String },
}

/// Maps handler ids to the ordered interceptor ids that wrap them.
///
/// ```json
/// { "bindings": { "viewer": ["logging", "auth"], "health": [] } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingConfig {
    #[serde(default)]
    pub bindings: BTreeMap<String, Vec<String>>,
}

impl BindingConfig {
    /// Add (or replace) the binding for `handler`.
    #[must_use]
    pub fn bind<I, S>(mut self, handler: impl Into<String>, interceptors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bindings.insert(
            handler.into(),
            interceptors.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// Parse and validate bindings from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed JSON, or a validation error.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and validate bindings from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the file cannot be read, otherwise as
    /// [`BindingConfig::from_json`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Structural checks that do not need the interceptor registry.
    ///
    /// # Errors
    ///
    /// Returns the first violation found, in handler order.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (handler, interceptors) in &self.bindings {
            if handler.trim().is_empty() {
                return Err(ConfigError::EmptyHandler);
            }
            let mut seen = HashSet::new();
            for (position, id) in interceptors.iter().enumerate() {
                if id.trim().is_empty() {
                    return Err(ConfigError::BlankInterceptor {
                        handler: handler.clone(),
                        position,
                    });
                }
                if !seen.insert(id.as_str()) {
                    return Err(ConfigError::DuplicateInterceptor {
                        handler: handler.clone(),
                        interceptor: id.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn interceptors_for(&self, handler: &str) -> Option<&[String]> {
        self.bindings.get(handler).map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn dispatch_config_defaults() {
        let config = DispatchConfig::default();
        assert_eq!(config.node_id, "local");
        assert!(config.default_tenant.is_none());
    }

    #[test]
    fn parses_ordered_bindings() {
        let config = BindingConfig::from_json(
            r#"{ "bindings": { "viewer": ["logging", "auth"], "health": [] } }"#,
        )
        .unwrap();
        assert_eq!(
            config.interceptors_for("viewer").unwrap(),
            ["logging".to_string(), "auth".to_string()]
        );
        assert!(config.interceptors_for("health").unwrap().is_empty());
        assert!(config.interceptors_for("missing").is_none());
    }

    #[test]
    fn missing_bindings_key_is_empty() {
        let config = BindingConfig::from_json("{}").unwrap();
        assert!(config.bindings.is_empty());
    }

    #[test]
    fn rejects_blank_interceptor_id() {
        let err = BindingConfig::default()
            .bind("viewer", ["logging", " "])
            .validate()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::BlankInterceptor { ref handler, position: 1 } if handler == "viewer"
        ));
    }

    #[test]
    fn rejects_duplicate_interceptor_id() {
        let err = BindingConfig::default()
            .bind("viewer", ["auth", "logging", "auth"])
            .validate()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::DuplicateInterceptor { ref interceptor, .. } if interceptor == "auth"
        ));
    }

    #[test]
    fn rejects_empty_handler_id() {
        let err = BindingConfig::default()
            .bind("", ["logging"])
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::EmptyHandler));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = BindingConfig::from_json(r#"{ "bindings": ["logging"] }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "bindings": {{ "viewer": ["auth"] }} }}"#).unwrap();

        let config = BindingConfig::load(file.path()).unwrap();
        assert_eq!(config.interceptors_for("viewer").unwrap(), ["auth".to_string()]);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = BindingConfig::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
