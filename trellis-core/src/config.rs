//! Renderer configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Tunables for a [`crate::Renderer`]. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Follow-up flush passes one batch may run before giving up with
    /// [`crate::ReconcileError::UpdateDepthExceeded`].
    pub max_update_passes: usize,
    /// Report each distinct advisory once per component type.
    pub dedupe_advisories: bool,
    /// Run declared prop validators on every props resolution.
    pub validate_props: bool,
    /// Compare owner-based and parent-based context for declared keys.
    pub check_context_divergence: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            max_update_passes: 64,
            dedupe_advisories: true,
            validate_props: true,
            check_context_divergence: true,
        }
    }
}

impl RendererConfig {
    pub fn from_json(source: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(source)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_documents_keep_defaults() {
        let config = RendererConfig::from_json(r#"{ "max_update_passes": 8 }"#).unwrap();
        assert_eq!(config.max_update_passes, 8);
        assert!(config.dedupe_advisories);
        assert!(config.check_context_divergence);
    }

    #[test]
    fn malformed_documents_are_rejected() {
        let err = RendererConfig::from_json("{ max_update_passes: }").unwrap_err();
        assert!(err.to_string().starts_with("invalid renderer configuration"));
    }
}
