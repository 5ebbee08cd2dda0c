//! Engine configuration.
//!
//! `EngineConfig` is explicitly constructed; `Default` gives the documented
//! defaults and a TOML file can override any subset of fields:
//!
//! ```toml
//! mutation_threshold = 8
//! selector_prefix = "acme"
//! disabled_detectors = ["mutation-volume"]
//!
//! [[token_overrides]]
//! token = "$mdDialog"
//! type_name = "MatDialog"
//! param_name = "dialog"
//! import_path = "@angular/material/dialog"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::UpliftError;
use crate::risk::DetectorKind;
use crate::schema::TargetToken;

/// Project-supplied mapping for a DI token the builtin table does not cover,
/// or whose builtin mapping should be replaced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenOverride {
    pub token: String,
    pub type_name: String,
    pub param_name: String,
    pub import_path: String,
}

impl TokenOverride {
    pub fn target(&self) -> TargetToken {
        TargetToken::new(&self.type_name, &self.param_name, &self.import_path)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Distinct top-level scope-field assignments at or above this count
    /// raise `HeavyMutationCount`
    #[serde(default = "default_mutation_threshold")]
    pub mutation_threshold: usize,

    /// Hazard detectors excluded from classification
    #[serde(default)]
    pub disabled_detectors: Vec<DetectorKind>,

    /// Prefix for generated component selectors, e.g. `app-user-detail`
    #[serde(default = "default_selector_prefix")]
    pub selector_prefix: String,

    /// Extra DI token mappings consulted before the builtin table
    #[serde(default)]
    pub token_overrides: Vec<TokenOverride>,
}

fn default_mutation_threshold() -> usize {
    6
}

fn default_selector_prefix() -> String {
    "app".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mutation_threshold: default_mutation_threshold(),
            disabled_detectors: Vec::new(),
            selector_prefix: default_selector_prefix(),
            token_overrides: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from an explicit TOML path.
    ///
    /// The path is user-supplied, so a missing file is an error rather than
    /// a silent fall-through to defaults.
    pub fn load_from(path: &Path) -> crate::Result<Self> {
        if !path.exists() {
            return Err(UpliftError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let config: EngineConfig =
            toml::from_str(&content).map_err(|e| UpliftError::Config {
                message: format!("failed to parse {}: {}", path.display(), e),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.mutation_threshold == 0 {
            return Err(UpliftError::Config {
                message: "mutation_threshold must be at least 1".to_string(),
            });
        }
        if self.selector_prefix.is_empty() {
            return Err(UpliftError::Config {
                message: "selector_prefix must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn is_detector_enabled(&self, detector: DetectorKind) -> bool {
        !self.disabled_detectors.contains(&detector)
    }

    pub fn token_override(&self, token: &str) -> Option<&TokenOverride> {
        self.token_overrides.iter().find(|o| o.token == token)
    }
}
