//! Preview configuration.

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Marker appended to truncated plain-text content.
pub const TRUNCATION_MARKER: &str = " . . .";

/// Default upper bound on individually listed archive files.
pub const DEFAULT_MAX_LEAF_COUNT: usize = 1000;

/// Default upper bound on stored text length, in characters.
pub const DEFAULT_MAX_CONTENT_LENGTH: usize = 2000;

/// Limits and switches for preview generation.
///
/// Passed explicitly to the orchestrator so callers and tests can vary the
/// limits without touching any process-wide state.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct PreviewConfig {
    /// Global feature switch for previews.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub preview_enabled: bool,

    /// Maximum number of archive files listed individually.
    #[builder(default = "DEFAULT_MAX_LEAF_COUNT")]
    #[serde(default = "default_max_leaf_count")]
    pub max_leaf_count: usize,

    /// Maximum length of plain-text content, in characters.
    #[builder(default = "DEFAULT_MAX_CONTENT_LENGTH")]
    #[serde(default = "default_max_content_length")]
    pub max_content_length: usize,

    /// Generate missing previews while serving a request.
    #[builder(default = "false")]
    #[serde(default)]
    pub generate_on_page_load: bool,
}

fn default_true() -> bool {
    true
}

fn default_max_leaf_count() -> usize {
    DEFAULT_MAX_LEAF_COUNT
}

fn default_max_content_length() -> usize {
    DEFAULT_MAX_CONTENT_LENGTH
}

impl PreviewConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(max) = self.max_content_length {
            if max <= TRUNCATION_MARKER.chars().count() {
                return Err(format!(
                    "max_content_length must exceed the truncation marker length ({})",
                    TRUNCATION_MARKER.chars().count()
                ));
            }
        }
        if self.max_leaf_count == Some(0) {
            return Err("max_leaf_count must be at least 1".to_string());
        }
        Ok(())
    }
}

impl PreviewConfig {
    /// Create a new config builder.
    pub fn builder() -> PreviewConfigBuilder {
        PreviewConfigBuilder::default()
    }

    /// Check the invariants the builder enforces, for configs that were
    /// deserialized or assembled by hand.
    pub fn validate(&self) -> Result<(), String> {
        PreviewConfigBuilder::default()
            .max_content_length(self.max_content_length)
            .max_leaf_count(self.max_leaf_count)
            .validate()
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            preview_enabled: true,
            max_leaf_count: DEFAULT_MAX_LEAF_COUNT,
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
            generate_on_page_load: false,
        }
    }
}
