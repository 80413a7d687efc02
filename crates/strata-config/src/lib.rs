//! Strata project configuration.
//!
//! Loads the per-project `strata.toml` that governs the content database:
//! - attachment-type mapping by file extension
//! - alternate-language identifiers and their URL prefixes/suffixes
//! - the primary alternative and whether it is served unprefixed ("rooted")
//! - ephemeral record-cache capacity
//!
//! A missing config file yields the defaults; a malformed one is an error.

mod error;

pub use error::ConfigError;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Name of the project configuration file.
pub const CONFIG_FILENAME: &str = "strata.toml";

/// Root configuration for a Strata project.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProjectConfig {
    /// Project display name
    pub name: Option<String>,

    /// Content loading configuration
    pub content: ContentConfig,

    /// Attachment type mapping
    pub attachments: AttachmentTypes,

    /// Alternate-language configuration
    pub alternatives: AlternativesConfig,
}

/// Content loading configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Capacity of the ephemeral (LRU) record cache tier
    pub ephemeral_cache_size: usize,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            ephemeral_cache_size: 500,
        }
    }
}

/// Mapping from lowercase file extension (without the dot) to an
/// attachment-type identifier (`image`, `video`, `audio`, `document`,
/// `text`, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AttachmentTypes {
    /// Extension -> type overrides, merged over the built-in table
    pub types: BTreeMap<String, String>,
}

impl Default for AttachmentTypes {
    fn default() -> Self {
        Self {
            types: BTreeMap::new(),
        }
    }
}

/// Built-in extension -> attachment-type table.
const DEFAULT_ATTACHMENT_TYPES: &[(&str, &str)] = &[
    ("jpg", "image"),
    ("jpeg", "image"),
    ("png", "image"),
    ("gif", "image"),
    ("svg", "image"),
    ("avi", "video"),
    ("mpg", "video"),
    ("mpeg", "video"),
    ("mp4", "video"),
    ("mov", "video"),
    ("webm", "video"),
    ("mp3", "audio"),
    ("wav", "audio"),
    ("ogg", "audio"),
    ("flac", "audio"),
    ("pdf", "document"),
    ("doc", "document"),
    ("docx", "document"),
    ("htm", "document"),
    ("html", "document"),
    ("txt", "text"),
    ("log", "text"),
    ("md", "text"),
];

impl AttachmentTypes {
    /// Resolve the attachment type for a file extension (without the dot).
    ///
    /// Project overrides take precedence over the built-in table. An empty
    /// override string disables the built-in mapping for that extension.
    pub fn type_for_extension(&self, ext: &str) -> Option<&str> {
        let ext = ext.trim_start_matches('.');
        if let Some(ty) = self.types.get(ext) {
            if ty.is_empty() {
                return None;
            }
            return Some(ty.as_str());
        }
        DEFAULT_ATTACHMENT_TYPES
            .iter()
            .find(|(e, _)| ext.eq_ignore_ascii_case(e))
            .map(|(_, ty)| *ty)
    }
}

/// One configured alternative (language/locale variant).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AlternativeSpec {
    /// URL prefix identifying this alternative, e.g. `/de/`
    pub url_prefix: Option<String>,

    /// URL suffix identifying this alternative, e.g. `.de.html`
    pub url_suffix: Option<String>,
}

/// Alternate-language configuration.
///
/// When `primary` is unset the alternative system is disabled entirely and
/// every record lives under the primary sentinel alternative.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AlternativesConfig {
    /// The primary alternative identifier
    pub primary: Option<String>,

    /// Configured alternatives by identifier
    pub entries: BTreeMap<String, AlternativeSpec>,
}

impl AlternativesConfig {
    /// Whether the alternative system is configured at all.
    pub fn is_configured(&self) -> bool {
        self.primary.is_some()
    }

    /// The primary alternative identifier, if configured.
    pub fn primary_alternative(&self) -> Option<&str> {
        self.primary.as_deref()
    }

    /// Whether `alt` names a configured alternative.
    pub fn is_valid_alternative(&self, alt: &str) -> bool {
        self.entries.contains_key(alt) || self.primary.as_deref() == Some(alt)
    }

    /// Whether the primary alternative is served without any URL prefix
    /// or suffix.
    pub fn primary_is_rooted(&self) -> bool {
        let Some(primary) = self.primary.as_deref() else {
            return false;
        };
        match self.entries.get(primary) {
            None => true,
            Some(spec) => {
                spec.url_suffix.is_none()
                    && matches!(spec.url_prefix.as_deref(), None | Some("/") | Some(""))
            }
        }
    }

    /// URL prefixes paired with their alternative, normalized to bare path
    /// segments (no surrounding slashes). Root prefixes are skipped; they
    /// are covered by [`Self::primary_is_rooted`].
    pub fn url_prefixes(&self) -> Vec<(String, String)> {
        let mut rv = Vec::new();
        for (alt, spec) in &self.entries {
            if let Some(prefix) = spec.url_prefix.as_deref() {
                let prefix = prefix.trim_matches('/');
                if !prefix.is_empty() {
                    rv.push((prefix.to_string(), alt.clone()));
                }
            }
        }
        rv
    }

    /// URL suffixes paired with their alternative.
    pub fn url_suffixes(&self) -> Vec<(String, String)> {
        let mut rv = Vec::new();
        for (alt, spec) in &self.entries {
            if let Some(suffix) = spec.url_suffix.as_deref() {
                if !suffix.is_empty() {
                    rv.push((suffix.to_string(), alt.clone()));
                }
            }
        }
        rv
    }

    /// Validate internal consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(primary) = self.primary.as_deref() {
            if !self.entries.is_empty() && !self.entries.contains_key(primary) {
                return Err(ConfigError::invalid_value(
                    "alternatives.primary",
                    format!("primary alternative '{primary}' has no [alternatives.entries] entry"),
                ));
            }
        }
        Ok(())
    }
}

impl ProjectConfig {
    /// Load configuration from a specific TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let config: ProjectConfig =
            toml::from_str(&raw).map_err(|e| ConfigError::parse_toml(path, e))?;
        config.alternatives.validate()?;
        debug!(path = %path.display(), "loaded project config");
        Ok(config)
    }

    /// Load the configuration for a project directory.
    ///
    /// Reads `<root>/strata.toml` when present, otherwise returns the
    /// defaults. A present-but-malformed file is an error.
    pub fn for_project(root: &Path) -> Result<Self, ConfigError> {
        let path = root.join(CONFIG_FILENAME);
        if path.is_file() {
            Self::from_file(&path)
        } else {
            debug!(root = %root.display(), "no project config, using defaults");
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_attachment_types() {
        let types = AttachmentTypes::default();
        assert_eq!(types.type_for_extension("jpg"), Some("image"));
        assert_eq!(types.type_for_extension(".jpg"), Some("image"));
        assert_eq!(types.type_for_extension("JPG"), Some("image"));
        assert_eq!(types.type_for_extension("mp4"), Some("video"));
        assert_eq!(types.type_for_extension("xyz"), None);
    }

    #[test]
    fn test_attachment_type_overrides() {
        let mut types = AttachmentTypes::default();
        types.types.insert("xyz".to_string(), "document".to_string());
        types.types.insert("jpg".to_string(), String::new());
        assert_eq!(types.type_for_extension("xyz"), Some("document"));
        // Empty override disables the built-in mapping
        assert_eq!(types.type_for_extension("jpg"), None);
    }

    #[test]
    fn test_alternatives_unconfigured() {
        let alts = AlternativesConfig::default();
        assert!(!alts.is_configured());
        assert!(!alts.primary_is_rooted());
        assert!(alts.url_prefixes().is_empty());
    }

    #[test]
    fn test_alternatives_rooted_primary() {
        let config: ProjectConfig = toml::from_str(
            r#"
            [alternatives]
            primary = "en"

            [alternatives.entries.en]
            url_prefix = "/"

            [alternatives.entries.de]
            url_prefix = "/de/"
            "#,
        )
        .unwrap();
        let alts = &config.alternatives;
        assert!(alts.is_configured());
        assert!(alts.primary_is_rooted());
        assert!(alts.is_valid_alternative("de"));
        assert!(!alts.is_valid_alternative("fr"));
        assert_eq!(
            alts.url_prefixes(),
            vec![("de".to_string(), "de".to_string())]
        );
    }

    #[test]
    fn test_alternatives_suffixes() {
        let config: ProjectConfig = toml::from_str(
            r#"
            [alternatives]
            primary = "en"

            [alternatives.entries.en]

            [alternatives.entries.de]
            url_suffix = ".de"
            "#,
        )
        .unwrap();
        assert_eq!(
            config.alternatives.url_suffixes(),
            vec![(".de".to_string(), "de".to_string())]
        );
    }

    #[test]
    fn test_validate_rejects_unknown_primary() {
        let alts: AlternativesConfig = toml::from_str(
            r#"
            primary = "fr"

            [entries.en]
            url_prefix = "/"
            "#,
        )
        .unwrap();
        assert!(alts.validate().is_err());
    }

    #[test]
    fn test_for_project_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProjectConfig::for_project(dir.path()).unwrap();
        assert_eq!(config.content.ephemeral_cache_size, 500);
        assert!(!config.alternatives.is_configured());
    }

    #[test]
    fn test_for_project_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILENAME),
            "name = \"demo\"\n\n[content]\nephemeral_cache_size = 32\n",
        )
        .unwrap();
        let config = ProjectConfig::for_project(dir.path()).unwrap();
        assert_eq!(config.name.as_deref(), Some("demo"));
        assert_eq!(config.content.ephemeral_cache_size, 32);
    }
}
