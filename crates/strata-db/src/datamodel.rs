//! Datamodels and the datamodel registry.
//!
//! A datamodel governs field processing, visibility, labels and the
//! default child/attachment typing for the records it describes. Models
//! are TOML files under `models/` in the project tree; the registry
//! always contains the `page` and `none` built-ins, so datamodel
//! resolution can never come up empty.

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::value::Value;

/// Errors raised while loading datamodel definitions.
#[derive(Debug, Error)]
pub enum DatamodelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse datamodel '{path}': {source}")]
    ParseToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

pub type Result<T> = std::result::Result<T, DatamodelError>;

/// Declared type of a datamodel field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    String,
    Int,
    Float,
    Bool,
    /// Comma-separated list of strings
    Strings,
}

/// One declared field.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
}

/// Child configuration of a datamodel.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChildConfig {
    /// Default datamodel for child pages
    pub model: Option<String>,
    /// Default child ordering, `-field` reverses a key
    pub order_by: Option<Vec<String>>,
    /// Content path whose children replace this page's children
    pub replaced_with: Option<String>,
    /// Child field used for the default slug (falls back to `_id`)
    pub slug_field: Option<String>,
}

/// Attachment configuration of a datamodel.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AttachmentConfig {
    /// Default datamodel for attachments
    pub model: Option<String>,
}

/// On-disk shape of a model file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct RawDatamodel {
    expose: Option<bool>,
    label: Option<String>,
    parent: Option<String>,
    default_template: Option<String>,
    children: ChildConfig,
    attachments: AttachmentConfig,
    fields: Vec<FieldSpec>,
}

/// A loaded datamodel.
#[derive(Debug)]
pub struct Datamodel {
    pub name: String,
    /// Defining file; `None` for built-ins
    pub filename: Option<PathBuf>,
    /// Whether records of this model are exposed (visible) by default
    pub expose: bool,
    /// Record label format with `{field}` placeholders
    pub label: Option<String>,
    /// Parent model name for transitive dependency discovery
    pub parent: Option<String>,
    pub default_template: Option<String>,
    pub child_config: ChildConfig,
    pub attachment_config: AttachmentConfig,
    pub fields: Vec<FieldSpec>,
}

impl Datamodel {
    fn builtin(name: &str, expose: bool) -> Self {
        Self {
            name: name.to_string(),
            filename: None,
            expose,
            label: None,
            parent: None,
            default_template: None,
            child_config: ChildConfig::default(),
            attachment_config: AttachmentConfig::default(),
            fields: Vec::new(),
        }
    }

    fn from_raw(name: String, filename: PathBuf, raw: RawDatamodel) -> Self {
        Self {
            name,
            filename: Some(filename),
            expose: raw.expose.unwrap_or(true),
            label: raw.label,
            parent: raw.parent,
            default_template: raw.default_template,
            child_config: raw.children,
            attachment_config: raw.attachments,
            fields: raw.fields,
        }
    }

    /// Process raw text fields into typed values.
    ///
    /// Declared fields coerce per their type (an unparseable value
    /// degrades to undefined, it does not fail the load); undeclared
    /// fields stay strings. The reserved fields a record contract
    /// requires are always present, as explicit undefined markers when
    /// the file did not set them.
    pub fn process_raw_data(
        &self,
        raw: &BTreeMap<String, String>,
    ) -> BTreeMap<String, Value> {
        let mut data = BTreeMap::new();

        for (key, text) in raw {
            data.insert(key.clone(), Value::String(text.clone()));
        }
        for spec in &self.fields {
            let value = match raw.get(&spec.name) {
                None => Value::undefined(format!("field '{}' not set", spec.name)),
                Some(text) => coerce_field(&spec.name, spec.field_type, text),
            };
            data.insert(spec.name.clone(), value);
        }

        // The record carries its resolved model, not the raw `_model`
        // text (which may have been absent or implied).
        data.insert("_model".to_string(), Value::String(self.name.clone()));

        let hidden = match raw.get("_hidden") {
            None => Value::undefined("'_hidden' not set"),
            Some(text) => coerce_field("_hidden", FieldType::Bool, text),
        };
        data.insert("_hidden".to_string(), hidden);

        for key in ["_slug", "_template", "_attachment_type"] {
            data.entry(key.to_string())
                .or_insert_with(|| Value::undefined(format!("'{key}' not set")));
        }
        data
    }

    /// The default slug for a child of a record with this model.
    pub fn get_default_child_slug(&self, child_data: &BTreeMap<String, Value>) -> String {
        if let Some(field) = self.child_config.slug_field.as_deref() {
            if let Some(value) = child_data.get(field) {
                if !value.is_undefined() {
                    return slugify(&value.to_display_string());
                }
            }
        }
        child_data
            .get("_id")
            .map(|v| v.to_display_string())
            .unwrap_or_default()
    }

    /// The template used when a record does not set `_template`.
    pub fn get_default_template_name(&self) -> String {
        self.default_template
            .clone()
            .unwrap_or_else(|| format!("{}.html", self.name))
    }

    /// Format the record label from the model's label format, if any.
    /// `{field}` placeholders resolve against the record data.
    pub fn format_record_label(&self, data: &BTreeMap<String, Value>) -> Option<String> {
        let format = self.label.as_deref()?;
        let mut rv = String::new();
        let mut rest = format;
        while let Some(open) = rest.find('{') {
            rv.push_str(&rest[..open]);
            let Some(close) = rest[open..].find('}') else {
                rv.push_str(&rest[open..]);
                rest = "";
                break;
            };
            let field = &rest[open + 1..open + close];
            if let Some(value) = data.get(field) {
                rv.push_str(&value.to_display_string());
            }
            rest = &rest[open + close + 1..];
        }
        rv.push_str(rest);
        let rv = rv.trim();
        if rv.is_empty() {
            None
        } else {
            Some(rv.to_string())
        }
    }
}

fn coerce_field(name: &str, field_type: FieldType, text: &str) -> Value {
    match field_type {
        FieldType::String => Value::String(text.to_string()),
        FieldType::Int => match text.trim().parse::<i64>() {
            Ok(i) => Value::Int(i),
            Err(_) => Value::undefined(format!("field '{name}' is not an integer: {text:?}")),
        },
        FieldType::Float => match text.trim().parse::<f64>() {
            Ok(f) => Value::Float(f),
            Err(_) => Value::undefined(format!("field '{name}' is not a number: {text:?}")),
        },
        FieldType::Bool => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" | "on" => Value::Bool(true),
            "false" | "no" | "0" | "off" => Value::Bool(false),
            _ => Value::undefined(format!("field '{name}' is not a boolean: {text:?}")),
        },
        FieldType::Strings => Value::List(
            text.split(',')
                .map(|s| Value::String(s.trim().to_string()))
                .filter(|v| v.is_truthy())
                .collect(),
        ),
    }
}

fn slugify(value: &str) -> String {
    value
        .trim()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase()
}

/// Name of the model used when nothing else resolves.
pub const DEFAULT_MODEL: &str = "none";

/// The registry of loaded datamodels.
///
/// Always contains the `page` and `none` built-ins; `none` is the global
/// default and is never exposed.
#[derive(Debug)]
pub struct DatamodelRegistry {
    models: HashMap<String, Arc<Datamodel>>,
}

impl Default for DatamodelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DatamodelRegistry {
    pub fn new() -> Self {
        let mut models = HashMap::new();
        models.insert(
            "page".to_string(),
            Arc::new(Datamodel::builtin("page", true)),
        );
        models.insert(
            DEFAULT_MODEL.to_string(),
            Arc::new(Datamodel::builtin(DEFAULT_MODEL, false)),
        );
        Self { models }
    }

    /// Load the registry for a project: built-ins plus `models/*.toml`.
    pub fn load(project_root: &Path) -> Result<Self> {
        let mut registry = Self::new();
        let models_dir = project_root.join("models");
        if !models_dir.is_dir() {
            return Ok(registry);
        }
        for entry in std::fs::read_dir(&models_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("toml") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let text = std::fs::read_to_string(&path)?;
            let raw: RawDatamodel =
                toml::from_str(&text).map_err(|source| DatamodelError::ParseToml {
                    path: path.clone(),
                    source,
                })?;
            debug!(model = name, path = %path.display(), "loaded datamodel");
            registry.insert(Datamodel::from_raw(name.to_string(), path, raw));
        }
        Ok(registry)
    }

    pub fn insert(&mut self, model: Datamodel) {
        self.models.insert(model.name.clone(), Arc::new(model));
    }

    pub fn get(&self, name: &str) -> Option<Arc<Datamodel>> {
        self.models.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// The global default model. Always present.
    pub fn default_model(&self) -> Arc<Datamodel> {
        self.models[DEFAULT_MODEL].clone()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model_with_fields(fields: Vec<FieldSpec>) -> Datamodel {
        let mut model = Datamodel::builtin("post", true);
        model.fields = fields;
        model
    }

    #[test]
    fn test_registry_builtins() {
        let registry = DatamodelRegistry::new();
        assert!(registry.contains("page"));
        assert!(registry.contains("none"));
        assert!(registry.get("page").unwrap().expose);
        assert!(!registry.default_model().expose);
    }

    #[test]
    fn test_process_raw_data_types() {
        let model = model_with_fields(vec![
            FieldSpec {
                name: "count".into(),
                field_type: FieldType::Int,
            },
            FieldSpec {
                name: "tags".into(),
                field_type: FieldType::Strings,
            },
        ]);
        let mut raw = BTreeMap::new();
        raw.insert("count".to_string(), "42".to_string());
        raw.insert("tags".to_string(), "rust, web".to_string());
        raw.insert("title".to_string(), "Hello".to_string());
        let data = model.process_raw_data(&raw);

        assert!(matches!(data["count"], Value::Int(42)));
        assert!(matches!(&data["tags"], Value::List(items) if items.len() == 2));
        assert_eq!(data["title"].as_str(), Some("Hello"));
        assert_eq!(data["_model"].as_str(), Some("post"));
        assert!(data["_hidden"].is_undefined());
        assert!(data["_slug"].is_undefined());
    }

    #[test]
    fn test_process_raw_data_bad_int_degrades() {
        let model = model_with_fields(vec![FieldSpec {
            name: "count".into(),
            field_type: FieldType::Int,
        }]);
        let mut raw = BTreeMap::new();
        raw.insert("count".to_string(), "many".to_string());
        let data = model.process_raw_data(&raw);
        assert!(data["count"].is_undefined());
    }

    #[test]
    fn test_format_record_label() {
        let mut model = Datamodel::builtin("post", true);
        model.label = Some("{title} ({pub_date})".to_string());
        let mut data = BTreeMap::new();
        data.insert("title".to_string(), Value::from("Hello"));
        data.insert("pub_date".to_string(), Value::from("2024-01-01"));
        assert_eq!(
            model.format_record_label(&data).as_deref(),
            Some("Hello (2024-01-01)")
        );

        // All-placeholder label over missing fields yields nothing.
        model.label = Some("{missing}".to_string());
        assert_eq!(model.format_record_label(&data), None);
    }

    #[test]
    fn test_default_child_slug() {
        let mut model = Datamodel::builtin("blog", true);
        let mut data = BTreeMap::new();
        data.insert("_id".to_string(), Value::from("first-post"));
        data.insert("title".to_string(), Value::from("My First Post"));

        assert_eq!(model.get_default_child_slug(&data), "first-post");

        model.child_config.slug_field = Some("title".to_string());
        assert_eq!(model.get_default_child_slug(&data), "my-first-post");
    }

    #[test]
    fn test_load_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        let models = dir.path().join("models");
        std::fs::create_dir(&models).unwrap();
        std::fs::write(
            models.join("post.toml"),
            r#"
            label = "{title}"
            parent = "blog"

            [children]
            order_by = ["-pub_date"]

            [[fields]]
            name = "pub_date"
            type = "string"
            "#,
        )
        .unwrap();
        let registry = DatamodelRegistry::load(dir.path()).unwrap();
        let post = registry.get("post").unwrap();
        assert_eq!(post.parent.as_deref(), Some("blog"));
        assert_eq!(
            post.child_config.order_by.as_deref(),
            Some(&["-pub_date".to_string()][..])
        );
        assert!(post.filename.is_some());
    }
}
