use std::collections::BTreeMap;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod builtin;

/// Configured option values for one plugin, keyed by option field id.
pub type Options = BTreeMap<String, Value>;

/// A text-to-text transformation unit.
///
/// Plugins are defined in code and registered once at startup. `process` may
/// fail; the pipeline decides whether a failure aborts the chain.
#[async_trait]
pub trait Plugin: Send + Sync {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn description(&self) -> &str {
        ""
    }
    fn version(&self) -> &str {
        "0.1.0"
    }
    /// Declarative description of the configurable fields, in display order.
    fn options_schema(&self) -> Vec<OptionField> {
        Vec::new()
    }
    async fn process(&self, input: &str, options: &Options) -> anyhow::Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionKind {
    Text,
    Number,
    Boolean,
    Select,
}

/// One configurable field of a plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionField {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: OptionKind,
    pub default: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<String>>,
}

impl OptionField {
    pub fn text(id: &str, label: &str, default: &str) -> Self {
        Self::new(id, label, OptionKind::Text, Value::from(default))
    }

    pub fn number(id: &str, label: &str, default: f64) -> Self {
        Self::new(id, label, OptionKind::Number, Value::from(default))
    }

    pub fn boolean(id: &str, label: &str, default: bool) -> Self {
        Self::new(id, label, OptionKind::Boolean, Value::from(default))
    }

    pub fn select(id: &str, label: &str, default: &str, choices: &[&str]) -> Self {
        let mut field = Self::new(id, label, OptionKind::Select, Value::from(default));
        field.choices = Some(choices.iter().map(|c| c.to_string()).collect());
        field
    }

    fn new(id: &str, label: &str, kind: OptionKind, default: Value) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            kind,
            default,
            choices: None,
        }
    }
}

/// Serializable metadata for a registered plugin.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub version: String,
    pub options_schema: Vec<OptionField>,
}

impl PluginInfo {
    pub fn of(plugin: &dyn Plugin) -> Self {
        Self {
            id: plugin.id().to_string(),
            name: plugin.name().to_string(),
            description: plugin.description().to_string(),
            version: plugin.version().to_string(),
            options_schema: plugin.options_schema(),
        }
    }
}

/// Schema defaults for every declared field.
pub fn default_options(schema: &[OptionField]) -> Options {
    schema
        .iter()
        .map(|f| (f.id.clone(), f.default.clone()))
        .collect()
}

/// Schema defaults overridden by `configured`. Keys outside the schema are kept.
pub fn resolve_options(schema: &[OptionField], configured: &Options) -> Options {
    let mut resolved = default_options(schema);
    for (k, v) in configured {
        if v.is_null() {
            continue;
        }
        resolved.insert(k.clone(), v.clone());
    }
    resolved
}

pub fn opt_str<'a>(options: &'a Options, key: &str) -> anyhow::Result<&'a str> {
    options
        .get(key)
        .and_then(Value::as_str)
        .with_context(|| format!("option '{}' must be a string", key))
}

pub fn opt_bool(options: &Options, key: &str) -> anyhow::Result<bool> {
    options
        .get(key)
        .and_then(Value::as_bool)
        .with_context(|| format!("option '{}' must be a boolean", key))
}

pub fn opt_number(options: &Options, key: &str) -> anyhow::Result<f64> {
    options
        .get(key)
        .and_then(Value::as_f64)
        .with_context(|| format!("option '{}' must be a number", key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Vec<OptionField> {
        vec![
            OptionField::text("prefix", "Prefix", ">> "),
            OptionField::boolean("loud", "Loud", false),
            OptionField::select("mode", "Mode", "upper", &["upper", "lower"]),
        ]
    }

    #[test]
    fn resolve_fills_missing_keys_with_defaults() {
        let mut configured = Options::new();
        configured.insert("loud".into(), json!(true));
        configured.insert("mode".into(), Value::Null);

        let resolved = resolve_options(&schema(), &configured);
        assert_eq!(resolved["prefix"], json!(">> "));
        assert_eq!(resolved["loud"], json!(true));
        assert_eq!(resolved["mode"], json!("upper"));
    }

    #[test]
    fn schema_serializes_in_declared_shape() {
        let field = OptionField::select("mode", "Mode", "upper", &["upper", "lower"]);
        let v = serde_json::to_value(&field).unwrap();
        assert_eq!(
            v,
            json!({"id": "mode", "label": "Mode", "type": "select", "default": "upper", "choices": ["upper", "lower"]})
        );
        let plain = serde_json::to_value(OptionField::number("n", "N", 3.0)).unwrap();
        assert!(plain.get("choices").is_none());
    }

    #[test]
    fn typed_accessors_report_bad_values() {
        let mut opts = Options::new();
        opts.insert("n".into(), json!("three"));
        let err = opt_number(&opts, "n").unwrap_err();
        assert!(err.to_string().contains("'n' must be a number"));
        assert!(opt_str(&opts, "n").is_ok());
        assert!(opt_bool(&opts, "missing").is_err());
    }
}
