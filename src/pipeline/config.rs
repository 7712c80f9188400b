use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::Context;

use crate::history::DEFAULT_HISTORY_CAP;
use crate::pipeline::executor::{ExecutionSettings, DEFAULT_PLUGIN_TIMEOUT};
use crate::plugins::{OptionField, OptionKind, Options, PluginInfo};

/// Pipeline configuration read from YAML.
///
/// `active` and `options` are applied on top of any restored state; plugins
/// not listed keep whatever activation they had.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PipelineConfig {
    pub name: Option<String>,
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,
    /// How many history entries are written to the state file
    #[serde(default = "default_history_cap")]
    pub persist_history: usize,
    /// Per-plugin timeout, 0 disables it
    #[serde(default = "default_timeout_secs")]
    pub plugin_timeout_secs: u64,
    #[serde(default)]
    pub state_file: Option<PathBuf>,
    #[serde(default)]
    pub active: Vec<String>,
    #[serde(default)]
    pub options: BTreeMap<String, Options>,
    #[serde(default)]
    pub queue: Vec<String>,
}

fn default_history_cap() -> usize {
    DEFAULT_HISTORY_CAP
}

fn default_timeout_secs() -> u64 {
    DEFAULT_PLUGIN_TIMEOUT.as_secs()
}

impl PipelineConfig {
    pub fn settings(&self) -> ExecutionSettings {
        ExecutionSettings {
            plugin_timeout: (self.plugin_timeout_secs > 0)
                .then(|| Duration::from_secs(self.plugin_timeout_secs)),
        }
    }

    /// State file path, relative paths resolved against `base`
    pub fn state_path(&self, base: &Path) -> Option<PathBuf> {
        self.state_file.as_ref().map(|p| if p.is_absolute() { p.clone() } else { base.join(p) })
    }
}

/// Load YAML file into PipelineConfig
pub fn load_config(path: &Path) -> anyhow::Result<PipelineConfig> {
    let content = std::fs::read_to_string(path).with_context(|| format!("failed to read {:?}", path))?;
    let c: PipelineConfig = serde_yaml::from_str(&content).with_context(|| format!("failed to parse YAML {:?}", path))?;
    Ok(c)
}

/// Validate against the plugin catalog: known ids, no duplicate activation,
/// option values matching the declared field types
pub fn validate_config(c: &PipelineConfig, catalog: &[PluginInfo]) -> anyhow::Result<()> {
    if c.history_cap == 0 {
        anyhow::bail!("history_cap must be at least 1");
    }

    let known: HashMap<&str, &PluginInfo> = catalog.iter().map(|p| (p.id.as_str(), p)).collect();

    let mut seen = HashSet::new();
    for id in &c.active {
        if !known.contains_key(id.as_str()) {
            anyhow::bail!("active plugin '{}' is not registered", id);
        }
        if !seen.insert(id) {
            anyhow::bail!("plugin '{}' listed twice in active", id);
        }
    }

    for id in &c.queue {
        if !known.contains_key(id.as_str()) {
            anyhow::bail!("queued plugin '{}' is not registered", id);
        }
    }

    for (id, opts) in &c.options {
        let info = known
            .get(id.as_str())
            .with_context(|| format!("options given for unknown plugin '{}'", id))?;
        for (key, value) in opts {
            let field = info
                .options_schema
                .iter()
                .find(|f| &f.id == key)
                .with_context(|| format!("plugin '{}' has no option '{}'", id, key))?;
            check_value(field, value).with_context(|| format!("plugin '{}' option '{}'", id, key))?;
        }
    }

    Ok(())
}

fn check_value(field: &OptionField, value: &Value) -> anyhow::Result<()> {
    let ok = match field.kind {
        OptionKind::Text => value.is_string(),
        OptionKind::Number => value.is_number(),
        OptionKind::Boolean => value.is_boolean(),
        OptionKind::Select => {
            let choices = field.choices.as_deref().unwrap_or_default();
            match value.as_str() {
                Some(s) if choices.iter().any(|c| c == s) => true,
                Some(s) => anyhow::bail!("'{}' is not one of {:?}", s, choices),
                None => false,
            }
        }
    };
    if !ok {
        anyhow::bail!("expected a {:?} value, got {}", field.kind, value);
    }
    Ok(())
}
