//! Durable pipeline state: which plugins are active, their options and the
//! most recent execution history. Stored as a JSON document.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::history::ExecutionResult;
use crate::plugins::Options;
use crate::util::write_file;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginFlag {
    #[serde(default)]
    pub active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    #[serde(default)]
    pub plugins: BTreeMap<String, PluginFlag>,
    #[serde(default)]
    pub plugin_options: BTreeMap<String, Options>,
    #[serde(default)]
    pub history: Vec<ExecutionResult>,
}

/// Load state from `path`; a missing file yields the empty state.
pub fn load_state(path: &Path) -> anyhow::Result<PersistedState> {
    if !path.exists() {
        return Ok(PersistedState::default());
    }
    let content = std::fs::read_to_string(path).with_context(|| format!("failed to read {:?}", path))?;
    let state: PersistedState =
        serde_json::from_str(&content).with_context(|| format!("failed to parse state {:?}", path))?;
    Ok(state)
}

pub fn save_state(path: &Path, state: &PersistedState) -> anyhow::Result<()> {
    let content = serde_json::to_string_pretty(state)?;
    write_file(path, &content)
}
