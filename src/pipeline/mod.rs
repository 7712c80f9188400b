pub mod config;
pub mod executor;
pub mod queue;

pub use config::{load_config, validate_config, PipelineConfig};
pub use executor::{ExecutionSettings, Pipeline};
pub use queue::Queue;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::history::ExecutionResult;
use crate::persist::{load_state, save_state};
use crate::plugins::builtin;
use crate::registry::Registry;

/// Build a pipeline over the built-in plugins from a config file: restore the
/// state file if there is one, then apply the config's activation, options
/// and queue.
pub async fn open(path: &Path) -> anyhow::Result<(Pipeline, PipelineConfig)> {
    let config = load_config(path)?;
    let registry = Arc::new(Registry::with_plugins(builtin::all()).await);
    validate_config(&config, &registry.describe().await)
        .with_context(|| format!("invalid pipeline config {:?}", path))?;

    let pipeline = Pipeline::with_registry(registry, config.history_cap).with_settings(config.settings());

    if let Some(state_path) = config.state_path(base_dir(path)) {
        let state = load_state(&state_path)?;
        pipeline.restore(&state).await;
        info!(state = ?state_path, "restored pipeline state");
    }

    for id in &config.active {
        pipeline.store().toggle(id, true).await;
    }
    for (id, options) in &config.options {
        pipeline.store().set_options(id, options.clone()).await;
    }
    if !config.queue.is_empty() {
        pipeline.queue().set(config.queue.clone()).await;
    }

    Ok((pipeline, config))
}

/// Save the pipeline state if the config names a state file
pub async fn persist(pipeline: &Pipeline, config: &PipelineConfig, path: &Path) -> anyhow::Result<()> {
    if let Some(state_path) = config.state_path(base_dir(path)) {
        let state = pipeline.snapshot(config.persist_history).await;
        save_state(&state_path, &state)?;
        info!(state = ?state_path, "saved pipeline state");
    }
    Ok(())
}

/// Public entry used by main.rs: implicit mode over the active plugins
pub async fn run_message(path: &Path, text: &str, cancel: &CancellationToken) -> anyhow::Result<String> {
    let (pipeline, config) = open(path).await?;
    info!(name = ?config.name, active = ?pipeline.store().list_active().await, "processing message");
    let out = pipeline.process_message(text, cancel).await;
    persist(&pipeline, &config, path).await?;
    Ok(out)
}

/// Public entry used by main.rs: explicit queue run
pub async fn run_queue(path: &Path, text: &str, cancel: &CancellationToken) -> anyhow::Result<Vec<ExecutionResult>> {
    let (pipeline, config) = open(path).await?;
    info!(name = ?config.name, queue = ?pipeline.queue().ids().await, "executing queue");
    let results = pipeline.execute_queue(text, cancel).await;
    persist(&pipeline, &config, path).await?;
    Ok(results)
}

/// Validate-only helper for main.rs
pub async fn validate_config_file(path: &Path) -> anyhow::Result<()> {
    let (_, config) = open(path).await?;
    println!("Pipeline '{}' validated", config.name.unwrap_or_else(|| "<unnamed>".to_string()));
    Ok(())
}

fn base_dir(path: &Path) -> &Path {
    path.parent().unwrap_or_else(|| Path::new("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::load_state;

    fn write_config(dir: &Path, yaml: &str) -> std::path::PathBuf {
        let path = dir.join("pipeline.yaml");
        std::fs::write(&path, yaml).unwrap();
        path
    }

    #[tokio::test]
    async fn message_run_applies_config_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"
name: demo
state_file: state.json
persist_history: 1
active: [trim, case, template]
options:
  template: { template: "[{{input}}]" }
"#,
        );
        let out = run_message(&path, "  hi there ", &CancellationToken::new()).await.unwrap();
        assert_eq!(out, "[HI THERE]");

        let state = load_state(&dir.path().join("state.json")).unwrap();
        assert!(state.plugins["case"].active);
        assert_eq!(state.history.len(), 1);
        assert_eq!(state.history[0].plugin_id, "template");
    }

    #[tokio::test]
    async fn restored_state_survives_between_runs() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_config(dir.path(), "state_file: s.json\nactive: [case]\n");
        run_message(&first, "a", &CancellationToken::new()).await.unwrap();

        let second = write_config(dir.path(), "state_file: s.json\n");
        let out = run_message(&second, "b", &CancellationToken::new()).await.unwrap();
        assert_eq!(out, "B");
    }

    #[tokio::test]
    async fn queue_run_stops_on_bad_regex() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"
queue: [case, regex_replace, trim]
options:
  regex_replace: { pattern: "(" }
"#,
        );
        let results = run_queue(&path, " x ", &CancellationToken::new()).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].success);
        assert!(!results[1].success);
        assert_eq!(results[1].output, " X ");
    }

    #[tokio::test]
    async fn invalid_config_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "active: [missing]\n");
        let err = validate_config_file(&path).await.unwrap_err();
        assert!(format!("{:#}", err).contains("not registered"));
    }
}
