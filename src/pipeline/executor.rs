use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::PipelineError;
use crate::history::{ExecutionResult, History};
use crate::persist::PersistedState;
use crate::pipeline::queue::Queue;
use crate::plugins::{resolve_options, Options, Plugin};
use crate::registry::Registry;
use crate::store::ActivationStore;
use crate::util::millis;

pub const DEFAULT_PLUGIN_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct ExecutionSettings {
    /// Upper bound for a single `process` call; `None` waits forever
    pub plugin_timeout: Option<Duration>,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self { plugin_timeout: Some(DEFAULT_PLUGIN_TIMEOUT) }
    }
}

/// Runs plugin chains against text.
///
/// Two strategies share the same per-step machinery:
/// - implicit (`process_message`, `process_with_specific_plugins`): fail-open,
///   a failed step leaves the text unchanged and the chain continues;
/// - queue (`execute_queue`): fail-closed, the first failed step ends the run.
///
/// Every attempted step lands in the history and in the store's last-result
/// slot. Unregistered ids are skipped without a trace.
pub struct Pipeline {
    registry: Arc<Registry>,
    store: Arc<ActivationStore>,
    history: Arc<History>,
    queue: Queue,
    settings: ExecutionSettings,
}

impl Pipeline {
    pub fn new(registry: Arc<Registry>, store: Arc<ActivationStore>, history: Arc<History>) -> Self {
        Self {
            registry,
            store,
            history,
            queue: Queue::new(),
            settings: ExecutionSettings::default(),
        }
    }

    /// Pipeline with a fresh store and history around `registry`.
    pub fn with_registry(registry: Arc<Registry>, history_cap: usize) -> Self {
        let store = Arc::new(ActivationStore::new(registry.clone()));
        Self::new(registry, store, Arc::new(History::new(history_cap)))
    }

    pub fn with_settings(mut self, settings: ExecutionSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn registry(&self) -> &Arc<Registry> { &self.registry }
    pub fn store(&self) -> &Arc<ActivationStore> { &self.store }
    pub fn history(&self) -> &Arc<History> { &self.history }
    pub fn queue(&self) -> &Queue { &self.queue }
    pub fn settings(&self) -> &ExecutionSettings { &self.settings }

    /// Apply every active plugin, in registration order, to `input`.
    pub async fn process_message(&self, input: &str, cancel: &CancellationToken) -> String {
        let ids = self.store.list_active().await;
        self.fold(input, &ids, &HashMap::new(), cancel).await
    }

    /// Apply `ids` in the given order regardless of activation. Options in
    /// `overrides` take precedence over the stored ones for their id.
    pub async fn process_with_specific_plugins(
        &self,
        input: &str,
        ids: &[String],
        overrides: &HashMap<String, Options>,
        cancel: &CancellationToken,
    ) -> String {
        self.fold(input, ids, overrides, cancel).await
    }

    /// Run one plugin as its own run. `None` if `id` is not registered.
    pub async fn execute_plugin(
        &self,
        id: &str,
        input: &str,
        options: Option<&Options>,
        cancel: &CancellationToken,
    ) -> Option<ExecutionResult> {
        self.run_step(Uuid::new_v4(), id, input, options, cancel).await
    }

    /// Run the pipeline's queue against `input`, stopping at the first failure.
    ///
    /// A fired cancellation token counts as a failure: the next registered
    /// step is recorded with error `cancelled` and the run ends there, so a
    /// cancelled run never looks like a fully successful one.
    ///
    /// Calls are serialized: a second call waits until the run in flight has
    /// finished, then runs the queue as it is at that point.
    pub async fn execute_queue(&self, input: &str, cancel: &CancellationToken) -> Vec<ExecutionResult> {
        let _run = self.queue.begin().await;
        let ids = self.queue.ids().await;
        let run_id = Uuid::new_v4();
        info!(%run_id, steps = ids.len(), "executing queue");

        let mut results = Vec::with_capacity(ids.len());
        let mut current = input.to_string();
        for id in &ids {
            let Some(result) = self.run_step(run_id, id, &current, None, cancel).await else {
                continue;
            };
            let success = result.success;
            if success {
                current = result.output.clone();
            }
            results.push(result);
            if !success {
                warn!(%run_id, plugin = %id, "queue stopped at failed step");
                break;
            }
        }
        results
    }

    /// Restore persisted activation and history. Unknown plugin ids are dropped.
    pub async fn restore(&self, state: &PersistedState) {
        self.store.reconcile(&state.plugins, &state.plugin_options).await;
        self.history.extend(state.history.iter().cloned()).await;
    }

    /// Durable snapshot with at most `keep_history` most recent results.
    pub async fn snapshot(&self, keep_history: usize) -> PersistedState {
        let (plugins, plugin_options) = self.store.persisted().await;
        PersistedState {
            plugins,
            plugin_options,
            history: self.history.latest(keep_history).await,
        }
    }

    async fn fold(
        &self,
        input: &str,
        ids: &[String],
        overrides: &HashMap<String, Options>,
        cancel: &CancellationToken,
    ) -> String {
        let run_id = Uuid::new_v4();
        let mut current = input.to_string();
        for id in ids {
            let Some(result) = self.run_step(run_id, id, &current, overrides.get(id), cancel).await else {
                continue;
            };
            if result.success {
                current = result.output;
            } else if cancel.is_cancelled() {
                break;
            }
        }
        current
    }

    async fn run_step(
        &self,
        run_id: Uuid,
        id: &str,
        input: &str,
        options: Option<&Options>,
        cancel: &CancellationToken,
    ) -> Option<ExecutionResult> {
        let Some(plugin) = self.registry.get(id).await else {
            debug!(%run_id, plugin = %id, "skipping unregistered plugin");
            return None;
        };
        let options = match options {
            Some(o) => resolve_options(&plugin.options_schema(), o),
            None => self.store.options(id).await,
        };

        let started = Instant::now();
        let outcome = self.invoke(plugin.as_ref(), input, &options, cancel).await;
        let elapsed_ms = millis(started.elapsed());

        let (success, output, error) = match outcome {
            Ok(output) => {
                debug!(%run_id, plugin = %id, elapsed_ms, "plugin succeeded");
                (true, output, None)
            }
            Err(e) if e.is_cancelled() => {
                info!(%run_id, plugin = %id, elapsed_ms, "step cancelled");
                (false, input.to_string(), Some(e.to_string()))
            }
            Err(e) => {
                warn!(%run_id, plugin = %id, elapsed_ms, error = %e, "plugin failed");
                (false, input.to_string(), Some(e.to_string()))
            }
        };
        let result = ExecutionResult {
            plugin_id: id.to_string(),
            run_id,
            input: input.to_string(),
            output,
            execution_time_ms: elapsed_ms,
            success,
            error,
            timestamp: Utc::now(),
        };
        self.history.append(result.clone()).await;
        self.store.record_result(id, result.clone()).await;
        Some(result)
    }

    async fn invoke(
        &self,
        plugin: &dyn Plugin,
        input: &str,
        options: &Options,
        cancel: &CancellationToken,
    ) -> Result<String, PipelineError> {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        let call = AssertUnwindSafe(plugin.process(input, options)).catch_unwind();
        let limited = async {
            match self.settings.plugin_timeout {
                Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                    PipelineError::TimedOut { plugin: plugin.id().to_string(), timeout: limit }
                }),
                None => Ok(call.await),
            }
        };

        let settled = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(PipelineError::Cancelled),
            r = limited => r,
        }?;

        match settled {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(PipelineError::Failed(e)),
            Err(panic) => Err(PipelineError::Panicked {
                plugin: plugin.id().to_string(),
                message: panic_message(&*panic),
            }),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
