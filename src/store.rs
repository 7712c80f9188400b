use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crate::history::ExecutionResult;
use crate::persist::PluginFlag;
use crate::plugins::{default_options, resolve_options, Options};
use crate::registry::Registry;

/// Activation and configuration of one plugin id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivationState {
    pub active: bool,
    /// Explicitly configured values; schema defaults are applied on read
    pub options: Options,
    pub last_result: Option<ExecutionResult>,
    pub last_executed_at: Option<DateTime<Utc>>,
}

/// Which plugins are active and how they are configured.
///
/// Entries are created lazily by `toggle`/`set_options`/`record_result` and
/// never removed. Ids are not validated against the registry here; the
/// executor skips unregistered ids.
pub struct ActivationStore {
    registry: Arc<Registry>,
    states: RwLock<HashMap<String, ActivationState>>,
}

impl ActivationStore {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            states: RwLock::new(HashMap::new()),
        }
    }

    pub async fn toggle(&self, id: &str, active: bool) {
        let mut states = self.states.write().await;
        states.entry(id.to_string()).or_default().active = active;
        debug!(plugin = %id, active, "plugin toggled");
    }

    /// Replaces the stored options wholesale.
    pub async fn set_options(&self, id: &str, options: Options) {
        let mut states = self.states.write().await;
        states.entry(id.to_string()).or_default().options = options;
    }

    /// Stored options laid over the plugin's schema defaults.
    pub async fn options(&self, id: &str) -> Options {
        let schema = match self.registry.get(id).await {
            Some(p) => p.options_schema(),
            None => Vec::new(),
        };
        let states = self.states.read().await;
        match states.get(id) {
            Some(s) => resolve_options(&schema, &s.options),
            None => default_options(&schema),
        }
    }

    pub async fn state(&self, id: &str) -> Option<ActivationState> {
        self.states.read().await.get(id).cloned()
    }

    pub async fn is_active(&self, id: &str) -> bool {
        self.states.read().await.get(id).map_or(false, |s| s.active)
    }

    /// Active ids in registry registration order. Active ids that are not
    /// registered are left out.
    pub async fn list_active(&self) -> Vec<String> {
        let ids = self.registry.ids().await;
        let states = self.states.read().await;
        ids.into_iter()
            .filter(|id| states.get(id).map_or(false, |s| s.active))
            .collect()
    }

    pub async fn record_result(&self, id: &str, result: ExecutionResult) {
        let mut states = self.states.write().await;
        let state = states.entry(id.to_string()).or_default();
        state.last_executed_at = Some(result.timestamp);
        state.last_result = Some(result);
    }

    /// Deactivates everything and restores schema defaults. Entries are kept.
    pub async fn reset(&self) {
        let schemas: HashMap<String, Options> = self
            .registry
            .all()
            .await
            .iter()
            .map(|p| (p.id().to_string(), default_options(&p.options_schema())))
            .collect();
        let mut states = self.states.write().await;
        for (id, state) in states.iter_mut() {
            state.active = false;
            state.options = schemas.get(id).cloned().unwrap_or_default();
        }
        debug!(entries = states.len(), "activation state reset");
    }

    /// Applies persisted activation. Ids the live registry does not know are
    /// dropped; for known ids the persisted options replace the stored ones.
    pub async fn reconcile(
        &self,
        plugins: &BTreeMap<String, PluginFlag>,
        plugin_options: &BTreeMap<String, Options>,
    ) {
        let ids: HashSet<&String> = plugins.keys().chain(plugin_options.keys()).collect();
        let mut restored = Vec::new();
        for id in ids {
            if !self.registry.contains(id).await {
                debug!(plugin = %id, "dropping persisted state for unregistered plugin");
                continue;
            }
            let active = plugins.get(id).map_or(false, |f| f.active);
            // Kept as configured; `options()` fills schema defaults on read
            let options = plugin_options.get(id).cloned().unwrap_or_default();
            restored.push((id.clone(), active, options));
        }

        let mut states = self.states.write().await;
        for (id, active, options) in restored {
            let state = states.entry(id).or_default();
            state.active = active;
            state.options = options;
        }
    }

    /// The durable subset: active flags and stored options.
    pub async fn persisted(&self) -> (BTreeMap<String, PluginFlag>, BTreeMap<String, Options>) {
        let states = self.states.read().await;
        let mut plugins = BTreeMap::new();
        let mut options = BTreeMap::new();
        for (id, s) in states.iter() {
            plugins.insert(id.clone(), PluginFlag { active: s.active });
            if !s.options.is_empty() {
                options.insert(id.clone(), s.options.clone());
            }
        }
        (plugins, options)
    }
}
