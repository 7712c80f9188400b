//! Instrumented stub plugins shared by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::plugins::{OptionField, Options, Plugin};

/// Appends `|marker` to its input and counts invocations.
pub struct MarkerPlugin {
    id: String,
    marker: String,
    pub calls: AtomicUsize,
}

impl MarkerPlugin {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            marker: id.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn arc(id: &str) -> Arc<dyn Plugin> {
        Arc::new(Self::new(id))
    }

    pub fn arc_with_marker(id: &str, marker: &str) -> Arc<dyn Plugin> {
        let mut p = Self::new(id);
        p.marker = marker.to_string();
        Arc::new(p)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Plugin for MarkerPlugin {
    fn id(&self) -> &str { &self.id }
    fn name(&self) -> &str { "marker" }
    async fn process(&self, input: &str, _options: &Options) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{}|{}", input, self.marker))
    }
}

pub struct UpperPlugin;

#[async_trait]
impl Plugin for UpperPlugin {
    fn id(&self) -> &str { "upper" }
    fn name(&self) -> &str { "upper" }
    async fn process(&self, input: &str, _options: &Options) -> anyhow::Result<String> {
        Ok(input.to_uppercase())
    }
}

pub struct FailingPlugin {
    id: String,
    pub calls: AtomicUsize,
}

impl FailingPlugin {
    pub fn new(id: &str) -> Self {
        Self { id: id.to_string(), calls: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl Plugin for FailingPlugin {
    fn id(&self) -> &str { &self.id }
    fn name(&self) -> &str { "failing" }
    async fn process(&self, _input: &str, _options: &Options) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        anyhow::bail!("{} always fails", self.id)
    }
}

/// Sleeps before echoing its input.
pub struct SlowPlugin {
    pub id: String,
    pub delay: Duration,
}

#[async_trait]
impl Plugin for SlowPlugin {
    fn id(&self) -> &str { &self.id }
    fn name(&self) -> &str { "slow" }
    async fn process(&self, input: &str, _options: &Options) -> anyhow::Result<String> {
        tokio::time::sleep(self.delay).await;
        Ok(format!("{}|{}", input, self.id))
    }
}

pub struct PanickingPlugin;

#[async_trait]
impl Plugin for PanickingPlugin {
    fn id(&self) -> &str { "panics" }
    fn name(&self) -> &str { "panics" }
    async fn process(&self, _input: &str, _options: &Options) -> anyhow::Result<String> {
        panic!("boom")
    }
}

/// Renders `prefix` + input + `suffix` from its options, so tests can observe
/// which option values reached `process`.
pub struct AffixPlugin;

#[async_trait]
impl Plugin for AffixPlugin {
    fn id(&self) -> &str { "affix" }
    fn name(&self) -> &str { "affix" }
    fn options_schema(&self) -> Vec<OptionField> {
        vec![
            OptionField::text("prefix", "Prefix", "<"),
            OptionField::text("suffix", "Suffix", ">"),
        ]
    }
    async fn process(&self, input: &str, options: &Options) -> anyhow::Result<String> {
        let prefix = crate::plugins::opt_str(options, "prefix")?;
        let suffix = crate::plugins::opt_str(options, "suffix")?;
        Ok(format!("{}{}{}", prefix, input, suffix))
    }
}

/// Succeeds, then fires `token`, so the run is cancelled between steps.
pub struct CancellingPlugin {
    pub token: tokio_util::sync::CancellationToken,
}

#[async_trait]
impl Plugin for CancellingPlugin {
    fn id(&self) -> &str { "cancels" }
    fn name(&self) -> &str { "cancels" }
    async fn process(&self, input: &str, _options: &Options) -> anyhow::Result<String> {
        self.token.cancel();
        Ok(format!("{}|cancels", input))
    }
}
