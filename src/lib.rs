//! Plugin processing pipeline for scenario messages.
//!
//! A [`Registry`] holds the plugins known to the process, an
//! [`ActivationStore`] tracks which are active and how they are configured,
//! and a [`Pipeline`] applies them to text either implicitly (the active set,
//! fail-open) or explicitly through its [`Queue`] (fail-closed). Every step is
//! logged to a bounded [`History`].

pub mod error;
pub mod history;
pub mod persist;
pub mod pipeline;
pub mod plugins;
pub mod registry;
pub mod store;
pub mod util;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::PipelineError;
pub use history::{ExecutionResult, History};
pub use persist::PersistedState;
pub use pipeline::{ExecutionSettings, Pipeline, PipelineConfig, Queue};
pub use plugins::{OptionField, OptionKind, Options, Plugin, PluginInfo};
pub use registry::Registry;
pub use store::{ActivationState, ActivationStore};
