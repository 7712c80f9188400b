mod cli;

use std::path::Path;

use anyhow::Context;
use scenepipe::pipeline;
use scenepipe::plugins::{builtin, PluginInfo};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    let opts = cli::get_opts();

    // Ctrl+C cancels whatever is in flight; the current step is recorded as cancelled
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            eprintln!("Received Ctrl+C - cancelling");
            cancel.cancel();
        });
    }

    let path = opts.path.as_deref().map(Path::new);
    let text = opts.text.as_deref().unwrap_or_default();
    match (opts.subcommand.as_str(), path) {
        ("run", Some(path)) => {
            let out = pipeline::run_message(path, text, &cancel).await.context("pipeline run failed")?;
            println!("{}", out);
        }
        ("queue", Some(path)) => {
            let results = pipeline::run_queue(path, text, &cancel).await.context("queue run failed")?;
            println!("{}", serde_json::to_string_pretty(&results)?);
            if results.iter().any(|r| !r.success) {
                std::process::exit(2);
            }
        }
        ("validate", Some(path)) => {
            pipeline::validate_config_file(path).await?;
        }
        ("list", _) => {
            let catalog: Vec<PluginInfo> = builtin::all().iter().map(|p| PluginInfo::of(p.as_ref())).collect();
            println!("{}", serde_json::to_string_pretty(&catalog)?);
        }
        (other, _) => {
            eprintln!("Unknown subcommand: {} (supported: run, queue, validate, list)", other);
            eprintln!("{}", cli::usage());
        }
    }

    Ok(())
}
