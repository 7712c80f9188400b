use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;
use anyhow::Context;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*(.*?)\s*\}\}").expect("static placeholder pattern"));

/// Simple interpolation: replace {{input}} and drop any other {{...}} placeholder
pub fn interpolate(template: &str, input: &str) -> anyhow::Result<String> {
    // Single pass so braces inside `input` are never treated as placeholders
    let s = PLACEHOLDER.replace_all(template, |caps: &regex::Captures| {
        if &caps[1] == "input" { input.to_string() } else { String::new() }
    });
    Ok(s.to_string())
}

/// Write `content` to `path`, creating parent directories as needed
pub fn write_file(path: &Path, content: &str) -> anyhow::Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("failed to create {:?}", dir))?;
    }
    fs::write(path, content).with_context(|| format!("failed to write {:?}", path))?;
    Ok(())
}

pub fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
