//! Plugins that ship with the binary. `all()` is the static registration list
//! handed to the registry at startup.

use std::sync::{Arc, LazyLock};

use anyhow::Context;
use async_trait::async_trait;
use regex::Regex;

use super::{opt_bool, opt_number, opt_str, OptionField, Options, Plugin};
use crate::util::interpolate;

pub fn all() -> Vec<Arc<dyn Plugin>> {
    vec![
        Arc::new(TrimPlugin),
        Arc::new(CasePlugin),
        Arc::new(RegexReplacePlugin),
        Arc::new(TruncatePlugin),
        Arc::new(TemplatePlugin),
    ]
}

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("static whitespace pattern"));

/// Strips surrounding whitespace, optionally collapsing inner runs.
pub struct TrimPlugin;

#[async_trait]
impl Plugin for TrimPlugin {
    fn id(&self) -> &str { "trim" }
    fn name(&self) -> &str { "Trim whitespace" }
    fn description(&self) -> &str {
        "Removes leading and trailing whitespace"
    }
    fn options_schema(&self) -> Vec<OptionField> {
        vec![OptionField::boolean("collapse", "Collapse inner whitespace", false)]
    }

    async fn process(&self, input: &str, options: &Options) -> anyhow::Result<String> {
        let trimmed = input.trim();
        if opt_bool(options, "collapse")? {
            return Ok(WHITESPACE.replace_all(trimmed, " ").into_owned());
        }
        Ok(trimmed.to_string())
    }
}

pub struct CasePlugin;

#[async_trait]
impl Plugin for CasePlugin {
    fn id(&self) -> &str { "case" }
    fn name(&self) -> &str { "Change case" }
    fn description(&self) -> &str {
        "Converts the text to upper or lower case"
    }
    fn options_schema(&self) -> Vec<OptionField> {
        vec![OptionField::select("mode", "Mode", "upper", &["upper", "lower"])]
    }

    async fn process(&self, input: &str, options: &Options) -> anyhow::Result<String> {
        match opt_str(options, "mode")? {
            "upper" => Ok(input.to_uppercase()),
            "lower" => Ok(input.to_lowercase()),
            other => anyhow::bail!("unknown case mode '{}'", other),
        }
    }
}

pub struct RegexReplacePlugin;

#[async_trait]
impl Plugin for RegexReplacePlugin {
    fn id(&self) -> &str { "regex_replace" }
    fn name(&self) -> &str { "Regex replace" }
    fn description(&self) -> &str {
        "Replaces every match of a pattern; $1-style group references are expanded"
    }
    fn options_schema(&self) -> Vec<OptionField> {
        vec![
            OptionField::text("pattern", "Pattern", ""),
            OptionField::text("replacement", "Replacement", ""),
        ]
    }

    async fn process(&self, input: &str, options: &Options) -> anyhow::Result<String> {
        let pattern = opt_str(options, "pattern")?;
        if pattern.is_empty() {
            return Ok(input.to_string());
        }
        let re = Regex::new(pattern).with_context(|| format!("invalid pattern {:?}", pattern))?;
        let replacement = opt_str(options, "replacement")?;
        Ok(re.replace_all(input, replacement).into_owned())
    }
}

/// Caps the text at `max_chars` characters, appending `ellipsis` when cut.
pub struct TruncatePlugin;

#[async_trait]
impl Plugin for TruncatePlugin {
    fn id(&self) -> &str { "truncate" }
    fn name(&self) -> &str { "Truncate" }
    fn description(&self) -> &str {
        "Limits the text to a maximum number of characters"
    }
    fn options_schema(&self) -> Vec<OptionField> {
        vec![
            OptionField::number("max_chars", "Maximum characters", 280.0),
            OptionField::text("ellipsis", "Ellipsis", "..."),
        ]
    }

    async fn process(&self, input: &str, options: &Options) -> anyhow::Result<String> {
        let max = opt_number(options, "max_chars")?;
        if max < 0.0 || max.fract() != 0.0 {
            anyhow::bail!("max_chars must be a non-negative integer, got {}", max);
        }
        let max = max as usize;
        if input.chars().count() <= max {
            return Ok(input.to_string());
        }
        let mut out: String = input.chars().take(max).collect();
        out.push_str(opt_str(options, "ellipsis")?);
        Ok(out)
    }
}

/// Wraps the text using a `{{input}}` template.
pub struct TemplatePlugin;

#[async_trait]
impl Plugin for TemplatePlugin {
    fn id(&self) -> &str { "template" }
    fn name(&self) -> &str { "Template" }
    fn description(&self) -> &str {
        "Renders a template where {{input}} is replaced by the text"
    }
    fn options_schema(&self) -> Vec<OptionField> {
        vec![OptionField::text("template", "Template", "{{input}}")]
    }

    async fn process(&self, input: &str, options: &Options) -> anyhow::Result<String> {
        interpolate(opt_str(options, "template")?, input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::{default_options, resolve_options};
    use serde_json::json;

    async fn run(plugin: &dyn Plugin, input: &str, overrides: serde_json::Value) -> anyhow::Result<String> {
        let configured: Options = serde_json::from_value(overrides).unwrap();
        let options = resolve_options(&plugin.options_schema(), &configured);
        plugin.process(input, &options).await
    }

    #[test]
    fn builtin_ids_are_unique() {
        let plugins = all();
        let mut ids: Vec<&str> = plugins.iter().map(|p| p.id()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), plugins.len());
    }

    #[tokio::test]
    async fn trim_defaults_and_collapse() {
        assert_eq!(run(&TrimPlugin, "  a  b ", json!({})).await.unwrap(), "a  b");
        assert_eq!(run(&TrimPlugin, "  a \n\t b ", json!({"collapse": true})).await.unwrap(), "a b");
    }

    #[tokio::test]
    async fn collapse_is_stable_across_calls() {
        for input in ["x   y", " x\ty ", "x\n\ny"] {
            assert_eq!(run(&TrimPlugin, input, json!({"collapse": true})).await.unwrap(), "x y");
        }
    }

    #[tokio::test]
    async fn case_modes() {
        assert_eq!(run(&CasePlugin, "Hello", json!({})).await.unwrap(), "HELLO");
        assert_eq!(run(&CasePlugin, "Hello", json!({"mode": "lower"})).await.unwrap(), "hello");
        assert!(run(&CasePlugin, "Hello", json!({"mode": "title"})).await.is_err());
    }

    #[tokio::test]
    async fn regex_replace_expands_groups_and_rejects_bad_patterns() {
        let out = run(
            &RegexReplacePlugin,
            "call 555-1234 now",
            json!({"pattern": r"(\d{3})-(\d{4})", "replacement": "$1-XXXX"}),
        )
        .await
        .unwrap();
        assert_eq!(out, "call 555-XXXX now");

        let err = run(&RegexReplacePlugin, "x", json!({"pattern": "("})).await.unwrap_err();
        assert!(err.to_string().contains("invalid pattern"));

        let opts = default_options(&RegexReplacePlugin.options_schema());
        assert_eq!(RegexReplacePlugin.process("same", &opts).await.unwrap(), "same");
    }

    #[tokio::test]
    async fn truncate_counts_characters() {
        assert_eq!(run(&TruncatePlugin, "héllo wörld", json!({"max_chars": 5})).await.unwrap(), "héllo...");
        assert_eq!(run(&TruncatePlugin, "short", json!({})).await.unwrap(), "short");
        assert!(run(&TruncatePlugin, "x", json!({"max_chars": -1})).await.is_err());
    }

    #[tokio::test]
    async fn template_wraps_input() {
        let out = run(&TemplatePlugin, "hi", json!({"template": "<p>{{input}}</p>{{unknown}}"})).await.unwrap();
        assert_eq!(out, "<p>hi</p>");
    }
}
