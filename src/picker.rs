use anyhow::{Context, Result};
use dialoguer::FuzzySelect;
use dialoguer::theme::ColorfulTheme;

use crate::config::Config;

/// Resolve a tunnel name, showing a fuzzy picker when none was given.
pub fn tunnel_name(name: Option<String>, prompt: &str, cfg: &Config) -> Result<String> {
    if let Some(name) = name {
        cfg.tunnel(&name)?;
        return Ok(name);
    }

    let names: Vec<String> = cfg.tunnels.keys().cloned().collect();
    let items: Vec<String> = cfg
        .tunnels
        .iter()
        .map(|(name, t)| format!("{} ({})", name, describe_host(&t.host)))
        .collect();
    let idx = pick(prompt, &items)?;
    Ok(names[idx].clone())
}

fn describe_host(host: &shaft::HostSpec) -> String {
    host.name.clone().unwrap_or_else(|| "?".to_string())
}

/// Show a fuzzy picker and return the selected item's index.
fn pick(prompt: &str, items: &[String]) -> Result<usize> {
    if items.is_empty() {
        anyhow::bail!("no tunnels configured");
    }

    FuzzySelect::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .items(items)
        .interact()
        .context("selection cancelled")
}
