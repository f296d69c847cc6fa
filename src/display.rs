use colored::Colorize;
use console::Alignment;

use shaft::{Supervisor, Tunnel};

use crate::config::Config;

/// Print a formatted list of all configured tunnels.
pub fn print_tunnel_list(cfg: &Config) {
    if cfg.tunnels.is_empty() {
        println!("{}", "No tunnels found in ~/.shaft/config.toml".yellow());
        println!("Add a [tunnels.<name>] table with a host and binds to get started.");
        return;
    }

    let rows: Vec<Row> = cfg
        .tunnels
        .iter()
        .map(|(name, t)| match t.build(shaft::OsSupervisor::new()) {
            Ok(tunnel) => Row {
                name: name.clone(),
                host: tunnel.host().to_string(),
                detail: Ok(tunnel
                    .bindings()
                    .iter()
                    .map(|b| b.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")),
            },
            Err(e) => Row {
                name: name.clone(),
                host: t.host.name.clone().unwrap_or_default(),
                detail: Err(e.to_string()),
            },
        })
        .collect();

    let w_name = rows.iter().map(|r| r.name.len()).max().unwrap_or(0);
    let w_host = rows.iter().map(|r| r.host.len()).max().unwrap_or(0);

    for row in &rows {
        let (bullet, detail) = match row.detail {
            Ok(ref binds) => ("○".dimmed().to_string(), binds.dimmed().to_string()),
            Err(ref e) => ("✗".red().to_string(), e.red().to_string()),
        };
        println!(
            "  {} {}  {}  {}",
            bullet,
            pad(&row.name.bold().to_string(), w_name),
            pad(&row.host, w_host),
            detail
        );
    }
}

/// Print the command line each binding runs with.
pub fn print_commands<S: Supervisor>(name: &str, tunnel: &Tunnel<S>) {
    println!("{}", name.bold());
    for command in tunnel.commands() {
        println!("  {}", command);
    }
}

/// Print one line per forward with its pid and whether it is still running.
pub fn print_liveness<S: Supervisor>(tunnel: &Tunnel<S>) {
    for (binding, pid, alive) in tunnel.liveness() {
        let icon = if alive {
            "●".green().to_string()
        } else {
            "✗".red().to_string()
        };
        let state = if alive { "running".green() } else { "exited".red() };
        println!(
            "  {} {}  {}  {}",
            icon,
            binding.to_string().dimmed(),
            state,
            format!("pid {}", pid).dimmed()
        );
    }
}

/// Pad an ANSI-colored string to a visible width using console's awareness of escape codes.
fn pad(s: &str, width: usize) -> String {
    console::pad_str(s, width, Alignment::Left, None).to_string()
}

struct Row {
    name: String,
    host: String,
    detail: Result<String, String>,
}
