mod cli;
mod config;
mod display;
mod picker;

use std::path::Path;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use shaft::{OsSupervisor, Supervisor, Tunnel, health};

use cli::{Cli, Command};
use config::Config;

fn main() -> Result<()> {
    clap_complete::CompleteEnv::with_factory(Cli::command).complete();

    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let config_path = cli.config.as_deref();
    let cfg = Config::load(config_path)?;

    match cli.command {
        Command::Up { name } => cmd_up(name, &cfg),
        Command::Show { name } => cmd_show(name, &cfg),
        Command::List => cmd_list(&cfg),
        Command::Config => cmd_config(config_path, &cfg),
        Command::Completions { shell } => cmd_completions(shell, &cfg),
    }
}

fn local_ports<S: Supervisor>(tunnel: &Tunnel<S>) -> Vec<u16> {
    tunnel
        .bindings()
        .iter()
        .filter_map(|b| b.local_port())
        .collect()
}

fn print_start_status<S: Supervisor>(name: &str, tunnel: &Tunnel<S>, cfg: &Config) {
    let pids: Vec<String> = tunnel.pids().iter().map(|p| p.to_string()).collect();
    let ports = local_ports(tunnel);

    if ports.is_empty() {
        // Reverse-only tunnel, nothing to probe locally
        println!(
            "{} {} {} (pid {})",
            "●".green(),
            name.green().bold(),
            "started".green(),
            pids.join(", "),
        );
        return;
    }
    let timeout = Duration::from_secs(cfg.health_timeout);
    let healthy = health::wait_healthy_ports(&ports, timeout);
    let health_msg = if healthy {
        format!("{} healthy", "✓".green())
    } else {
        format!("{} port not reachable yet", "✗".yellow())
    };
    println!(
        "{} {} {} (pid {}) — {}",
        "●".green(),
        name.green().bold(),
        "started".green(),
        pids.join(", "),
        health_msg
    );
}

fn cmd_up(name: Option<String>, cfg: &Config) -> Result<()> {
    let name = picker::tunnel_name(name, "Start tunnel", cfg)?;
    let supervisor =
        OsSupervisor::new().with_log_file(config::log_file(&name)?, cfg.max_log_size);
    let mut tunnel = cfg
        .tunnel(&name)?
        .build(supervisor)?
        .with_stop_signal(cfg.stop_signal);

    // Check for port conflicts before spawning
    let conflicts: Vec<String> = local_ports(&tunnel)
        .into_iter()
        .filter(|&p| !health::is_port_free(p))
        .map(|p| p.to_string())
        .collect();
    if !conflicts.is_empty() {
        anyhow::bail!(
            "local port(s) {} already in use — stop the conflicting process first",
            conflicts.join(", ")
        );
    }

    tunnel
        .start()
        .with_context(|| format!("failed to start tunnel '{}'", name))?;
    print_start_status(&name, &tunnel, cfg);

    let interval = Duration::from_secs(cfg.poll_interval.max(1));
    loop {
        thread::sleep(interval);
        if tunnel.is_active() {
            continue;
        }

        println!("{} {} {}", "✗".red(), name.red().bold(), "forward exited".red());
        display::print_liveness(&tunnel);
        tunnel
            .shutdown()
            .with_context(|| format!("failed to stop remaining forwards of '{}'", name))?;

        if !cfg.auto_restart {
            anyhow::bail!("tunnel '{}' went down", name);
        }
        tunnel
            .start()
            .with_context(|| format!("failed to restart tunnel '{}'", name))?;
        print_start_status(&name, &tunnel, cfg);
    }
}

fn cmd_show(name: Option<String>, cfg: &Config) -> Result<()> {
    let name = picker::tunnel_name(name, "Show tunnel", cfg)?;
    let tunnel = cfg.tunnel(&name)?.build(OsSupervisor::new())?;
    display::print_commands(&name, &tunnel);
    Ok(())
}

fn cmd_list(cfg: &Config) -> Result<()> {
    display::print_tunnel_list(cfg);
    Ok(())
}

fn cmd_config(path: Option<&Path>, cfg: &Config) -> Result<()> {
    let path = Config::init(path)?;
    let editor = cfg.resolve_editor();

    let status = std::process::Command::new(&editor)
        .arg(&path)
        .status()
        .with_context(|| format!("failed to launch editor '{}'", editor))?;

    if !status.success() {
        anyhow::bail!("editor exited with {}", status);
    }

    Ok(())
}

fn cmd_completions(shell: Option<clap_complete::Shell>, cfg: &Config) -> Result<()> {
    let shell = match shell {
        Some(s) => s,
        None => {
            let name = cfg.shell.as_deref().ok_or_else(|| {
                anyhow::anyhow!(
                    "no shell specified — use `shaft completions <shell>` or set `shell` in ~/.shaft/config.toml"
                )
            })?;
            name.parse::<clap_complete::Shell>()
                .map_err(|_| anyhow::anyhow!("unknown shell '{}' in config", name))?
        }
    };

    let shell_name = match shell {
        clap_complete::Shell::Bash => "bash",
        clap_complete::Shell::Zsh => "zsh",
        clap_complete::Shell::Fish => "fish",
        clap_complete::Shell::Elvish => "elvish",
        clap_complete::Shell::PowerShell => "powershell",
        _ => anyhow::bail!("unsupported shell"),
    };
    unsafe { std::env::set_var("COMPLETE", shell_name) };
    clap_complete::CompleteEnv::with_factory(Cli::command).complete();
    Ok(())
}
