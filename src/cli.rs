use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::engine::{ArgValueCompleter, CompletionCandidate};

use crate::config::Config;

#[derive(Parser)]
#[command(name = "shaft", about = "SSH tunnel supervisor", version)]
pub struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Config file (defaults to ~/.shaft/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

fn complete_tunnel_names(current: &std::ffi::OsStr) -> Vec<CompletionCandidate> {
    let prefix = current.to_str().unwrap_or("");
    let cfg = Config::load(None).unwrap_or_default();
    cfg.tunnels
        .keys()
        .filter(|name| name.starts_with(prefix))
        .map(|name| CompletionCandidate::new(name))
        .collect()
}

#[derive(Subcommand)]
pub enum Command {
    /// Start a tunnel and supervise it until interrupted
    Up {
        /// Tunnel name (interactive picker if omitted)
        #[arg(add = ArgValueCompleter::new(complete_tunnel_names))]
        name: Option<String>,
    },
    /// Print the ssh commands a tunnel would run
    Show {
        /// Tunnel name (interactive picker if omitted)
        #[arg(add = ArgValueCompleter::new(complete_tunnel_names))]
        name: Option<String>,
    },
    /// List all configured tunnels
    #[command(alias = "ls")]
    List,
    /// Initialize or edit ~/.shaft/config.toml
    Config,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for (reads from config if omitted)
        shell: Option<clap_complete::Shell>,
    },
}
