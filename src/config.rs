use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use shaft::{Binding, BindingSpec, Host, HostSpec, Signal, Supervisor, Tunnel};

fn shaft_dir() -> Result<PathBuf> {
    let dir = dirs::home_dir()
        .context("cannot determine home directory")?
        .join(".shaft");
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

fn config_path() -> Result<PathBuf> {
    Ok(shaft_dir()?.join("config.toml"))
}

/// Path to the stderr log for a specific tunnel.
pub fn log_file(name: &str) -> Result<PathBuf> {
    Ok(shaft_dir()?.join("logs").join(format!("{}.log", name)))
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Shell for completions (bash, zsh, fish)
    pub shell: Option<String>,
    /// Editor for `shaft config` (overrides $VISUAL/$EDITOR)
    pub editor: Option<String>,
    /// Health check timeout in seconds
    pub health_timeout: u64,
    /// Seconds between liveness probes while `shaft up` runs
    pub poll_interval: u64,
    /// Restart a tunnel when one of its forwards dies
    pub auto_restart: bool,
    /// Signal used to stop forwards ("INT" or "TERM")
    pub stop_signal: Signal,
    /// Max log file size in bytes before rotation
    pub max_log_size: u64,
    pub tunnels: BTreeMap<String, TunnelConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shell: None,
            editor: None,
            health_timeout: 5,
            poll_interval: 2,
            auto_restart: false,
            stop_signal: Signal::Interrupt,
            max_log_size: 1_048_576,
            tunnels: BTreeMap::new(),
        }
    }
}

/// One `[tunnels.<name>]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TunnelConfig {
    pub host: HostSpec,
    #[serde(alias = "bind")]
    pub binds: Binds,
}

/// Either a single binding table or an array of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Binds {
    One(BindingSpec),
    Many(Vec<BindingSpec>),
}

impl TunnelConfig {
    /// Validate the host and bindings and build a tunnel around `supervisor`.
    pub fn build<S: Supervisor>(&self, supervisor: S) -> shaft::Result<Tunnel<S>> {
        let host = Host::try_from(self.host.clone())?;
        let specs = match self.binds {
            Binds::One(ref spec) => vec![spec.clone()],
            Binds::Many(ref specs) => specs.clone(),
        };
        let bindings = specs
            .into_iter()
            .map(Binding::try_from)
            .collect::<shaft::Result<Vec<_>>>()?;
        Tunnel::new(host, bindings, supervisor)
    }
}

impl Config {
    /// Load config from `path` or ~/.shaft/config.toml, falling back to
    /// defaults when the file doesn't exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => config_path()?,
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Resolve which editor to use: config > $VISUAL > $EDITOR > vi
    pub fn resolve_editor(&self) -> String {
        if let Some(ref e) = self.editor {
            return e.clone();
        }
        std::env::var("VISUAL")
            .or_else(|_| std::env::var("EDITOR"))
            .unwrap_or_else(|_| "vi".to_string())
    }

    /// Look up a tunnel by name.
    pub fn tunnel(&self, name: &str) -> Result<&TunnelConfig> {
        self.tunnels
            .get(name)
            .ok_or_else(|| anyhow::anyhow!("tunnel '{}' not found in config", name))
    }

    /// Write a default config file if none exists. Returns the path.
    pub fn init(path: Option<&Path>) -> Result<PathBuf> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => config_path()?,
        };
        if path.exists() {
            return Ok(path);
        }
        let default = Self::default();
        let content = toml::to_string_pretty(&default)
            .context("failed to serialize default config")?;
        fs::write(&path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shaft::{Error, OsSupervisor};

    fn load_str(content: &str) -> Result<Config> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, content).unwrap();
        Config::load(Some(&path))
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load(Some(&dir.path().join("nope.toml"))).unwrap();
        assert_eq!(cfg.health_timeout, 5);
        assert_eq!(cfg.stop_signal, Signal::Interrupt);
        assert!(cfg.tunnels.is_empty());
    }

    #[test]
    fn malformed_file_is_an_error() {
        assert!(load_str("health_timeout = \"soon\"").is_err());
    }

    #[test]
    fn single_bind_table() {
        let cfg = load_str(
            r#"
stop_signal = "TERM"

[tunnels.db]
host = { name = "some" }
bind = { client_port = 30, host_port = 50, hostname = "other" }
"#,
        )
        .unwrap();
        assert_eq!(cfg.stop_signal, Signal::Terminate);

        let tunnel = cfg.tunnel("db").unwrap().build(OsSupervisor::new()).unwrap();
        assert_eq!(tunnel.commands(), vec!["ssh -N -p some -L 30:other:50"]);
    }

    #[test]
    fn many_binds_keep_order() {
        let cfg = load_str(
            r#"
[tunnels.web]
host = { name = "bastion", port = 2222, user = "me" }
binds = [
  { client_port = 55, host_port = 81, hostname = "other_host1" },
  { client_port = 44, host_port = 91, hostname = "other_host2", reverse = true },
]
"#,
        )
        .unwrap();

        let tunnel = cfg.tunnel("web").unwrap().build(OsSupervisor::new()).unwrap();
        assert_eq!(
            tunnel.commands(),
            vec![
                "ssh -N -p 2222 me@bastion -L 55:other_host1:81",
                "ssh -N -p 2222 me@bastion -R 44:other_host2:91",
            ]
        );
    }

    #[test]
    fn missing_fields_fail_at_build() {
        let cfg = load_str(
            r#"
[tunnels.broken]
host = { port = 33 }
binds = { client_port = 30, host_port = 50, hostname = "other" }

[tunnels.half]
host = { name = "some" }
binds = { hostname = "foo1" }
"#,
        )
        .unwrap();

        for name in ["broken", "half"] {
            let err = cfg.tunnel(name).unwrap().build(OsSupervisor::new()).unwrap_err();
            assert!(matches!(err, Error::InvalidArgument(_)));
        }
    }

    #[test]
    fn unknown_tunnel_is_an_error() {
        let cfg = Config::default();
        assert!(cfg.tunnel("nope").is_err());
    }

    #[test]
    fn init_writes_loadable_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        assert_eq!(Config::init(Some(&path)).unwrap(), path);
        let cfg = Config::load(Some(&path)).unwrap();
        assert_eq!(cfg.max_log_size, 1_048_576);
        assert_eq!(cfg.poll_interval, 2);
    }
}
