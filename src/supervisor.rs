use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// OS process identifier.
pub type Pid = u32;

/// Signals a tunnel may send to stop its forwarding processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Signal {
    #[default]
    #[serde(rename = "INT")]
    Interrupt,
    #[serde(rename = "TERM")]
    Terminate,
}

impl Signal {
    fn as_raw(self) -> libc::c_int {
        match self {
            Signal::Interrupt => libc::SIGINT,
            Signal::Terminate => libc::SIGTERM,
        }
    }
}

/// Spawns, signals and probes the processes behind a tunnel.
pub trait Supervisor {
    /// Start `command` as a detached process and return its PID.
    fn spawn(&mut self, command: &str) -> Result<Pid>;

    /// Deliver `signal` to `pid`. Fails with `NoSuchProcess` if it is gone.
    fn signal(&mut self, pid: Pid, signal: Signal) -> Result<()>;

    /// Zero-signal liveness probe.
    fn is_alive(&self, pid: Pid) -> bool;
}

/// Runs commands as real OS processes.
///
/// Each child is reaped by a background thread, so once it exits its PID
/// leaves the process table and `is_alive` reports false.
#[derive(Debug, Default)]
pub struct OsSupervisor {
    log_file: Option<PathBuf>,
    max_log_bytes: u64,
}

impl OsSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append child stderr to `path`, rotating it once it grows past `max_bytes`.
    pub fn with_log_file(mut self, path: impl Into<PathBuf>, max_bytes: u64) -> Self {
        self.log_file = Some(path.into());
        self.max_log_bytes = max_bytes;
        self
    }

    fn stderr(&self) -> io::Result<Stdio> {
        let Some(ref path) = self.log_file else {
            return Ok(Stdio::null());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        rotate_log(path, self.max_log_bytes);
        let log = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Stdio::from(log))
    }
}

impl Supervisor for OsSupervisor {
    fn spawn(&mut self, command: &str) -> Result<Pid> {
        let spawn_error = |source: io::Error| Error::Spawn {
            command: command.to_string(),
            source,
        };

        let mut words = command.split_whitespace();
        let program = words
            .next()
            .ok_or_else(|| spawn_error(io::Error::new(io::ErrorKind::InvalidInput, "empty command")))?;
        let stderr = self.stderr().map_err(spawn_error)?;

        let mut child = Command::new(program)
            .args(words)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(stderr)
            .spawn()
            .map_err(spawn_error)?;
        let pid = child.id();

        thread::Builder::new()
            .name(format!("reap-{}", pid))
            .spawn(move || {
                let status = child.wait();
                debug!(pid, ?status, "child exited");
            })
            .map_err(spawn_error)?;

        Ok(pid)
    }

    fn signal(&mut self, pid: Pid, signal: Signal) -> Result<()> {
        let raw = raw_pid(pid).ok_or(Error::NoSuchProcess(pid))?;
        let ret = unsafe { libc::kill(raw, signal.as_raw()) };
        if ret == 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::ESRCH) {
            Err(Error::NoSuchProcess(pid))
        } else {
            Err(Error::Signal { pid, source: err })
        }
    }

    fn is_alive(&self, pid: Pid) -> bool {
        let Some(raw) = raw_pid(pid) else {
            return false;
        };
        // EPERM means the process exists but belongs to someone else.
        (unsafe { libc::kill(raw, 0) == 0 })
            || io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
    }
}

/// PIDs <= 0 address process groups in kill(2), never a single process.
fn raw_pid(pid: Pid) -> Option<libc::pid_t> {
    libc::pid_t::try_from(pid).ok().filter(|&p| p > 0)
}

/// If a log file exceeds max_bytes, rename it to .old (replacing any
/// previous .old file) so the new run starts with a fresh log.
fn rotate_log(path: &Path, max_bytes: u64) {
    if let Ok(meta) = fs::metadata(path) {
        if meta.len() > max_bytes {
            let mut old = path.as_os_str().to_owned();
            old.push(".old");
            let _ = fs::rename(path, old);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn wait_dead(sup: &OsSupervisor, pid: Pid) -> bool {
        let start = Instant::now();
        while start.elapsed() < Duration::from_secs(5) {
            if !sup.is_alive(pid) {
                return true;
            }
            thread::sleep(Duration::from_millis(20));
        }
        false
    }

    #[test]
    fn spawn_signal_and_probe() {
        let mut sup = OsSupervisor::new();
        let pid = sup.spawn("sleep 30").unwrap();
        assert!(sup.is_alive(pid));

        sup.signal(pid, Signal::Interrupt).unwrap();
        assert!(wait_dead(&sup, pid));
    }

    #[test]
    fn signal_exited_process_is_no_such_process() {
        let mut sup = OsSupervisor::new();
        let pid = sup.spawn("true").unwrap();
        assert!(wait_dead(&sup, pid));

        assert!(matches!(
            sup.signal(pid, Signal::Terminate),
            Err(Error::NoSuchProcess(p)) if p == pid
        ));
    }

    #[test]
    fn spawn_missing_binary_fails() {
        let mut sup = OsSupervisor::new();
        let err = sup.spawn("shaft-no-such-binary -N").unwrap_err();
        assert!(matches!(err, Error::Spawn { ref command, .. } if command == "shaft-no-such-binary -N"));
    }

    #[test]
    fn spawn_empty_command_fails() {
        let mut sup = OsSupervisor::new();
        assert!(matches!(sup.spawn("   "), Err(Error::Spawn { .. })));
    }

    #[test]
    fn process_group_pids_are_never_signalled() {
        let mut sup = OsSupervisor::new();
        assert!(!sup.is_alive(0));
        assert!(matches!(
            sup.signal(0, Signal::Interrupt),
            Err(Error::NoSuchProcess(0))
        ));
    }

    #[test]
    fn stderr_goes_to_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("logs").join("tunnel.log");
        let mut sup = OsSupervisor::new().with_log_file(&log, 1_048_576);

        let pid = sup.spawn("ls /shaft-no-such-directory").unwrap();
        assert!(wait_dead(&sup, pid));

        let content = fs::read_to_string(&log).unwrap();
        assert!(!content.is_empty());
    }

    #[test]
    fn rotate_log_moves_oversized_file() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("tunnel.log");
        fs::write(&log, "0123456789").unwrap();

        rotate_log(&log, 100);
        assert!(log.exists());

        rotate_log(&log, 5);
        assert!(!log.exists());
        assert_eq!(
            fs::read_to_string(dir.path().join("tunnel.log.old")).unwrap(),
            "0123456789"
        );
    }
}
