use std::fmt;

use tracing::{debug, warn};

use crate::binding::Binding;
use crate::error::{Error, Result};
use crate::host::Host;
use crate::supervisor::{Pid, Signal, Supervisor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Inactive,
    Active,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Inactive => f.write_str("inactive"),
            Status::Active => f.write_str("active"),
        }
    }
}

/// One SSH process per binding, started and stopped as a unit.
///
/// `pids[i]` belongs to `bindings[i]` while the tunnel is active. The
/// processes themselves live in the OS process table, so `is_active`
/// re-checks them instead of trusting `status` alone.
#[derive(Debug)]
pub struct Tunnel<S> {
    host: Host,
    bindings: Vec<Binding>,
    status: Status,
    pids: Vec<Pid>,
    stop_signal: Signal,
    supervisor: S,
}

/// The exact command line handed to the supervisor for one binding.
fn command_line(host: &Host, binding: &Binding) -> String {
    format!("ssh -N -p {} {}", host, binding)
}

impl<S: Supervisor> Tunnel<S> {
    /// Accepts anything that yields bindings or optional bindings; `None`
    /// entries are dropped. At least one binding must remain.
    pub fn new<I, B>(host: Host, bindings: I, supervisor: S) -> Result<Self>
    where
        I: IntoIterator<Item = B>,
        B: Into<Option<Binding>>,
    {
        let bindings: Vec<Binding> = bindings.into_iter().filter_map(Into::into).collect();
        if bindings.is_empty() {
            return Err(Error::InvalidArgument(
                "a tunnel needs at least one binding".to_string(),
            ));
        }
        Ok(Self {
            host,
            bindings,
            status: Status::Inactive,
            pids: Vec::new(),
            stop_signal: Signal::default(),
            supervisor,
        })
    }

    pub fn with_stop_signal(mut self, signal: Signal) -> Self {
        self.stop_signal = signal;
        self
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    /// The sole binding of a single-forward tunnel.
    pub fn bind(&self) -> Result<&Binding> {
        match self.bindings.as_slice() {
            [only] => Ok(only),
            all => Err(Error::MultipleBindings(all.len())),
        }
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Last confirmed state. See `is_active` for a live check.
    pub fn status(&self) -> Status {
        self.status
    }

    pub fn pids(&self) -> &[Pid] {
        &self.pids
    }

    pub fn supervisor(&self) -> &S {
        &self.supervisor
    }

    pub fn command(&self, binding: &Binding) -> String {
        command_line(&self.host, binding)
    }

    pub fn commands(&self) -> Vec<String> {
        self.bindings.iter().map(|b| self.command(b)).collect()
    }

    /// Spawn one process per binding, in order.
    ///
    /// If a spawn fails, the processes already started by this call are
    /// sent the stop signal and the tunnel stays inactive with no PIDs.
    pub fn start(&mut self) -> Result<()> {
        if self.status == Status::Active {
            return Err(Error::AlreadyActive);
        }

        let mut spawned = Vec::with_capacity(self.bindings.len());
        for binding in &self.bindings {
            let command = command_line(&self.host, binding);
            match self.supervisor.spawn(&command) {
                Ok(pid) => {
                    debug!(pid, %command, "spawned forward");
                    spawned.push(pid);
                }
                Err(err) => {
                    for &pid in &spawned {
                        if let Err(e) = self.supervisor.signal(pid, self.stop_signal) {
                            warn!(pid, error = %e, "failed to clean up after partial start");
                        }
                    }
                    return Err(err);
                }
            }
        }

        self.pids = spawned;
        self.status = Status::Active;
        Ok(())
    }

    /// Signal every recorded PID in order. Any failure leaves the tunnel active.
    pub fn stop(&mut self) -> Result<()> {
        if self.status == Status::Inactive {
            return Err(Error::AlreadyInactive);
        }

        for &pid in &self.pids {
            self.supervisor.signal(pid, self.stop_signal)?;
            debug!(pid, signal = ?self.stop_signal, "signalled forward");
        }

        self.pids.clear();
        self.status = Status::Inactive;
        Ok(())
    }

    /// Like `stop`, but processes that already exited count as stopped.
    pub fn shutdown(&mut self) -> Result<()> {
        if self.status == Status::Inactive {
            return Err(Error::AlreadyInactive);
        }

        for &pid in &self.pids {
            match self.supervisor.signal(pid, self.stop_signal) {
                Ok(()) => debug!(pid, signal = ?self.stop_signal, "signalled forward"),
                Err(Error::NoSuchProcess(_)) => debug!(pid, "forward already gone"),
                Err(e) => return Err(e),
            }
        }

        self.pids.clear();
        self.status = Status::Inactive;
        Ok(())
    }

    /// `stop` (an inactive tunnel is fine) followed by `start`.
    pub fn restart(&mut self) -> Result<()> {
        match self.stop() {
            Ok(()) | Err(Error::AlreadyInactive) => {}
            Err(e) => return Err(e),
        }
        self.start()
    }

    /// True only while every recorded process is still alive.
    pub fn is_active(&self) -> bool {
        self.status == Status::Active
            && self.pids.iter().all(|&pid| self.supervisor.is_alive(pid))
    }

    /// Each recorded PID with its binding and whether it is alive.
    pub fn liveness(&self) -> Vec<(&Binding, Pid, bool)> {
        self.bindings
            .iter()
            .zip(&self.pids)
            .map(|(b, &pid)| (b, pid, self.supervisor.is_alive(pid)))
            .collect()
    }
}
