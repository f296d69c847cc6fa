use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A single port forward: `client_port -> hostname:host_port`, or the
/// reverse direction when `reverse` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    client_port: u16,
    host_port: u16,
    hostname: String,
    reverse: bool,
}

impl Binding {
    pub fn new(client_port: u16, host_port: u16, hostname: impl Into<String>) -> Result<Self> {
        let hostname = hostname.into();
        if hostname.is_empty() {
            return Err(Error::InvalidArgument("binding hostname is required".to_string()));
        }
        Ok(Self {
            client_port,
            host_port,
            hostname,
            reverse: false,
        })
    }

    /// Turn this into a remote (`-R`) forward.
    pub fn reversed(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    pub fn client_port(&self) -> u16 {
        self.client_port
    }

    pub fn host_port(&self) -> u16 {
        self.host_port
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn is_reverse(&self) -> bool {
        self.reverse
    }

    /// The port this binding listens on locally, if any. Reverse forwards
    /// listen on the remote side and can't be probed from here.
    pub fn local_port(&self) -> Option<u16> {
        if self.reverse {
            None
        } else {
            Some(self.client_port)
        }
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = if self.reverse { "-R" } else { "-L" };
        write!(
            f,
            "{} {}:{}:{}",
            flag, self.client_port, self.hostname, self.host_port
        )
    }
}

/// Loosely-typed binding description as found in config files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BindingSpec {
    pub client_port: Option<u16>,
    pub host_port: Option<u16>,
    pub hostname: Option<String>,
    #[serde(default)]
    pub reverse: bool,
}

impl TryFrom<BindingSpec> for Binding {
    type Error = Error;

    fn try_from(spec: BindingSpec) -> Result<Self> {
        let missing = |field: &str| Error::InvalidArgument(format!("binding {} is required", field));
        let client_port = spec.client_port.ok_or_else(|| missing("client_port"))?;
        let host_port = spec.host_port.ok_or_else(|| missing("host_port"))?;
        let hostname = spec.hostname.ok_or_else(|| missing("hostname"))?;
        Ok(Binding::new(client_port, host_port, hostname)?.reversed(spec.reverse))
    }
}
