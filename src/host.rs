use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The remote SSH endpoint a tunnel connects through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
    name: String,
    port: Option<u16>,
    user: Option<String>,
}

impl Host {
    /// An empty `user` is treated the same as no user.
    pub fn new(name: impl Into<String>, port: Option<u16>, user: Option<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::InvalidArgument("host name is required".to_string()));
        }
        Ok(Self {
            name,
            port,
            user: user.filter(|u| !u.is_empty()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }
}

/// Renders as `[<port> ][<user>@]<name>`.
impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(port) = self.port {
            write!(f, "{} ", port)?;
        }
        if let Some(ref user) = self.user {
            write!(f, "{}@", user)?;
        }
        f.write_str(&self.name)
    }
}

/// Loosely-typed host description as found in config files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostSpec {
    pub name: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
}

impl TryFrom<HostSpec> for Host {
    type Error = Error;

    fn try_from(spec: HostSpec) -> Result<Self> {
        let name = spec
            .name
            .ok_or_else(|| Error::InvalidArgument("host name is required".to_string()))?;
        Host::new(name, spec.port, spec.user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_name_only() {
        let host = Host::new("name1", None, None).unwrap();
        assert_eq!(host.to_string(), "name1");
    }

    #[test]
    fn render_with_user() {
        let host = Host::new("name1", None, Some("yuzer".to_string())).unwrap();
        assert_eq!(host.to_string(), "yuzer@name1");
    }

    #[test]
    fn render_with_port() {
        let host = Host::new("name1", Some(33), None).unwrap();
        assert_eq!(host.to_string(), "33 name1");
    }

    #[test]
    fn render_with_port_and_user() {
        let host = Host::new("name1", Some(33), Some("yuzer".to_string())).unwrap();
        assert_eq!(host.to_string(), "33 yuzer@name1");
    }

    #[test]
    fn empty_user_is_ignored() {
        let host = Host::new("name1", None, Some(String::new())).unwrap();
        assert_eq!(host.user(), None);
        assert_eq!(host.to_string(), "name1");
    }

    #[test]
    fn empty_name_is_rejected() {
        assert!(matches!(
            Host::new("", Some(33), None),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn spec_without_name_is_rejected() {
        let spec = HostSpec {
            name: None,
            port: Some(33),
            user: None,
        };
        assert!(matches!(Host::try_from(spec), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn spec_keeps_all_fields() {
        let spec = HostSpec {
            name: Some("hostname".to_string()),
            port: Some(23),
            user: Some("yuzer".to_string()),
        };
        let host = Host::try_from(spec).unwrap();
        assert_eq!(host.name(), "hostname");
        assert_eq!(host.port(), Some(23));
        assert_eq!(host.user(), Some("yuzer"));
    }
}
