pub mod binding;
pub mod error;
pub mod health;
pub mod host;
pub mod supervisor;
pub mod tunnel;

pub use binding::{Binding, BindingSpec};
pub use error::{Error, Result};
pub use host::{Host, HostSpec};
pub use supervisor::{OsSupervisor, Pid, Signal, Supervisor};
pub use tunnel::{Status, Tunnel};
