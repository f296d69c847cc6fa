use thiserror::Error;

use crate::supervisor::Pid;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("tunnel is already active")]
    AlreadyActive,

    #[error("tunnel is already inactive")]
    AlreadyInactive,

    #[error("tunnel has {0} bindings, expected exactly one")]
    MultipleBindings(usize),

    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no such process: {0}")]
    NoSuchProcess(Pid),

    #[error("failed to signal process {pid}: {source}")]
    Signal {
        pid: Pid,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
