use thiserror::Error;

pub use crate::fsm::FsmError;
pub use crate::protocol::ProtocolError;

#[derive(Debug, Error, Clone)]
pub enum CartError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("state machine: {0}")]
    Fsm(#[from] FsmError),
    #[error("protocol: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("io error: {0}")]
    Io(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing display")]
    MissingDisplay,
    #[error("missing motor")]
    MissingMotor,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
