/// Error types for Tab Eater
use thiserror::Error;

/// A rejection reported by the browser host.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HostError {
    #[error("tabs API failed: {0}")]
    Tabs(String),

    #[error("storage API failed: {0}")]
    Storage(String),

    #[error("context menu API failed: {0}")]
    Menus(String),

    #[error("action icon API failed: {0}")]
    Icon(String),
}

/// Errors surfaced by core operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Host(#[from] HostError),

    #[error("malformed stored record: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
