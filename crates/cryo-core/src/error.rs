use thiserror::Error;

pub type Result<T> = std::result::Result<T, CryoError>;

#[derive(Debug, Error)]
pub enum CryoError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("no matching archive version for '{0}'")]
    ArchiveNotFound(String),

    #[error("retrieval of archive '{archive_id}' is not ready yet (status: {status_code})")]
    RetrievalNotReady {
        archive_id: String,
        status_code: String,
    },

    #[error("refusing to overwrite existing path '{0}'")]
    WouldOverwrite(String),

    #[error("malformed encrypted container: {0}")]
    MalformedContainer(String),

    #[error("vault request failed: {0}")]
    Vault(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] rmp_serde::encode::Error),

    #[error("deserialization error: {0}")]
    Deserialization(#[from] rmp_serde::decode::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
