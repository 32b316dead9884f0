use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Kv(#[from] crate::session::KvError),

    #[error("Store error: {0}")]
    Store(#[from] crate::session::StoreError),

    #[error("Catalog error: {0}")]
    Rag(#[from] crate::rag::RagError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
