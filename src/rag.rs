//! Knowledge-base tag catalog client.
//!
//! The generation service exposes the uploaded knowledge-base tags at
//! `GET /api/v1/rag/query_rag_tag_list`; a tag passed in `StreamOptions`
//! routes a stream through the retrieval-augmented endpoint variant.

use serde::Deserialize;
use thiserror::Error;

/// Service-level success code.
const SUCCESS_CODE: &str = "0000";

#[derive(Debug, Error)]
pub enum RagError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Service returned code {0}")]
    Service(String),
}

/// Standard response envelope of the service.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub code: String,
    #[serde(default)]
    pub info: Option<String>,
    #[serde(default)]
    pub data: Option<T>,
}

/// Fetch the selectable knowledge-base tags.
pub async fn fetch_rag_tags(
    client: &reqwest::Client,
    base_url: &str,
) -> Result<Vec<String>, RagError> {
    let url = format!("{base_url}/api/v1/rag/query_rag_tag_list");
    let response = client.get(&url).send().await?.error_for_status()?;
    let body: ApiResponse<Vec<String>> = response.json().await?;

    if body.code != SUCCESS_CODE {
        return Err(RagError::Service(body.code));
    }
    Ok(body.data.unwrap_or_default())
}
