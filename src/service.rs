use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RemoteError;

/// A file uploaded to the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    /// Server-assigned resource name, e.g. `files/abc123`.
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub mime_type: Option<String>,
}

/// A server-side content cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedContent {
    /// Server-assigned resource name, e.g. `cachedContents/abc123`.
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub expire_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub input_token_limit: Option<u64>,
    #[serde(default)]
    pub output_token_limit: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub display_name: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCache {
    pub model: String,
    pub display_name: String,
    pub system_instruction: String,
    pub files: Vec<RemoteFile>,
    pub ttl: Duration,
}

/// How the system context reaches the model for one generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationConfig {
    /// The system instruction and any files travel with the request.
    Inline {
        system_instruction: String,
        files: Vec<RemoteFile>,
    },
    /// The request points at an existing content cache, which already holds the instruction and
    /// files. Nothing else may be sent alongside it.
    Cached { cache_name: String },
}

impl GenerationConfig {
    pub fn system_instruction(&self) -> Option<&str> {
        match self {
            GenerationConfig::Inline {
                system_instruction, ..
            } => Some(system_instruction),
            GenerationConfig::Cached { .. } => None,
        }
    }

    pub fn cache_name(&self) -> Option<&str> {
        match self {
            GenerationConfig::Inline { .. } => None,
            GenerationConfig::Cached { cache_name } => Some(cache_name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub config: GenerationConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerateResponse {
    /// Text of the first candidate, if the model produced any.
    pub text: Option<String>,
    /// The response exactly as the service returned it.
    pub raw: Value,
}

/// The remote operations a battler run depends on.
///
/// Implementations never retry; a failed request is returned to the caller as-is.
#[async_trait]
pub trait GenerativeService: Send + Sync {
    async fn list_files(&self) -> Result<Vec<RemoteFile>, RemoteError>;

    async fn upload_file(&self, upload: UploadFile) -> Result<RemoteFile, RemoteError>;

    async fn list_caches(&self) -> Result<Vec<CachedContent>, RemoteError>;

    async fn create_cache(&self, request: CreateCache) -> Result<CachedContent, RemoteError>;

    async fn get_model(&self, model: &str) -> Result<ModelInfo, RemoteError>;

    async fn generate_content(
        &self,
        request: GenerateRequest,
    ) -> Result<GenerateResponse, RemoteError>;
}
