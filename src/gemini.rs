//! Generative Language API client.
//!
//! Implements [`GenerativeService`] over the Gemini REST API (`v1beta`) with an API key. Listing
//! follows every page; nothing is retried.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::RemoteError;
use crate::service::{
    CachedContent, CreateCache, GenerateRequest, GenerateResponse, GenerationConfig,
    GenerativeService, ModelInfo, RemoteFile, UploadFile,
};
use crate::settings::Settings;

const API_VERSION: &str = "v1beta";
const PAGE_SIZE: &str = "100";
const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
enum Part {
    Text(String),
    FileData(FileData),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileData {
    mime_type: String,
    file_uri: String,
}

impl Content {
    fn system(text: &str) -> Self {
        Self {
            role: None,
            parts: vec![Part::Text(text.to_string())],
        }
    }

    fn user(parts: Vec<Part>) -> Self {
        Self {
            role: Some("user"),
            parts,
        }
    }
}

impl From<&RemoteFile> for Part {
    fn from(file: &RemoteFile) -> Self {
        Part::FileData(FileData {
            mime_type: file
                .mime_type
                .clone()
                .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string()),
            file_uri: file.uri.clone(),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateCachedContentRequest {
    model: String,
    display_name: String,
    system_instruction: Content,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    contents: Vec<Content>,
    ttl: String, // e.g., "300s"
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cached_content: Option<String>,
}

// One page of a list endpoint.
trait Page: DeserializeOwned {
    type Item;

    // Items of this page, and the token of the next one if there is one.
    fn into_parts(self) -> (Vec<Self::Item>, Option<String>);
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListFilesResponse {
    #[serde(default)]
    files: Vec<RemoteFile>,
    next_page_token: Option<String>,
}

impl Page for ListFilesResponse {
    type Item = RemoteFile;

    fn into_parts(self) -> (Vec<RemoteFile>, Option<String>) {
        (self.files, next_token(self.next_page_token))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListCachedContentsResponse {
    #[serde(default)]
    cached_contents: Vec<CachedContent>,
    next_page_token: Option<String>,
}

impl Page for ListCachedContentsResponse {
    type Item = CachedContent;

    fn into_parts(self) -> (Vec<CachedContent>, Option<String>) {
        (self.cached_contents, next_token(self.next_page_token))
    }
}

// The API ends a listing with either no token or an empty one.
fn next_token(token: Option<String>) -> Option<String> {
    token.filter(|token| !token.is_empty())
}

fn page_query(page_token: Option<&str>) -> Vec<(&'static str, &str)> {
    let mut query = vec![("pageSize", PAGE_SIZE)];
    if let Some(token) = page_token {
        query.push(("pageToken", token));
    }
    query
}

#[derive(Debug, Deserialize)]
struct UploadFileResponse {
    file: RemoteFile,
}

fn create_cache_body(request: &CreateCache) -> CreateCachedContentRequest {
    let contents = if request.files.is_empty() {
        Vec::new()
    } else {
        vec![Content::user(request.files.iter().map(Part::from).collect())]
    };
    CreateCachedContentRequest {
        model: request.model.clone(),
        display_name: request.display_name.clone(),
        system_instruction: Content::system(&request.system_instruction),
        contents,
        ttl: format!("{}s", request.ttl.as_secs()),
    }
}

fn generate_body(request: &GenerateRequest) -> GenerateContentRequest {
    let prompt = Part::Text(request.prompt.clone());
    match &request.config {
        GenerationConfig::Inline {
            system_instruction,
            files,
        } => {
            let mut parts: Vec<Part> = files.iter().map(Part::from).collect();
            parts.push(prompt);
            GenerateContentRequest {
                contents: vec![Content::user(parts)],
                system_instruction: Some(Content::system(system_instruction)),
                cached_content: None,
            }
        }
        GenerationConfig::Cached { cache_name } => GenerateContentRequest {
            contents: vec![Content::user(vec![prompt])],
            system_instruction: None,
            cached_content: Some(cache_name.clone()),
        },
    }
}

/// Concatenated text parts of the first candidate.
fn response_text(response: &Value) -> Option<String> {
    let parts = response["candidates"]
        .as_array()?
        .first()?
        .get("content")?
        .get("parts")?
        .as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();
    if text.is_empty() { None } else { Some(text) }
}

fn model_path(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}

async fn check(response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(RemoteError::Api {
        status: status.as_u16(),
        message,
    })
}

/// Gemini client authenticated with an API key.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    api_key: String,
    base_url: String,
    client: Client,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into().trim().to_string(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    /// Builds a client from the API key in the environment variable named by `settings`.
    pub fn from_env(settings: &Settings) -> Result<Self, RemoteError> {
        let api_key = std::env::var(&settings.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| RemoteError::MissingCredential(settings.api_key_env.clone()))?;
        Ok(Self::new(api_key, settings.base_url.clone()))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{API_VERSION}/{path}", self.base_url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, RemoteError> {
        log::debug!("GET {path}");
        let response = self
            .client
            .get(self.url(path))
            .header("x-goog-api-key", &self.api_key)
            .query(query)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, RemoteError> {
        log::debug!("POST {path}");
        let response = self
            .client
            .post(self.url(path))
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    /// Follows every page of a list endpoint.
    async fn list_all<P: Page>(&self, path: &str) -> Result<Vec<P::Item>, RemoteError> {
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let page: P = self
                .get_json(path, &page_query(page_token.as_deref()))
                .await?;
            let (page_items, next) = page.into_parts();
            items.extend(page_items);
            match next {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        Ok(items)
    }
}

#[async_trait]
impl GenerativeService for GeminiClient {
    async fn list_files(&self) -> Result<Vec<RemoteFile>, RemoteError> {
        self.list_all::<ListFilesResponse>("files").await
    }

    async fn upload_file(&self, upload: UploadFile) -> Result<RemoteFile, RemoteError> {
        let mime_type = upload
            .mime_type
            .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());
        log::debug!(
            "Starting upload of {} ({} bytes, {mime_type})",
            upload.display_name,
            upload.bytes.len()
        );

        let start = self
            .client
            .post(format!("{}/upload/{API_VERSION}/files", self.base_url))
            .header("x-goog-api-key", &self.api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header(
                "X-Goog-Upload-Header-Content-Length",
                upload.bytes.len().to_string(),
            )
            .header("X-Goog-Upload-Header-Content-Type", mime_type.as_str())
            .json(&json!({ "file": { "displayName": upload.display_name } }))
            .send()
            .await?;
        let start = check(start).await?;
        let upload_url = start
            .headers()
            .get("x-goog-upload-url")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| RemoteError::InvalidResponse("Missing upload URL".to_string()))?
            .to_string();

        let response = self
            .client
            .post(upload_url)
            .header("x-goog-api-key", &self.api_key)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(upload.bytes)
            .send()
            .await?;
        let uploaded: UploadFileResponse = check(response).await?.json().await?;
        Ok(uploaded.file)
    }

    async fn list_caches(&self) -> Result<Vec<CachedContent>, RemoteError> {
        self.list_all::<ListCachedContentsResponse>("cachedContents")
            .await
    }

    async fn create_cache(&self, request: CreateCache) -> Result<CachedContent, RemoteError> {
        self.post_json("cachedContents", &create_cache_body(&request))
            .await
    }

    async fn get_model(&self, model: &str) -> Result<ModelInfo, RemoteError> {
        self.get_json(&model_path(model), &[]).await
    }

    async fn generate_content(
        &self,
        request: GenerateRequest,
    ) -> Result<GenerateResponse, RemoteError> {
        let path = format!("{}:generateContent", model_path(&request.model));
        let raw: Value = self.post_json(&path, &generate_body(&request)).await?;
        Ok(GenerateResponse {
            text: response_text(&raw),
            raw,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn file(name: &str) -> RemoteFile {
        RemoteFile {
            name: format!("files/{name}"),
            display_name: Some(name.to_string()),
            uri: format!("https://example.test/files/{name}"),
            mime_type: Some("application/json".to_string()),
        }
    }

    #[test]
    fn cached_generation_carries_only_the_cache_reference() {
        let body = serde_json::to_value(generate_body(&GenerateRequest {
            model: "models/gemini-2.5-flash".to_string(),
            prompt: "choose".to_string(),
            config: GenerationConfig::Cached {
                cache_name: "cachedContents/abc".to_string(),
            },
        }))
        .unwrap();

        assert_eq!(body["cachedContent"], "cachedContents/abc");
        assert!(body.get("systemInstruction").is_none());
        assert_eq!(
            body["contents"],
            json!([{ "role": "user", "parts": [{ "text": "choose" }] }])
        );
    }

    #[test]
    fn inline_generation_carries_instruction_and_files() {
        let body = serde_json::to_value(generate_body(&GenerateRequest {
            model: "models/gemini-2.5-flash".to_string(),
            prompt: "choose".to_string(),
            config: GenerationConfig::Inline {
                system_instruction: "context".to_string(),
                files: vec![file("moves")],
            },
        }))
        .unwrap();

        assert!(body.get("cachedContent").is_none());
        assert_eq!(
            body["systemInstruction"],
            json!({ "parts": [{ "text": "context" }] })
        );
        assert_eq!(
            body["contents"][0]["parts"],
            json!([
                {
                    "fileData": {
                        "mimeType": "application/json",
                        "fileUri": "https://example.test/files/moves",
                    }
                },
                { "text": "choose" },
            ])
        );
    }

    #[test]
    fn cache_body_attaches_files_and_ttl() {
        let request = CreateCache {
            model: "models/gemini-2.5-flash".to_string(),
            display_name: "battler".to_string(),
            system_instruction: "context".to_string(),
            files: vec![file("moves"), file("items")],
            ttl: Duration::from_secs(300),
        };
        let body = serde_json::to_value(create_cache_body(&request)).unwrap();
        assert_eq!(body["displayName"], "battler");
        assert_eq!(body["ttl"], "300s");
        assert_eq!(body["contents"][0]["parts"].as_array().unwrap().len(), 2);

        let body = serde_json::to_value(create_cache_body(&CreateCache {
            files: Vec::new(),
            ..request
        }))
        .unwrap();
        assert!(body.get("contents").is_none());
    }

    #[test]
    fn response_text_joins_first_candidate_parts() {
        let response = json!({
            "candidates": [
                { "content": { "parts": [{ "text": "move " }, { "text": "0" }] } },
                { "content": { "parts": [{ "text": "switch 1" }] } },
            ]
        });
        assert_eq!(response_text(&response).as_deref(), Some("move 0"));
        assert_eq!(response_text(&json!({ "candidates": [] })), None);
        assert_eq!(
            response_text(&json!({ "candidates": [{ "content": { "parts": [] } }] })),
            None
        );
    }

    #[test]
    fn model_names_gain_the_models_prefix() {
        assert_eq!(model_path("gemini-2.5-flash"), "models/gemini-2.5-flash");
        assert_eq!(
            model_path("models/gemini-2.5-flash"),
            "models/gemini-2.5-flash"
        );
    }

    #[test]
    fn pages_end_on_a_missing_or_empty_token() {
        let page: ListFilesResponse = serde_json::from_value(json!({
            "files": [{ "name": "files/1", "displayName": "data_moves_json", "uri": "u" }],
            "nextPageToken": "next",
        }))
        .unwrap();
        let (files, next) = page.into_parts();
        assert_eq!(files.len(), 1);
        assert_eq!(next.as_deref(), Some("next"));

        let page: ListCachedContentsResponse =
            serde_json::from_value(json!({ "nextPageToken": "" })).unwrap();
        let (caches, next) = page.into_parts();
        assert!(caches.is_empty());
        assert_eq!(next, None);

        let page: ListFilesResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(page.into_parts().1, None);
    }

    #[test]
    fn page_query_carries_the_token_only_when_present() {
        assert_eq!(page_query(None), vec![("pageSize", PAGE_SIZE)]);
        assert_eq!(
            page_query(Some("abc")),
            vec![("pageSize", PAGE_SIZE), ("pageToken", "abc")]
        );
    }

    #[test]
    fn missing_credential_is_reported() {
        let settings = Settings {
            api_key_env: "BATTLER_AI_GEMINI_TEST_UNSET_KEY".to_string(),
            ..Settings::default()
        };
        assert!(matches!(
            GeminiClient::from_env(&settings),
            Err(RemoteError::MissingCredential(_))
        ));
    }
}
