#![doc = "Box integration for the CLI: implements the core `ObjectStore` contract against the Box REST API."]
//
//! # Box client (CLI <-> Core)
//!
//! This module wires [`box_archiver_core::contract::ObjectStore`] to Box. It
//! provides [`BoxClient`], which the CLI hands to the core pipeline.
//!
//! - Construct with [`BoxClient::connect`] from a loaded [`RemoteConfig`]; it performs the
//!   token exchange when client credentials are configured.
//! - Direct transfers are single multipart requests; chunked transfers run a Box upload
//!   session (create, upload parts in order, commit with the whole-file SHA-1).
//! - Every non-2xx response becomes [`RemoteApiError`] with Box's `code`, `message` and
//!   `context_info` when the body carries them. Nothing is retried.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{CONTENT_RANGE, CONTENT_TYPE, RETRY_AFTER};
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha1::{Digest, Sha1};
use tokio::io::AsyncReadExt;

use box_archiver_core::contract::{ItemKind, ObjectStore, RemoteItem, UploadedObject};
use box_archiver_core::{Error, RemoteApiError, Result};

pub const DEFAULT_API_BASE: &str = "https://api.box.com/2.0";
pub const DEFAULT_UPLOAD_BASE: &str = "https://upload.box.com/api/2.0";
pub const DEFAULT_TOKEN_URL: &str = "https://api.box.com/oauth2/token";

const LIST_PAGE_LIMIT: u64 = 1000;
const MAX_COMMIT_ATTEMPTS: u32 = 10;

/// Where the Box API lives and how to authenticate against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub api_base: String,
    pub upload_base: String,
    pub token_url: String,
    pub credentials: Credentials,
}

#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// A ready bearer token (Box developer token).
    AccessToken(String),
    /// Client-credentials grant, exchanged for a token at connect time.
    ClientCredentials {
        client_id: String,
        client_secret: String,
        subject: Subject,
    },
}

// Secrets never reach the logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::AccessToken(token) => f
                .debug_struct("AccessToken")
                .field("token_len", &token.len())
                .finish(),
            Credentials::ClientCredentials {
                client_id, subject, ..
            } => f
                .debug_struct("ClientCredentials")
                .field("client_id", client_id)
                .field("client_secret", &"<redacted>")
                .field("subject", subject)
                .finish(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    Enterprise(String),
    User(String),
}

impl Subject {
    fn form_fields(&self) -> (&'static str, &str) {
        match self {
            Subject::Enterprise(id) => ("enterprise", id),
            Subject::User(id) => ("user", id),
        }
    }
}

pub struct BoxClient {
    http: reqwest::Client,
    api_base: String,
    upload_base: String,
    access_token: String,
}

impl BoxClient {
    pub fn new(
        api_base: impl Into<String>,
        upload_base: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        BoxClient {
            http: reqwest::Client::new(),
            api_base: trim_base(api_base.into()),
            upload_base: trim_base(upload_base.into()),
            access_token: access_token.into(),
        }
    }

    /// Builds an authenticated client, exchanging client credentials for a
    /// token first when needed.
    pub async fn connect(remote: &RemoteConfig) -> Result<Self> {
        let access_token = match &remote.credentials {
            Credentials::AccessToken(token) => {
                tracing::info!(token_set = !token.is_empty(), "Using configured Box access token");
                token.clone()
            }
            Credentials::ClientCredentials {
                client_id,
                client_secret,
                subject,
            } => request_token(&remote.token_url, client_id, client_secret, subject).await?,
        };
        tracing::info!(
            api_base = %remote.api_base,
            upload_base = %remote.upload_base,
            "Initialized BoxClient"
        );
        Ok(BoxClient::new(
            remote.api_base.clone(),
            remote.upload_base.clone(),
            access_token,
        ))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| RemoteApiError::transport(format!("request failed: {e}")))?;
        check(response).await
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.send(request).await?;
        read_json(response).await
    }

    async fn upload_multipart(&self, url: String, form: Form) -> Result<UploadedObject> {
        let files: FileCollection = self.send_json(self.http.post(url).multipart(form)).await?;
        first_file(files)
    }

    /// Runs one upload session to completion: open it at `session_url`, send
    /// every part in order, then commit.
    async fn run_session(
        &self,
        session_url: String,
        session_body: serde_json::Value,
        local_path: &Path,
        file_size: u64,
    ) -> Result<UploadedObject> {
        let session: UploadSession = self
            .send_json(self.http.post(session_url).json(&session_body))
            .await?;
        tracing::info!(
            session_id = %session.id,
            part_size = session.part_size,
            total_parts = session.total_parts,
            "Opened Box upload session"
        );
        if session.part_size == 0 {
            return Err(RemoteApiError::transport("upload session returned a zero part size").into());
        }

        let part_url = format!("{}/files/upload_sessions/{}", self.upload_base, session.id);
        let mut file = tokio::fs::File::open(local_path)
            .await
            .map_err(|e| Error::io("failed to open", local_path, e))?;
        let mut whole_file = Sha1::new();
        let mut parts = Vec::new();
        let mut offset = 0u64;

        while offset < file_size {
            let len = session.part_size.min(file_size - offset);
            let mut chunk = vec![0u8; len as usize];
            file.read_exact(&mut chunk)
                .await
                .map_err(|e| Error::io("failed to read", local_path, e))?;
            whole_file.update(&chunk);

            let range = format!("bytes {}-{}/{}", offset, offset + len - 1, file_size);
            let uploaded: UploadedPart = self
                .send_json(
                    self.http
                        .put(&part_url)
                        .header(CONTENT_TYPE, "application/octet-stream")
                        .header(CONTENT_RANGE, range.as_str())
                        .header("Digest", sha_digest(&Sha1::digest(&chunk)))
                        .body(chunk),
                )
                .await?;
            tracing::debug!(part_id = %uploaded.part.part_id, %range, "Uploaded part");
            parts.push(uploaded.part);
            offset += len;
        }

        let digest = sha_digest(&whole_file.finalize());
        self.commit(&session.id, &digest, &parts).await
    }

    async fn commit(
        &self,
        session_id: &str,
        digest: &str,
        parts: &[SessionPart],
    ) -> Result<UploadedObject> {
        let url = format!("{}/files/upload_sessions/{}/commit", self.upload_base, session_id);
        let body = json!({ "parts": parts });

        for attempt in 1..=MAX_COMMIT_ATTEMPTS {
            let response = self
                .send(
                    self.http
                        .post(&url)
                        .header("Digest", digest)
                        .json(&body),
                )
                .await?;

            // 202: Box is still assembling the parts and asks to commit again later.
            if response.status() == StatusCode::ACCEPTED {
                let wait = retry_after_secs(&response);
                tracing::info!(attempt, wait, session_id, "Upload session commit still processing");
                tokio::time::sleep(Duration::from_secs(wait)).await;
                continue;
            }

            let files: FileCollection = read_json(response).await?;
            return first_file(files);
        }

        Err(RemoteApiError::with_status(
            StatusCode::ACCEPTED.as_u16(),
            format!("upload session {session_id} was still processing after {MAX_COMMIT_ATTEMPTS} commits"),
        )
        .into())
    }
}

#[async_trait]
impl ObjectStore for BoxClient {
    async fn list_folder_items(&self, folder_id: &str) -> Result<Vec<RemoteItem>> {
        tracing::info!(folder_id, "Listing Box folder items");
        let url = format!("{}/folders/{}/items", self.api_base, folder_id);
        let mut items = Vec::new();
        let mut offset = 0u64;

        loop {
            let page: FolderPage = self
                .send_json(self.http.get(&url).query(&[
                    ("fields", "id,type,name".to_string()),
                    ("limit", LIST_PAGE_LIMIT.to_string()),
                    ("offset", offset.to_string()),
                ]))
                .await?;

            let received = page.entries.len() as u64;
            items.extend(page.entries.into_iter().map(|entry| RemoteItem {
                id: entry.id,
                name: entry.name,
                kind: entry.kind,
            }));
            offset += received;

            if received == 0 || offset >= page.total_count {
                break;
            }
        }

        tracing::info!(folder_id, count = items.len(), "Fetched all items in folder");
        Ok(items)
    }

    async fn upload(&self, folder_id: &str, local_path: &Path) -> Result<UploadedObject> {
        let (name, contents) = read_file(local_path).await?;
        tracing::info!(folder_id, file = %name, size = contents.len(), "Uploading new file");

        let attributes = json!({ "name": name, "parent": { "id": folder_id } });
        let form = Form::new()
            .text("attributes", attributes.to_string())
            .part("file", Part::bytes(contents).file_name(name));
        let uploaded = self
            .upload_multipart(format!("{}/files/content", self.upload_base), form)
            .await?;
        tracing::info!(id = %uploaded.id, name = %uploaded.name, "File uploaded to Box");
        Ok(uploaded)
    }

    async fn upload_chunked(&self, folder_id: &str, local_path: &Path) -> Result<UploadedObject> {
        let (name, file_size) = file_name_and_size(local_path)?;
        tracing::info!(folder_id, file = %name, file_size, "Uploading new file in chunks");

        let uploaded = self
            .run_session(
                format!("{}/files/upload_sessions", self.upload_base),
                json!({ "folder_id": folder_id, "file_size": file_size, "file_name": name }),
                local_path,
                file_size,
            )
            .await?;
        tracing::info!(id = %uploaded.id, name = %uploaded.name, "File uploaded to Box");
        Ok(uploaded)
    }

    async fn update_contents(&self, object_id: &str, local_path: &Path) -> Result<UploadedObject> {
        let (name, contents) = read_file(local_path).await?;
        tracing::info!(object_id, file = %name, size = contents.len(), "Uploading new version");

        // No attributes part: only the contents change, never the name.
        let form = Form::new().part("file", Part::bytes(contents).file_name(name));
        let updated = self
            .upload_multipart(
                format!("{}/files/{}/content", self.upload_base, object_id),
                form,
            )
            .await?;
        tracing::info!(id = %updated.id, name = %updated.name, "File has been updated");
        Ok(updated)
    }

    async fn update_contents_chunked(
        &self,
        object_id: &str,
        local_path: &Path,
    ) -> Result<UploadedObject> {
        let (name, file_size) = file_name_and_size(local_path)?;
        tracing::info!(object_id, file = %name, file_size, "Uploading new version in chunks");

        let updated = self
            .run_session(
                format!("{}/files/{}/upload_sessions", self.upload_base, object_id),
                json!({ "file_size": file_size }),
                local_path,
                file_size,
            )
            .await?;
        tracing::info!(id = %updated.id, name = %updated.name, "File has been updated");
        Ok(updated)
    }
}

async fn request_token(
    token_url: &str,
    client_id: &str,
    client_secret: &str,
    subject: &Subject,
) -> Result<String> {
    let (subject_type, subject_id) = subject.form_fields();
    tracing::info!(client_id, subject_type, "Requesting Box access token");

    let response = reqwest::Client::new()
        .post(token_url)
        .form(&[
            ("grant_type", "client_credentials"),
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("box_subject_type", subject_type),
            ("box_subject_id", subject_id),
        ])
        .send()
        .await
        .map_err(|e| RemoteApiError::transport(format!("token request failed: {e}")))?;
    let token: TokenResponse = read_json(check(response).await?).await?;
    tracing::info!(expires_in = ?token.expires_in, "Obtained Box access token");
    Ok(token.access_token)
}

async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let error = api_error(status, &body);
    tracing::error!(error = %error, "Box API returned an error");
    Err(error.into())
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    response.json::<T>().await.map_err(|e| {
        tracing::error!(error = ?e, %status, "Failed to decode Box response");
        RemoteApiError {
            status: Some(status.as_u16()),
            code: None,
            message: format!("malformed response body: {e}"),
            context: None,
        }
        .into()
    })
}

fn api_error(status: StatusCode, body: &str) -> RemoteApiError {
    let fallback = status
        .canonical_reason()
        .unwrap_or("unexpected status")
        .to_string();
    match serde_json::from_str::<BoxErrorBody>(body) {
        Ok(parsed) => RemoteApiError {
            status: Some(status.as_u16()),
            code: parsed.code,
            message: parsed.message.unwrap_or(fallback),
            context: parsed.context_info,
        },
        Err(_) => RemoteApiError {
            status: Some(status.as_u16()),
            code: None,
            message: fallback,
            context: (!body.is_empty()).then(|| serde_json::Value::String(body.to_string())),
        },
    }
}

fn first_file(files: FileCollection) -> Result<UploadedObject> {
    files
        .entries
        .into_iter()
        .next()
        .map(|entry| UploadedObject {
            id: entry.id,
            name: entry.name,
        })
        .ok_or_else(|| RemoteApiError::transport("Box response listed no uploaded file").into())
}

fn retry_after_secs(response: &Response) -> u64 {
    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(1)
}

fn sha_digest(digest: &[u8]) -> String {
    format!("sha={}", STANDARD.encode(digest))
}

fn trim_base(base: String) -> String {
    base.trim_end_matches('/').to_string()
}

fn file_name_and_size(local_path: &Path) -> Result<(String, u64)> {
    let name = local_path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            Error::io(
                "unsupported file name",
                local_path,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "file name is not valid UTF-8"),
            )
        })?
        .to_string();
    let size = std::fs::metadata(local_path)
        .map_err(|e| Error::io("failed to read", local_path, e))?
        .len();
    Ok((name, size))
}

async fn read_file(local_path: &Path) -> Result<(String, Vec<u8>)> {
    let (name, _) = file_name_and_size(local_path)?;
    let contents = tokio::fs::read(local_path)
        .await
        .map_err(|e| Error::io("failed to read", local_path, e))?;
    Ok((name, contents))
}

#[derive(Deserialize)]
struct BoxEntry {
    id: String,
    name: String,
    #[serde(rename = "type")]
    kind: ItemKind,
}

#[derive(Deserialize)]
struct FolderPage {
    total_count: u64,
    #[serde(default)]
    entries: Vec<BoxEntry>,
}

#[derive(Deserialize)]
struct FileCollection {
    #[serde(default)]
    entries: Vec<BoxEntry>,
}

#[derive(Deserialize)]
struct UploadSession {
    id: String,
    part_size: u64,
    #[serde(default)]
    total_parts: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionPart {
    part_id: String,
    offset: u64,
    size: u64,
    sha1: String,
}

#[derive(Deserialize)]
struct UploadedPart {
    part: SessionPart,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Deserialize)]
struct BoxErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    context_info: Option<serde_json::Value>,
}
