//! # contract: the remote side of the pipeline
//!
//! This module defines the traits the core needs from a remote object store,
//! and the plain data types that cross the local/remote boundary.
//!
//! ## Interface & Extensibility
//! - Implement [`ObjectStore`] to plug in a storage backend (the CLI crate ships one for Box).
//! - [`RemoteCatalog`] resolves a local file name to an existing remote object;
//!   [`crate::catalog::FolderCatalog`] implements it on top of any [`ObjectStore`].
//! - All methods are async and fail with [`crate::Error::RemoteApi`] carrying the
//!   status and whatever context the backend returned.
//!
//! ## Mocking & Testing
//! - Both traits are annotated for `mockall`; with the default `test-export-mocks`
//!   feature, `MockObjectStore` and `MockRemoteCatalog` are exported for integration tests.

use std::path::Path;

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// What kind of entry a folder listing returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    File,
    Folder,
    WebLink,
}

/// One entry in a remote folder listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteItem {
    pub id: String,
    pub name: String,
    pub kind: ItemKind,
}

/// A remote file that a local file name resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteObjectRef {
    pub name: String,
    pub id: String,
}

/// What the store reports back after a create or update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedObject {
    pub id: String,
    pub name: String,
}

/// The operations the pipeline consumes from a remote object store.
///
/// The chunked variants take and return the same shapes as their direct
/// counterparts. How a chunked transfer is split, ordered or parallelised is
/// the implementor's business; to callers it succeeds or fails as a unit.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Every item in `folder_id`, across all pages.
    async fn list_folder_items(&self, folder_id: &str) -> Result<Vec<RemoteItem>>;

    /// Create a new file in `folder_id` in a single request.
    async fn upload(&self, folder_id: &str, local_path: &Path) -> Result<UploadedObject>;

    /// Create a new file in `folder_id` through an upload session.
    async fn upload_chunked(&self, folder_id: &str, local_path: &Path) -> Result<UploadedObject>;

    /// Replace the contents of `object_id` in a single request. Name and
    /// metadata are left as they are.
    async fn update_contents(&self, object_id: &str, local_path: &Path) -> Result<UploadedObject>;

    /// Replace the contents of `object_id` through an upload session.
    async fn update_contents_chunked(
        &self,
        object_id: &str,
        local_path: &Path,
    ) -> Result<UploadedObject>;
}

/// Resolves a local file name against the contents of one remote folder.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait RemoteCatalog: Send + Sync {
    /// `Ok(None)` means no exact match: the caller should create.
    async fn find_by_name(&self, folder_id: &str, name: &str) -> Result<Option<RemoteObjectRef>>;
}
