//! Create-or-update of one local file against one remote folder.
//!
//! The input may be a freshly built archive or any file the operator names;
//! nothing here assumes it came from [`crate::archive`].

use std::fs;
use std::io;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, error, info};

use crate::contract::{ObjectStore, RemoteCatalog, UploadedObject};
use crate::error::{Error, Result};
use crate::strategy::{self, TransferMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    Create,
    Update,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadOutcome {
    pub remote_id: String,
    pub name: String,
    pub mode: SyncMode,
    pub transfer: TransferMode,
    pub size_bytes: u64,
}

pub struct SyncReconciler<'a, C: ?Sized, S: ?Sized> {
    catalog: &'a C,
    store: &'a S,
}

impl<'a, C, S> SyncReconciler<'a, C, S>
where
    C: RemoteCatalog + ?Sized,
    S: ObjectStore + ?Sized,
{
    pub fn new(catalog: &'a C, store: &'a S) -> Self {
        SyncReconciler { catalog, store }
    }

    /// Uploads `path` into `folder_id` as a new file, or as new contents of
    /// the existing file with the same base name. Any remote failure ends
    /// the call; nothing is retried.
    pub async fn sync(&self, path: &Path, folder_id: &str) -> Result<UploadOutcome> {
        let (name, size_bytes) = local_file(path)?;
        info!(file = %path.display(), name = %name, size_bytes, "[SYNC] Target file");

        let existing = self
            .catalog
            .find_by_name(folder_id, &name)
            .await
            .map_err(|e| {
                error!(error = %e, folder_id, name = %name, "[SYNC][ERROR] Failed to list remote folder");
                e
            })?;

        let plan = strategy::plan(size_bytes);
        if plan.mode == TransferMode::Chunked {
            info!(size_bytes, "[SYNC] File size is over 50MB. Using chunked upload");
        }

        let (mode, result) = match &existing {
            None => {
                info!(name = %name, folder_id, "[SYNC][UPLOAD] Uploading as new file");
                let result = match plan.mode {
                    TransferMode::Direct => self.store.upload(folder_id, path).await,
                    TransferMode::Chunked => self.store.upload_chunked(folder_id, path).await,
                };
                (SyncMode::Create, result)
            }
            Some(object) => {
                info!(name = %name, id = %object.id, "[SYNC][UPLOAD] Uploading as new version");
                let result = match plan.mode {
                    TransferMode::Direct => self.store.update_contents(&object.id, path).await,
                    TransferMode::Chunked => {
                        self.store.update_contents_chunked(&object.id, path).await
                    }
                };
                (SyncMode::Update, result)
            }
        };

        let UploadedObject { id, name } = result.map_err(|e| {
            error!(error = %e, ?mode, transfer = ?plan.mode, "[SYNC][ERROR][UPLOAD] Transfer failed");
            e
        })?;

        let outcome = UploadOutcome {
            remote_id: id,
            name,
            mode,
            transfer: plan.mode,
            size_bytes,
        };
        info!(
            remote_id = %outcome.remote_id,
            name = %outcome.name,
            mode = ?outcome.mode,
            transfer = ?outcome.transfer,
            "[SYNC][UPLOAD] Transfer succeeded"
        );
        match serde_json::to_string_pretty(&outcome) {
            Ok(json) => debug!(json = %json, "[SYNC][UPLOAD][DEBUG] Upload outcome as JSON"),
            Err(e) => error!(error = ?e, "[SYNC][UPLOAD][DEBUG] Failed to serialize upload outcome"),
        }
        Ok(outcome)
    }
}

/// Base name and byte size of a regular file.
fn local_file(path: &Path) -> Result<(String, u64)> {
    let metadata = fs::metadata(path).map_err(|e| {
        error!(error = %e, file = %path.display(), "[SYNC][ERROR] No such file found");
        Error::io("failed to read", path, e)
    })?;
    if !metadata.is_file() {
        return Err(Error::io(
            "not a regular file",
            path,
            io::Error::new(io::ErrorKind::InvalidInput, "expected a file"),
        ));
    }

    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            Error::io(
                "unsupported file name",
                path,
                io::Error::new(io::ErrorKind::InvalidInput, "file name is not valid UTF-8"),
            )
        })?;

    Ok((name.to_string(), metadata.len()))
}
