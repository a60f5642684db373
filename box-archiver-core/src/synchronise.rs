//! High-level pipeline: select → package → reconcile → transfer.
//!
//! Two entry points share everything from the sync step onward:
//!   - [`synchronise_period`]: selects `{prefix}-*`, stages and zips it, then uploads `{prefix}.zip`
//!   - [`synchronise_file`]: uploads one operator-named file as-is
//!
//! # Responsibilities
//! - Strictly sequential and fail-fast: the first failing step ends the run and its error is returned
//! - Local side effects made before a failure (moved files, a finished archive) are left in place
//! - The remote folder comes from the [`SyncConfig`] passed in, never from the environment
//!
//! # Callable From
//! - The CLI crate, with its Box client as the [`ObjectStore`]
//! - Integration tests, with `MockObjectStore` / `MockRemoteCatalog`

use std::path::Path;

use serde::Serialize;
use tracing::{error, info};

use crate::archive::{archive, ArchiveBundle};
use crate::config::SyncConfig;
use crate::contract::{ObjectStore, RemoteCatalog};
use crate::error::Result;
use crate::period::ArchiveJob;
use crate::reconcile::{SyncReconciler, UploadOutcome};
use crate::select::select;

/// What one run did.
#[derive(Debug, Clone, Serialize)]
pub struct SynchroniseReport {
    /// Present for periodic runs only.
    pub bundle: Option<ArchiveBundle>,
    pub upload: UploadOutcome,
}

/// Local half of a periodic run: select the period's entries and package them.
pub fn archive_period(job: &ArchiveJob) -> Result<ArchiveBundle> {
    info!(period = job.period_prefix(), "[ARCHIVE] Starting");
    let selected = select(job.working_directory(), job.period_prefix())?;
    archive(selected, job.working_directory(), job.period_prefix())
}

pub async fn synchronise_period<C, S>(
    job: &ArchiveJob,
    config: &SyncConfig,
    catalog: &C,
    store: &S,
) -> Result<SynchroniseReport>
where
    C: RemoteCatalog + ?Sized,
    S: ObjectStore + ?Sized,
{
    info!(period = job.period_prefix(), folder_id = %config.folder_id, "[SYNC] Starting periodic synchronisation");

    let bundle = archive_period(job).map_err(|e| {
        error!(error = %e, period = job.period_prefix(), "[SYNC][ERROR] Archive step failed");
        e
    })?;

    let upload = SyncReconciler::new(catalog, store)
        .sync(&bundle.archive_path, &config.folder_id)
        .await?;

    Ok(SynchroniseReport {
        bundle: Some(bundle),
        upload,
    })
}

pub async fn synchronise_file<C, S>(
    path: &Path,
    config: &SyncConfig,
    catalog: &C,
    store: &S,
) -> Result<SynchroniseReport>
where
    C: RemoteCatalog + ?Sized,
    S: ObjectStore + ?Sized,
{
    info!(file = %path.display(), folder_id = %config.folder_id, "[SYNC] Starting file synchronisation");

    let upload = SyncReconciler::new(catalog, store)
        .sync(path, &config.folder_id)
        .await?;

    Ok(SynchroniseReport {
        bundle: None,
        upload,
    })
}
