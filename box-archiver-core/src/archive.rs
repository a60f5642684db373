//! Stages a period's selection into `{prefix}/` and packs it into `{prefix}.zip`.
//!
//! The move step is not atomic across entries. When it stops partway the
//! returned [`Error::PartialMove`] lists what already moved and what did not,
//! and nothing is rolled back. The archive itself is write-once: an existing
//! `{prefix}.zip` aborts the job before any file is touched.

use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{Error, Result};
use crate::select::SelectedFileSet;

/// The packaged period, ready to hand to the uploader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveBundle {
    pub source_directory: PathBuf,
    pub archive_path: PathBuf,
    /// Number of files written into the archive.
    pub entries: usize,
    pub size_bytes: u64,
}

pub fn archive(
    selected: SelectedFileSet,
    working_directory: &Path,
    prefix: &str,
) -> Result<ArchiveBundle> {
    let staging_dir = working_directory.join(prefix);
    let archive_path = working_directory.join(format!("{prefix}.zip"));

    ensure_absent(&archive_path)?;

    fs::create_dir_all(&staging_dir).map_err(|e| {
        error!(error = %e, dir = %staging_dir.display(), "[ARCHIVE][ERROR] Failed to create staging directory");
        Error::io("failed to create staging directory", &staging_dir, e)
    })?;

    let moved = move_into(selected, &staging_dir)?;
    info!(
        moved = moved.len(),
        dir = %staging_dir.display(),
        "[ARCHIVE] Target files have been moved"
    );

    let entries = match write_zip(working_directory, &staging_dir, &archive_path) {
        Ok(entries) => entries,
        Err(Error::ArchiveExists { path }) => return Err(Error::ArchiveExists { path }),
        Err(e) => {
            // Only our own half-written file is removed; the staged files stay.
            if let Err(cleanup) = fs::remove_file(&archive_path) {
                warn!(error = %cleanup, path = %archive_path.display(), "[ARCHIVE] Could not remove incomplete archive");
            }
            return Err(e);
        }
    };

    let size_bytes = fs::metadata(&archive_path)
        .map_err(|e| Error::io("failed to stat archive", &archive_path, e))?
        .len();

    info!(
        archive = %archive_path.display(),
        entries,
        size_bytes,
        "[ARCHIVE] Archive done"
    );

    Ok(ArchiveBundle {
        source_directory: staging_dir,
        archive_path,
        entries,
        size_bytes,
    })
}

fn ensure_absent(archive_path: &Path) -> Result<()> {
    match fs::symlink_metadata(archive_path) {
        Ok(_) => {
            error!(path = %archive_path.display(), "[ARCHIVE][ERROR] Archive file already exists");
            Err(Error::ArchiveExists {
                path: archive_path.to_path_buf(),
            })
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io("failed to check", archive_path, e)),
    }
}

fn move_into(selected: SelectedFileSet, staging_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut moved = Vec::with_capacity(selected.len());
    let mut pending = selected.into_iter();

    while let Some(source) = pending.next() {
        match move_entry(&source, staging_dir) {
            Ok(destination) => {
                debug!(from = %source.display(), to = %destination.display(), "[ARCHIVE] Moved");
                moved.push(source);
            }
            Err(e) => {
                let remaining: Vec<PathBuf> = pending.collect();
                error!(
                    error = %e,
                    failed = %source.display(),
                    moved = moved.len(),
                    remaining = remaining.len(),
                    "[ARCHIVE][ERROR] Move stopped partway; earlier moves are kept"
                );
                return Err(Error::PartialMove {
                    staging_dir: staging_dir.to_path_buf(),
                    moved,
                    failed: source,
                    remaining,
                    source: e,
                });
            }
        }
    }

    Ok(moved)
}

fn move_entry(source: &Path, staging_dir: &Path) -> io::Result<PathBuf> {
    let name = source.file_name().ok_or_else(|| {
        io::Error::new(ErrorKind::InvalidInput, "entry has no file name")
    })?;
    let destination = staging_dir.join(name);

    // rename(2) silently replaces files; a name clash must stop the move instead.
    if fs::symlink_metadata(&destination).is_ok() {
        return Err(io::Error::new(
            ErrorKind::AlreadyExists,
            format!("{} already exists", destination.display()),
        ));
    }

    fs::rename(source, &destination)?;
    Ok(destination)
}

/// Writes every file under `staging_dir` into `archive_path`, named relative
/// to `working_directory` so the archive unpacks into `{prefix}/`.
fn write_zip(working_directory: &Path, staging_dir: &Path, archive_path: &Path) -> Result<usize> {
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(archive_path)
        .map_err(|e| {
            if e.kind() == ErrorKind::AlreadyExists {
                Error::ArchiveExists {
                    path: archive_path.to_path_buf(),
                }
            } else {
                Error::io("failed to create archive", archive_path, e)
            }
        })?;

    let zip_error = |source: zip::result::ZipError| Error::Archive {
        path: archive_path.to_path_buf(),
        source,
    };

    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut files = 0;

    for entry in WalkDir::new(staging_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| staging_dir.to_path_buf());
            Error::io("failed to walk", path, e.into())
        })?;

        let name = entry_name(working_directory, entry.path())?;
        if is_directory(&entry) {
            zip.add_directory(name, options).map_err(zip_error)?;
            continue;
        }

        debug!(entry = %name, "[ARCHIVE] Adding file");
        zip.start_file(name, options).map_err(zip_error)?;
        let mut source =
            File::open(entry.path()).map_err(|e| Error::io("failed to read", entry.path(), e))?;
        io::copy(&mut source, &mut zip)
            .map_err(|e| Error::io("failed to compress", entry.path(), e))?;
        files += 1;
    }

    zip.finish().map_err(zip_error)?;
    Ok(files)
}

/// A symlink to a directory is recorded as a directory entry. Links are not
/// followed, so its target's contents stay out of the archive.
fn is_directory(entry: &walkdir::DirEntry) -> bool {
    if entry.file_type().is_dir() {
        return true;
    }
    entry.path_is_symlink()
        && fs::metadata(entry.path())
            .map(|metadata| metadata.is_dir())
            .unwrap_or(false)
}

/// Zip entry names always use `/`, whatever the platform separator.
fn entry_name(working_directory: &Path, path: &Path) -> Result<String> {
    let relative = path.strip_prefix(working_directory).map_err(|_| {
        Error::io(
            "entry is outside the working directory",
            path,
            io::Error::new(ErrorKind::InvalidInput, "unexpected path prefix"),
        )
    })?;

    let parts: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    Ok(parts.join("/"))
}
