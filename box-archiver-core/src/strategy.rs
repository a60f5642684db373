use serde::Serialize;

/// Files strictly larger than this go through an upload session.
pub const CHUNKED_UPLOAD_THRESHOLD: u64 = 50 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferMode {
    Direct,
    Chunked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransferPlan {
    pub mode: TransferMode,
    pub size_bytes: u64,
}

/// Chooses the transfer mode from the file size alone. Exactly 50 MiB is direct.
pub fn plan(size_bytes: u64) -> TransferPlan {
    let mode = if size_bytes > CHUNKED_UPLOAD_THRESHOLD {
        TransferMode::Chunked
    } else {
        TransferMode::Direct
    };
    TransferPlan { mode, size_bytes }
}
