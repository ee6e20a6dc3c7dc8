//! Target paper resolution: a local path or an HTTP(S) URL becomes a
//! local PDF file pdfium can open.
//!
//! pdfium loads from a file-system path, so a URL is downloaded into a
//! `TempDir` that lives as long as the returned [`ResolvedInput`]. The
//! `%PDF` magic is checked up front so a wrong file is reported as
//! [`RelworkError::NotAPdf`] instead of a pdfium parse failure.

use crate::error::RelworkError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// A target paper ready for decoding.
#[derive(Debug)]
pub enum ResolvedInput {
    /// Input was already a local file.
    Local(PathBuf),
    /// Input was a URL; the PDF lives in `_temp_dir` until drop.
    Downloaded { path: PathBuf, _temp_dir: TempDir },
}

impl ResolvedInput {
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Downloaded { path, .. } => path,
        }
    }
}

pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve `input` to a local PDF file.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, RelworkError> {
    let trimmed = input.trim();
    if trimmed.is_empty() || (trimmed.contains("://") && !is_url(trimmed)) {
        return Err(RelworkError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(trimmed) {
        download_url(trimmed, timeout_secs).await
    } else {
        resolve_local(Path::new(trimmed))
    }
}

/// Validate a local file: exists, readable, starts with `%PDF`.
pub fn resolve_local(path: &Path) -> Result<ResolvedInput, RelworkError> {
    let path = path.to_path_buf();

    let mut file = match std::fs::File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(RelworkError::PermissionDenied { path });
        }
        Err(_) => return Err(RelworkError::FileNotFound { path }),
    };

    let mut magic = [0u8; 4];
    match file.read_exact(&mut magic) {
        Ok(()) if &magic == PDF_MAGIC => {}
        Ok(()) => return Err(RelworkError::NotAPdf { path, magic }),
        // Shorter than four bytes: cannot be a PDF either.
        Err(_) => return Err(RelworkError::NotAPdf { path, magic }),
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(ResolvedInput::Local(path))
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, RelworkError> {
    info!("Downloading PDF from: {}", url);

    let failed = |reason: String| RelworkError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            RelworkError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let filename = filename_from_url(url);
    let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;

    let temp_dir = TempDir::new().map_err(|e| RelworkError::Internal(e.to_string()))?;
    let file_path = temp_dir.path().join(&filename);

    if !bytes.starts_with(PDF_MAGIC) {
        let mut magic = [0u8; 4];
        let n = bytes.len().min(4);
        magic[..n].copy_from_slice(&bytes[..n]);
        return Err(RelworkError::NotAPdf {
            path: file_path,
            magic,
        });
    }

    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| RelworkError::Internal(format!("Failed to write temp file: {}", e)))?;

    info!("Downloaded {} bytes to: {}", bytes.len(), file_path.display());

    Ok(ResolvedInput::Downloaded {
        path: file_path,
        _temp_dir: temp_dir,
    })
}

/// Last URL path segment when it looks like a file name.
fn filename_from_url(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|last| !last.is_empty() && last.contains('.'))
        .unwrap_or_else(|| "paper.pdf".to_string())
}
