//! Ephemeral staging of uploaded documents.
//!
//! Uploaded file parts are streamed to disk under a unique name and tracked by
//! a [`StagedFiles`] guard. The guard owns deletion: the handler calls
//! [`StagedFiles::cleanup`] on every path, and anything still tracked when the
//! guard is dropped (for example when the client disconnects mid-request) is
//! removed synchronously in `Drop`.

use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::distributions::Alphanumeric;
use rand::Rng;
use tokio::fs::{self, File, OpenOptions};
use tracing::{debug, warn};

const TOKEN_LEN: usize = 16;
const MAX_NAME_LEN: usize = 100;

/// Directory that holds staged uploads for in-flight requests.
#[derive(Debug, Clone)]
pub struct UploadDir {
    root: PathBuf,
}

impl UploadDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the directory if it does not exist yet.
    pub async fn ensure(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root).await
    }

    /// Create a new, empty staged file and register it with `staged`.
    ///
    /// The on-disk name is `<unix-millis>-<random token>-<sanitized name>`.
    /// The file is opened with `create_new`, so an existing path is never
    /// overwritten.
    pub async fn create(
        &self,
        original_name: Option<&str>,
        staged: &mut StagedFiles,
    ) -> io::Result<(StagedFile, File)> {
        let sanitized = original_name.and_then(sanitize_filename);
        let stored_name = unique_name(sanitized.as_deref().unwrap_or("upload"));
        let path = self.root.join(&stored_name);

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;

        staged.track(path.clone());
        debug!(path = %path.display(), "upload_staged");

        Ok((
            StagedFile {
                path,
                original_name: sanitized,
                size: 0,
            },
            file,
        ))
    }
}

/// A document written to the upload directory for the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    /// Location on disk
    pub path: PathBuf,
    /// Client-supplied filename after sanitization, if one was sent
    pub original_name: Option<String>,
    /// Bytes written
    pub size: u64,
}

/// Tracks every staged path of one request and deletes them exactly once.
#[derive(Debug, Default)]
pub struct StagedFiles {
    paths: Vec<PathBuf>,
}

impl StagedFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&mut self, path: PathBuf) {
        self.paths.push(path);
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Delete all tracked files. Returns how many were actually removed.
    ///
    /// A file that is already gone counts as cleaned up. Other failures are
    /// logged and the path is forgotten either way.
    pub async fn cleanup(&mut self) -> usize {
        let mut removed = 0;
        for path in self.paths.drain(..) {
            match fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "staged_file_delete_failed");
                }
            }
        }
        removed
    }
}

// Blocking removal. Only reached when the request future is abandoned before
// `cleanup()` ran; the normal path must keep going through `cleanup()`.
impl Drop for StagedFiles {
    fn drop(&mut self) {
        for path in self.paths.drain(..) {
            match std::fs::remove_file(&path) {
                Ok(()) => debug!(path = %path.display(), "staged_file_removed_on_drop"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "staged_file_delete_failed");
                }
            }
        }
    }
}

/// Reduce a client-supplied filename to a safe single path component.
///
/// Directory parts are dropped, characters outside `[A-Za-z0-9._-]` become
/// `_`, and leading dots are stripped. Returns `None` if nothing is left.
pub fn sanitize_filename(raw: &str) -> Option<String> {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() || trimmed.chars().all(|c| c == '_') {
        return None;
    }

    Some(trimmed.chars().take(MAX_NAME_LEN).collect())
}

fn unique_name(sanitized: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();

    let token: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect();

    format!("{millis}-{token}-{sanitized}")
}
