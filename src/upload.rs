//! Writing uploaded streams into managed directories.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::RegistryError;

/// Result of [`FileWriter::write_to_disk`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteOutcome {
    pub path: PathBuf,
    /// A file of that name was already present and was left untouched.
    pub already_existed: bool,
    /// Bytes written; zero when the file already existed.
    pub bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

/// Persists an uploaded stream under a declared file name.
pub trait FileWriter: Send + Sync {
    fn write_to_disk(
        &self,
        reader: &mut dyn Read,
        declared_name: &str,
        target_dir: &Path,
    ) -> Result<WriteOutcome, RegistryError>;
}

/// Checks that `name` is a single path component.
pub fn validate_file_name(name: &str) -> Result<&str, RegistryError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(RegistryError::validation("file_name", "must not be empty"));
    }
    if name == "." || name == ".." {
        return Err(RegistryError::validation("file_name", "must name a file"));
    }
    if name.contains(|c: char| c == '/' || c == '\\' || c == '\0') {
        return Err(RegistryError::validation(
            "file_name",
            format!("'{}' must not contain path separators", name),
        ));
    }
    Ok(name)
}

static UPLOAD_SEQ: AtomicU64 = AtomicU64::new(0);

/// Default writer: streams into a temporary file beside the target, then
/// links it into place. An existing file is never overwritten.
#[derive(Debug, Clone)]
pub struct ManagedWriter {
    max_bytes: u64,
}

impl ManagedWriter {
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }

    fn temp_path(target_dir: &Path, name: &str) -> PathBuf {
        let seq = UPLOAD_SEQ.fetch_add(1, Ordering::Relaxed);
        target_dir.join(format!(".{}.upload.{}.{}", name, std::process::id(), seq))
    }

    /// Copy `reader` into `temp`, returning size and digest.
    fn stream(&self, reader: &mut dyn Read, temp: &Path) -> Result<(u64, String), RegistryError> {
        let mut file = File::create(temp).map_err(|e| RegistryError::io(temp, e))?;
        let mut hasher = Sha256::new();
        let mut buf = [0u8; 64 * 1024];
        let mut total: u64 = 0;

        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(RegistryError::io(temp, e)),
            };
            total += n as u64;
            if total > self.max_bytes {
                return Err(RegistryError::TooLarge {
                    limit: self.max_bytes,
                });
            }
            hasher.update(&buf[..n]);
            file.write_all(&buf[..n])
                .map_err(|e| RegistryError::io(temp, e))?;
        }

        file.sync_all().map_err(|e| RegistryError::io(temp, e))?;
        Ok((total, hex::encode(hasher.finalize())))
    }

    /// Move `temp` to `dest` unless `dest` exists. Returns false when
    /// another writer got there first.
    fn publish(temp: &Path, dest: &Path) -> Result<bool, RegistryError> {
        match fs::hard_link(temp, dest) {
            Ok(()) => {
                let _ = fs::remove_file(temp);
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                let _ = fs::remove_file(temp);
                Ok(false)
            }
            // Filesystems without hard links.
            Err(_) if !dest.exists() => {
                fs::rename(temp, dest).map_err(|e| RegistryError::io(dest, e))?;
                Ok(true)
            }
            Err(_) => {
                let _ = fs::remove_file(temp);
                Ok(false)
            }
        }
    }
}

impl FileWriter for ManagedWriter {
    fn write_to_disk(
        &self,
        reader: &mut dyn Read,
        declared_name: &str,
        target_dir: &Path,
    ) -> Result<WriteOutcome, RegistryError> {
        let name = validate_file_name(declared_name)?;
        fs::create_dir_all(target_dir).map_err(|e| RegistryError::io(target_dir, e))?;

        let dest = target_dir.join(name);
        if dest.exists() {
            tracing::debug!(path = %dest.display(), "upload target exists, keeping it");
            return Ok(WriteOutcome {
                path: dest,
                already_existed: true,
                bytes: 0,
                sha256: None,
            });
        }

        let temp = Self::temp_path(target_dir, name);
        let (bytes, sha256) = match self.stream(reader, &temp) {
            Ok(written) => written,
            Err(e) => {
                let _ = fs::remove_file(&temp);
                return Err(e);
            }
        };

        let created = Self::publish(&temp, &dest)?;
        if created {
            tracing::info!(path = %dest.display(), bytes, "stored upload");
        }
        Ok(WriteOutcome {
            path: dest,
            already_existed: !created,
            bytes: if created { bytes } else { 0 },
            sha256: created.then_some(sha256),
        })
    }
}
