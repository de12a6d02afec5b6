//! File-based storage backend.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Open handle plus the length every read is checked against.
#[derive(Debug)]
struct LogFile {
    file: File,
    len: u64,
}

impl LogFile {
    fn open(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        let len = file.metadata()?.len();
        Ok(Self { file, len })
    }

    fn read_range(&mut self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        if offset.saturating_add(len as u64) > self.len {
            return Err(StorageError::ReadPastEnd {
                offset,
                len,
                size: self.len,
            });
        }
        let mut buffer = vec![0u8; len];
        if len > 0 {
            self.file.seek(SeekFrom::Start(offset))?;
            self.file.read_exact(&mut buffer)?;
        }
        Ok(buffer)
    }

    fn write_tail(&mut self, data: &[u8]) -> StorageResult<u64> {
        let start = self.len;
        if !data.is_empty() {
            self.file.seek(SeekFrom::Start(start))?;
            self.file.write_all(data)?;
            self.len += data.len() as u64;
        }
        Ok(start)
    }
}

/// A journal log stored in a single file.
///
/// Appends go to the end of the file. `sync()` is `File::sync_all()`.
/// `replace_contents()` writes `<name>.tmp`, syncs it, renames it over the
/// log and syncs the directory, so after a crash the log holds either the
/// old or the new bytes.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    log: Mutex<LogFile>,
}

impl FileBackend {
    /// Opens the log at `path`, creating an empty one if missing.
    pub fn open(path: &Path) -> StorageResult<Self> {
        Ok(Self {
            path: path.to_path_buf(),
            log: Mutex::new(LogFile::open(path)?),
        })
    }

    /// Like [`FileBackend::open`], creating parent directories first.
    pub fn open_with_create_dirs(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Self::open(path)
    }

    /// Path of the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(suffix);
        self.path.with_file_name(name)
    }

    #[cfg(unix)]
    fn sync_dir(&self) -> StorageResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            File::open(parent)?.sync_all()?;
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_dir(&self) -> StorageResult<()> {
        Ok(())
    }
}

impl StorageBackend for FileBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        self.log.lock().read_range(offset, len)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        self.log.get_mut().write_tail(data)
    }

    fn flush(&mut self) -> StorageResult<()> {
        Ok(self.log.get_mut().file.flush()?)
    }

    fn sync(&mut self) -> StorageResult<()> {
        Ok(self.log.get_mut().file.sync_all()?)
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.log.lock().len)
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        let log = self.log.get_mut();
        if new_size > log.len {
            return Err(StorageError::TruncatePastEnd {
                requested: new_size,
                size: log.len,
            });
        }
        log.file.set_len(new_size)?;
        log.file.sync_all()?;
        log.len = new_size;
        Ok(())
    }

    fn replace_contents(&mut self, data: &[u8]) -> StorageResult<()> {
        let temp = self.sibling(".tmp");
        let mut out = File::create(&temp)?;
        out.write_all(data)?;
        out.sync_all()?;
        drop(out);

        fs::rename(&temp, &self.path)?;
        self.sync_dir()?;
        *self.log.get_mut() = LogFile::open(&self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn creates_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("content.log");

        let backend = FileBackend::open(&path).unwrap();
        assert_eq!(backend.size().unwrap(), 0);
        assert!(path.exists());
        assert_eq!(backend.path(), path);
    }

    #[test]
    fn appended_bytes_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("content.log");

        {
            let mut backend = FileBackend::open(&path).unwrap();
            backend.append(b"frame-1").unwrap();
            backend.append(b"frame-2").unwrap();
            backend.sync().unwrap();
        }

        let backend = FileBackend::open(&path).unwrap();
        assert_eq!(backend.size().unwrap(), 14);
        assert_eq!(backend.read_at(7, 7).unwrap(), b"frame-2");
    }

    #[test]
    fn truncate_drops_tail() {
        let dir = tempdir().unwrap();
        let mut backend = FileBackend::open(&dir.path().join("j.log")).unwrap();
        backend.append(b"keep-torn").unwrap();

        backend.truncate(4).unwrap();
        assert_eq!(backend.read_all().unwrap(), b"keep");
        assert!(matches!(
            backend.truncate(9),
            Err(StorageError::TruncatePastEnd { .. })
        ));
    }

    #[test]
    fn replace_contents_swaps_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prefs.log");
        let mut backend = FileBackend::open(&path).unwrap();
        backend.append(b"old old old").unwrap();

        backend.replace_contents(b"new").unwrap();
        assert_eq!(backend.read_all().unwrap(), b"new");
        assert!(!dir.path().join("prefs.log.tmp").exists());

        backend.append(b"+").unwrap();
        drop(backend);
        let reopened = FileBackend::open(&path).unwrap();
        assert_eq!(reopened.read_all().unwrap(), b"new+");
    }

    #[test]
    fn create_with_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("content.log");
        FileBackend::open_with_create_dirs(&path).unwrap();
        assert!(path.exists());
    }
}
