//! File sink with use-after-close checks
//!
//! Writes share a read lock so several threads can append at once; closing
//! takes the write lock, so a close never overlaps a write in progress.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{PoisonError, RwLock};

use super::line_writer::CloseableWrite;
use crate::config::Options;

/// A log file that must be closed exactly once
///
/// Writing to or closing the file after it has been closed is a developer
/// error and is reported through [`Options::critical`]. When that report does
/// not abort, the operation is still attempted and fails with an I/O error.
pub struct CloseableFile {
    /// `None` once the file has been closed
    file: RwLock<Option<File>>,
    options: Options,
}

impl CloseableFile {
    /// Wrap an already opened file
    pub fn new(file: File, options: Options) -> Self {
        Self {
            file: RwLock::new(Some(file)),
            options,
        }
    }

    /// Open `path` for appending, creating it if it does not exist
    pub fn open(path: &Path, options: Options) -> io::Result<Self> {
        let mut open_options = OpenOptions::new();
        open_options.create(true).append(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            open_options.mode(0o660);
        }
        let file = open_options.open(path)?;
        tracing::debug!(path = %path.display(), "Opened log file");
        Ok(Self::new(file, options))
    }

    /// Check if the file has been closed
    pub fn is_closed(&self) -> bool {
        self.file
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Write `buf` to the file
    pub fn write(&self, buf: &[u8]) -> io::Result<usize> {
        let file = self.file.read().unwrap_or_else(PoisonError::into_inner);
        // Sanity check - close should not have been called yet.
        if file.is_none() {
            self.options
                .critical("cannot write to the file after it has been closed");
        }
        match file.as_ref() {
            Some(mut handle) => handle.write(buf),
            None => Err(already_closed()),
        }
    }

    /// Sync the file to disk and close it
    ///
    /// A failed sync is returned and leaves the file open.
    pub fn close(&self) -> io::Result<()> {
        let mut file = self.file.write().unwrap_or_else(PoisonError::into_inner);
        // Sanity check - close should not have been called yet.
        if file.is_none() {
            self.options.critical("cannot close the file; already closed");
        }
        let Some(handle) = file.take() else {
            return Err(already_closed());
        };

        // Ensure that all data has actually hit the disk.
        if let Err(err) = handle.sync_all() {
            *file = Some(handle);
            return Err(err);
        }
        tracing::debug!("Closed log file");
        close_handle(handle)
    }
}

fn already_closed() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "file already closed")
}

#[cfg(unix)]
fn close_handle(file: File) -> io::Result<()> {
    use std::os::unix::io::IntoRawFd;

    let fd = file.into_raw_fd();
    // SAFETY: `fd` was just released by `into_raw_fd` and nothing else owns it.
    if unsafe { libc::close(fd) } == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn close_handle(file: File) -> io::Result<()> {
    drop(file);
    Ok(())
}

impl Write for CloseableFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        CloseableFile::write(self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Write for &CloseableFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        CloseableFile::write(self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl CloseableWrite for CloseableFile {
    fn close(&mut self) -> io::Result<()> {
        CloseableFile::close(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReleaseType;
    use std::panic::{self, AssertUnwindSafe};
    use tempfile::TempDir;

    fn options(debug: bool) -> Options {
        Options {
            binary_name: "test".to_string(),
            debug,
            release: ReleaseType::Testing,
            version: "0.0.1".to_string(),
            ..Options::default()
        }
    }

    fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
        payload
            .downcast_ref::<String>()
            .cloned()
            .unwrap_or_default()
    }

    #[test]
    fn test_write_and_close() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.log");

        let file = CloseableFile::open(&path, options(true)).unwrap();
        assert_eq!(file.write(b"hello\n").unwrap(), 6);
        assert!(!file.is_closed());
        file.close().unwrap();
        assert!(file.is_closed());

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello\n");
    }

    #[test]
    fn test_open_appends() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.log");
        std::fs::write(&path, "existing\n").unwrap();

        let file = CloseableFile::open(&path, options(true)).unwrap();
        (&file).write_all(b"appended\n").unwrap();
        file.close().unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "existing\nappended\n"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_open_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.log");
        let file = CloseableFile::open(&path, options(true)).unwrap();
        file.close().unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        // umask may strip bits but never adds any
        assert_eq!(mode & !0o660, 0);
    }

    #[test]
    fn test_double_close_panics_in_debug() {
        let temp_dir = TempDir::new().unwrap();
        let file = CloseableFile::open(&temp_dir.path().join("test.log"), options(true)).unwrap();
        file.close().unwrap();

        let result = panic::catch_unwind(AssertUnwindSafe(|| file.close()));
        let message = panic_message(result.unwrap_err());
        assert!(message.contains("cannot close the file; already closed"));
        assert!(file.is_closed());
    }

    #[test]
    fn test_double_close_without_debug_is_attempted() {
        let temp_dir = TempDir::new().unwrap();
        let file =
            CloseableFile::open(&temp_dir.path().join("test.log"), options(false)).unwrap();
        file.close().unwrap();

        let result = panic::catch_unwind(AssertUnwindSafe(|| file.close()));
        let err = result.expect("close should not panic").unwrap_err();
        assert_eq!(err.to_string(), "file already closed");
    }

    #[test]
    fn test_write_after_close_panics_in_debug() {
        let temp_dir = TempDir::new().unwrap();
        let file = CloseableFile::open(&temp_dir.path().join("test.log"), options(true)).unwrap();
        file.close().unwrap();

        let result = panic::catch_unwind(AssertUnwindSafe(|| file.write(b"late\n")));
        let message = panic_message(result.unwrap_err());
        assert!(message.contains("cannot write to the file after it has been closed"));
    }

    #[test]
    fn test_write_after_close_without_debug_is_attempted() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.log");
        let file = CloseableFile::open(&path, options(false)).unwrap();
        file.close().unwrap();

        let result = panic::catch_unwind(AssertUnwindSafe(|| file.write(b"late\n")));
        assert!(result.expect("write should not panic").is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_close_after_poisoned_lock() {
        let temp_dir = TempDir::new().unwrap();
        let file = CloseableFile::open(&temp_dir.path().join("test.log"), options(true)).unwrap();
        file.close().unwrap();
        let _ = panic::catch_unwind(AssertUnwindSafe(|| file.close()));

        // The abort above happened under the write lock.
        assert!(file.is_closed());
    }

    #[test]
    fn test_concurrent_writes() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.log");
        let file = CloseableFile::open(&path, options(true)).unwrap();

        std::thread::scope(|scope| {
            for thread in 0..8 {
                let file = &file;
                scope.spawn(move || {
                    for i in 0..50 {
                        let line = format!("thread {} line {}\n", thread, i);
                        file.write(line.as_bytes()).unwrap();
                    }
                });
            }
        });
        file.close().unwrap();

        let data = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = data.lines().collect();
        assert_eq!(lines.len(), 400);
        assert!(lines.iter().all(|l| l.starts_with("thread ")));
    }

    #[test]
    fn test_closeable_write_trait() {
        let temp_dir = TempDir::new().unwrap();
        let mut file =
            CloseableFile::open(&temp_dir.path().join("test.log"), options(true)).unwrap();
        CloseableWrite::close(&mut file).unwrap();
        assert!(file.is_closed());
    }
}
