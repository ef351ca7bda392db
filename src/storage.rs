//! The collector's storage directory and the artifacts written into it.
//!
//! Three kinds of file live in the directory:
//!
//! - `cdr.raw`: every chunk as received, one per line.
//! - `cdr.csv`: one audit line per decoded record.
//! - sender files named `<unix-seconds><random>`, each holding one line for
//!   the billing sender.
//!
//! Several connections write into the same directory at once. Log files are
//! reopened in append mode for every write and each line goes out in a
//! single `write_all`, so concurrent appends never truncate each other.
//! Sender files are created with create-new semantics.

use std::{
    io,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use rand::Rng;
use tokio::{fs::OpenOptions, io::AsyncWriteExt};

/// File name of the raw chunk log.
pub const RAW_LOG: &str = "cdr.raw";

/// File name of the CSV audit log.
pub const CSV_LOG: &str = "cdr.csv";

/// Attempts made to find an unused sender file name.
const NAME_ATTEMPTS: usize = 16;

/// An absolute storage directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageLocation {
    root: PathBuf,
}

impl StorageLocation {
    /// Resolve `path` to an absolute, canonical directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the path does not exist or is not a directory.
    pub fn resolve(path: impl AsRef<Path>) -> io::Result<Self> {
        let root = std::fs::canonicalize(path.as_ref())?;
        if !root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("{} is not a directory", root.display()),
            ));
        }
        Ok(Self { root })
    }

    /// Absolute path of the storage directory.
    #[must_use]
    pub fn root(&self) -> &Path { &self.root }

    /// Path of the raw chunk log.
    #[must_use]
    pub fn raw_log(&self) -> PathBuf { self.root.join(RAW_LOG) }

    /// Path of the CSV audit log.
    #[must_use]
    pub fn csv_log(&self) -> PathBuf { self.root.join(CSV_LOG) }

    /// Append `text` and a newline to `cdr.raw`.
    ///
    /// # Errors
    ///
    /// Propagates any I/O error from opening or writing the log.
    pub async fn append_raw(&self, text: &str) -> io::Result<()> {
        append_line(&self.raw_log(), text).await
    }

    /// Append `line` and a newline to `cdr.csv`.
    ///
    /// # Errors
    ///
    /// Propagates any I/O error from opening or writing the log.
    pub async fn append_csv(&self, line: &str) -> io::Result<()> {
        append_line(&self.csv_log(), line).await
    }

    /// Write `line` and a newline to a freshly named sender file.
    ///
    /// The name is `<unix-seconds><random integer in [0, unix-seconds]>`. A
    /// name that already exists is never reused; another random suffix is
    /// drawn instead.
    ///
    /// # Errors
    ///
    /// Returns [`io::ErrorKind::AlreadyExists`] if no free name was found,
    /// or any other I/O error from creating or writing the file.
    pub async fn write_sender_file(&self, line: &str) -> io::Result<PathBuf> {
        for _ in 0..NAME_ATTEMPTS {
            let path = self.root.join(sender_file_name(unix_seconds()));
            let mut file = match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            };
            file.write_all(format!("{line}\n").as_bytes()).await?;
            file.flush().await?;
            return Ok(path);
        }
        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("no free sender file name in {}", self.root.display()),
        ))
    }
}

async fn append_line(path: &Path, line: &str) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(format!("{line}\n").as_bytes()).await?;
    file.flush().await
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs())
}

/// Sender file name for the given timestamp.
pub(crate) fn sender_file_name(timestamp: u64) -> String {
    let suffix = rand::thread_rng().gen_range(0..=timestamp);
    format!("{timestamp}{suffix}")
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    use super::*;

    #[fixture]
    fn dir() -> TempDir { tempfile::tempdir().expect("create temp dir") }

    #[rstest]
    fn resolve_yields_absolute_path(dir: TempDir) {
        let storage = StorageLocation::resolve(dir.path()).expect("resolve storage");
        assert!(storage.root().is_absolute());
        assert_eq!(storage.raw_log().file_name().and_then(|n| n.to_str()), Some(RAW_LOG));
        assert_eq!(storage.csv_log().file_name().and_then(|n| n.to_str()), Some(CSV_LOG));
    }

    #[rstest]
    fn resolve_rejects_missing_directory(dir: TempDir) {
        assert!(StorageLocation::resolve(dir.path().join("missing")).is_err());
    }

    #[rstest]
    fn resolve_rejects_plain_file(dir: TempDir) {
        let file = dir.path().join("file");
        std::fs::write(&file, "x").expect("write file");
        let err = StorageLocation::resolve(&file).expect_err("file is not a directory");
        assert_eq!(err.kind(), io::ErrorKind::NotADirectory);
    }

    #[rstest]
    #[tokio::test]
    async fn appends_never_truncate(dir: TempDir) {
        let storage = StorageLocation::resolve(dir.path()).expect("resolve storage");
        storage.append_raw("first").await.expect("append");
        storage.append_raw("second").await.expect("append");
        storage.append_csv("a;b").await.expect("append");
        let raw = std::fs::read_to_string(storage.raw_log()).expect("read raw");
        let csv = std::fs::read_to_string(storage.csv_log()).expect("read csv");
        assert_eq!(raw, "first\nsecond\n");
        assert_eq!(csv, "a;b\n");
    }

    #[rstest]
    #[tokio::test]
    async fn sender_files_are_unique(dir: TempDir) {
        let storage = StorageLocation::resolve(dir.path()).expect("resolve storage");
        let first = storage.write_sender_file("one").await.expect("write");
        let second = storage.write_sender_file("two").await.expect("write");
        assert_ne!(first, second);
        assert_eq!(std::fs::read_to_string(&first).expect("read"), "one\n");
        assert_eq!(std::fs::read_to_string(&second).expect("read"), "two\n");
        assert_eq!(first.parent(), Some(storage.root()));
    }

    #[test]
    fn sender_file_name_starts_with_timestamp() {
        let name = sender_file_name(1_700_000_000);
        let suffix: u64 = name
            .strip_prefix("1700000000")
            .expect("timestamp prefix")
            .parse()
            .expect("numeric suffix");
        assert!(suffix <= 1_700_000_000);
    }

    #[test]
    fn sender_file_name_handles_epoch() {
        assert_eq!(sender_file_name(0), "00");
    }
}
