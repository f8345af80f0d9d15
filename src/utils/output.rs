// Output destinations for formatters

use std::fmt;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// In-memory sink shared between a formatter and whoever wants to read what it wrote
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded
    pub fn contents(&self) -> String {
        let bytes = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&bytes).into_owned()
    }

    fn ptr_eq(&self, other: &SharedBuffer) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// A live, writable sink a formatter renders into
#[derive(Clone)]
pub enum Output {
    Stdout,
    Stderr,
    File { path: PathBuf, file: Arc<Mutex<File>> },
    Buffer(SharedBuffer),
}

impl Output {
    /// Wrap an already opened file
    pub fn file(path: impl Into<PathBuf>, file: File) -> Self {
        Output::File {
            path: path.into(),
            file: Arc::new(Mutex::new(file)),
        }
    }

    /// Fresh in-memory output plus a handle to read it back
    pub fn buffer() -> (Self, SharedBuffer) {
        let buffer = SharedBuffer::new();
        (Output::Buffer(buffer.clone()), buffer)
    }

    /// Filesystem path, if this output is backed by a file
    pub fn path(&self) -> Option<&Path> {
        match self {
            Output::File { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Whether two outputs write to the same place
    pub fn is_same_destination(&self, other: &Output) -> bool {
        match (self, other) {
            (Output::Stdout, Output::Stdout) => true,
            (Output::Stderr, Output::Stderr) => true,
            (Output::File { path: a, .. }, Output::File { path: b, .. }) => a == b,
            (Output::Buffer(a), Output::Buffer(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Terminal outputs get colors, files and buffers never do
    pub fn is_terminal(&self) -> bool {
        match self {
            Output::Stdout => console::Term::stdout().is_term(),
            Output::Stderr => console::Term::stderr().is_term(),
            _ => false,
        }
    }

    pub fn write_str(&self, s: &str) -> io::Result<()> {
        match self {
            Output::Stdout => {
                let mut stdout = io::stdout().lock();
                stdout.write_all(s.as_bytes())?;
                stdout.flush()
            }
            Output::Stderr => {
                let mut stderr = io::stderr().lock();
                stderr.write_all(s.as_bytes())?;
                stderr.flush()
            }
            Output::File { file, .. } => {
                let mut file = file.lock().unwrap_or_else(PoisonError::into_inner);
                file.write_all(s.as_bytes())?;
                file.flush()
            }
            Output::Buffer(buffer) => {
                let mut bytes = buffer.0.lock().unwrap_or_else(PoisonError::into_inner);
                bytes.extend_from_slice(s.as_bytes());
                Ok(())
            }
        }
    }

    pub fn write_line(&self, line: &str) -> io::Result<()> {
        self.write_str(line)?;
        self.write_str("\n")
    }
}

impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Stdout => write!(f, "Output::Stdout"),
            Output::Stderr => write!(f, "Output::Stderr"),
            Output::File { path, .. } => write!(f, "Output::File({})", path.display()),
            Output::Buffer(_) => write!(f, "Output::Buffer"),
        }
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Stdout => write!(f, "<stdout>"),
            Output::Stderr => write!(f, "<stderr>"),
            Output::File { path, .. } => write!(f, "{}", path.display()),
            Output::Buffer(_) => write!(f, "<buffer>"),
        }
    }
}

/// Where a formatter should write: an open sink or a path still to be created
#[derive(Debug, Clone)]
pub enum Destination {
    Sink(Output),
    Path(PathBuf),
}

impl From<Output> for Destination {
    fn from(output: Output) -> Self {
        Destination::Sink(output)
    }
}

impl From<PathBuf> for Destination {
    fn from(path: PathBuf) -> Self {
        Destination::Path(path)
    }
}

impl From<&Path> for Destination {
    fn from(path: &Path) -> Self {
        Destination::Path(path.to_path_buf())
    }
}

impl From<&str> for Destination {
    fn from(path: &str) -> Self {
        Destination::Path(PathBuf::from(path))
    }
}

impl From<String> for Destination {
    fn from(path: String) -> Self {
        Destination::Path(PathBuf::from(path))
    }
}

/// Turns a destination path into an open output
pub trait OutputOpener: Send + Sync {
    fn open(&self, path: &Path) -> io::Result<Output>;
}

/// Creates the file (and any missing parent directories) on the local filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct FsOpener;

impl OutputOpener for FsOpener {
    fn open(&self, path: &Path) -> io::Result<Output> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        Ok(Output::file(path, file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fs_opener_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/report.txt");

        let output = FsOpener.open(&path).unwrap();
        output.write_line("hello").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello\n");
        assert_eq!(output.path(), Some(path.as_path()));
    }

    #[test]
    fn test_same_destination() {
        let (a, _) = Output::buffer();
        let (b, _) = Output::buffer();

        assert!(Output::Stdout.is_same_destination(&Output::Stdout));
        assert!(!Output::Stdout.is_same_destination(&Output::Stderr));
        assert!(a.is_same_destination(&a.clone()));
        assert!(!a.is_same_destination(&b));
    }

    #[test]
    fn test_file_outputs_compare_by_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let first = FsOpener.open(&path).unwrap();
        let second = FsOpener.open(&path).unwrap();

        assert!(first.is_same_destination(&second));
    }

    #[test]
    fn test_buffer_contents() {
        let (output, buffer) = Output::buffer();
        output.write_str("a").unwrap();
        output.write_line("b").unwrap();
        assert_eq!(buffer.contents(), "ab\n");
    }
}
