use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(pub u32);

#[derive(Debug, Clone)]
pub struct SourceFile {
    pub id: SourceId,
    pub path: PathBuf,
    pub contents: String,
}

impl SourceFile {
    pub fn new(id: SourceId, path: PathBuf, contents: String) -> Self {
        Self { id, path, contents }
    }

    /// Wraps in-memory text under a placeholder path.
    pub fn from_text<S: Into<String>>(contents: S) -> Self {
        Self::new(SourceId(0), PathBuf::from("<input>.yapl"), contents.into())
    }

    /// Returns the 1-based source line, if present.
    pub fn line(&self, line: usize) -> Option<&str> {
        self.contents.lines().nth(line.checked_sub(1)?)
    }
}
