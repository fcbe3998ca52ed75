use std::fs::{File, create_dir_all};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub const DEBUG_DIR: &str = ".debug";

/// Best-effort scratch output for prompts and raw responses.
///
/// Writes never fail the caller: errors are logged and dropped.
#[derive(Debug, Clone, Default)]
pub struct DebugSink {
    dir: Option<PathBuf>,
}

impl DebugSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }

    /// The `.debug` directory next to `base`.
    pub fn in_dir(base: &Path) -> Self {
        Self::new(base.join(DEBUG_DIR))
    }

    pub fn disabled() -> Self {
        Self { dir: None }
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    pub fn write(&self, name: &str, content: &str) {
        let Some(dir) = &self.dir else {
            return;
        };
        if let Err(err) = write_file(dir, name, content) {
            log::warn!("Failed to write debug file {name}: {err}");
        }
    }
}

fn write_file(dir: &Path, name: &str, content: &str) -> io::Result<()> {
    create_dir_all(dir)?;
    let mut file = File::create(dir.join(name))?;
    file.write_all(content.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_into_created_directory() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DebugSink::in_dir(dir.path());
        sink.write("prompt", "hello");
        let written = std::fs::read_to_string(dir.path().join(DEBUG_DIR).join("prompt")).unwrap();
        assert_eq!(written, "hello");
    }

    #[test]
    fn failures_are_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();
        // The sink directory cannot be created under a regular file.
        DebugSink::new(blocker.join("debug")).write("prompt", "hello");
        DebugSink::disabled().write("prompt", "hello");
    }
}
