use std::{
    fmt::Write as _,
    io,
    path::{Path, PathBuf},
};

use anyhow::{Context as _, bail};

use crate::store::StorageBackend;

/// One file per key under a data directory.
///
/// Key bytes outside `[A-Za-z0-9._-]` are written as `%XX`, so any key maps to
/// a single flat file name.
#[derive(Debug, Clone)]
pub struct LocalFs {
    root: PathBuf,
}

// Implementations

impl LocalFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Platform data directory for this crate, if the OS reports one.
    #[cfg(feature = "project_dir")]
    pub fn project_default() -> Option<Self> {
        crate::base::PROJECT_DIRS
            .as_ref()
            .map(|dirs| Self::new(dirs.data_dir()))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, key: &str) -> PathBuf {
        self.root.join(file_name(key))
    }
}

impl StorageBackend for LocalFs {
    fn get_item(&self, key: &str) -> anyhow::Result<Option<String>> {
        let path = self.path(key);

        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("failed to read {path:?}")),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> anyhow::Result<()> {
        if !self.root.exists() {
            std::fs::create_dir_all(&self.root)
                .with_context(|| format!("failed to create {:?}", self.root))?;
        } else if !self.root.is_dir() {
            bail!("storage root exists but is not a directory: {:?}", self.root);
        }

        let path = self.path(key);
        let staging = path.with_extension("json.tmp");

        std::fs::write(&staging, value).with_context(|| format!("failed to write {staging:?}"))?;
        std::fs::rename(&staging, &path).with_context(|| format!("failed to replace {path:?}"))?;

        Ok(())
    }

    fn remove_item(&self, key: &str) -> anyhow::Result<()> {
        let path = self.path(key);

        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("failed to remove {path:?}")),
        }
    }
}

fn file_name(key: &str) -> String {
    let mut name = String::with_capacity(key.len() + 5);

    for byte in key.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'.' | b'_' | b'-' => name.push(byte as char),
            _ => {
                let _ = write!(name, "%{byte:02X}");
            }
        }
    }

    name.push_str(".json");
    name
}
