//! Where encrypted block and attachment bytes live until upload.
//!
//! The catalog engine only ever talks to a [`ContentStage`], so the same code
//! path works against a temp directory or a plain in-memory map.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::{MailError, Result};

/// Byte storage keyed by content id.
pub trait ContentStage: Send + Sync {
    /// Store everything `data` yields under `id`, returning the byte count.
    fn write(&self, id: &str, data: &mut dyn Read) -> Result<u64>;

    /// Open the bytes stored under `id`.
    fn read(&self, id: &str) -> Result<Box<dyn Read + Send>>;

    /// Drop the bytes stored under `id`. Missing ids are not an error.
    fn remove(&self, id: &str) -> Result<()>;
}

fn check_id(id: &str) -> Result<()> {
    let ok = !id.is_empty()
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if ok {
        Ok(())
    } else {
        Err(MailError::invalid_format("content id", id))
    }
}

/// In-memory stage.
#[derive(Default)]
pub struct MemoryStage {
    items: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ContentStage for MemoryStage {
    fn write(&self, id: &str, data: &mut dyn Read) -> Result<u64> {
        check_id(id)?;
        let mut buf = Vec::new();
        let n = io::copy(data, &mut buf)?;
        let mut items = self
            .items
            .write()
            .map_err(|_| MailError::Storage("stage lock poisoned".to_string()))?;
        items.insert(id.to_string(), buf);
        Ok(n)
    }

    fn read(&self, id: &str) -> Result<Box<dyn Read + Send>> {
        let items = self
            .items
            .read()
            .map_err(|_| MailError::Storage("stage lock poisoned".to_string()))?;
        let bytes = items
            .get(id)
            .cloned()
            .ok_or_else(|| MailError::not_found("content", id))?;
        Ok(Box::new(Cursor::new(bytes)))
    }

    fn remove(&self, id: &str) -> Result<()> {
        let mut items = self
            .items
            .write()
            .map_err(|_| MailError::Storage("stage lock poisoned".to_string()))?;
        items.remove(id);
        Ok(())
    }
}

/// One file per id inside a directory.
pub struct DirStage {
    root: PathBuf,
}

impl DirStage {
    /// Use `root`, creating it if needed.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, id: &str) -> Result<PathBuf> {
        check_id(id)?;
        Ok(self.root.join(id))
    }
}

impl ContentStage for DirStage {
    fn write(&self, id: &str, data: &mut dyn Read) -> Result<u64> {
        let mut file = File::create(self.path(id)?)?;
        Ok(io::copy(data, &mut file)?)
    }

    fn read(&self, id: &str) -> Result<Box<dyn Read + Send>> {
        match File::open(self.path(id)?) {
            Ok(file) => Ok(Box::new(file)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(MailError::not_found("content", id))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn remove(&self, id: &str) -> Result<()> {
        match fs::remove_file(self.path(id)?) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(stage: &dyn ContentStage) {
        let n = stage.write("block-1", &mut &b"ciphertext"[..]).unwrap();
        assert_eq!(n, 10);

        let mut out = Vec::new();
        stage.read("block-1").unwrap().read_to_end(&mut out).unwrap();
        assert_eq!(out, b"ciphertext");

        stage.remove("block-1").unwrap();
        stage.remove("block-1").unwrap();
        assert!(stage.read("block-1").err().unwrap().is_not_found());
        assert!(stage.write("../escape", &mut &b""[..]).is_err());
    }

    #[test]
    fn test_memory_stage() {
        let stage = MemoryStage::new();
        exercise(&stage);
        assert!(stage.is_empty());
    }

    #[test]
    fn test_dir_stage() {
        let dir = tempfile::tempdir().unwrap();
        let stage = DirStage::new(dir.path().join("staged")).unwrap();
        exercise(&stage);
    }
}
