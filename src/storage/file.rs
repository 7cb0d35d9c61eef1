use log::debug;
use std::fs;
use std::io::ErrorKind;
use std::path::{ Path, PathBuf };

use super::{ KeyValueStore, StorageError };

/// One directory per origin, one file per key.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(escape_key(key))
    }
}

/// Maps a key to a portable file name; bytes outside `[A-Za-z0-9._-]` become `%XX`.
pub(crate) fn escape_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-' => out.push(byte as char),
            // a leading dot would hide the file and collide with temp files
            b'.' if !out.is_empty() => out.push('.'),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let target = self.path_for(key);
        let tmp = self.root.join(format!(".{}.tmp", escape_key(key)));
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &target)?;
        debug!("Wrote {} bytes to {}", value.len(), target.display());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
