use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use zeroize::Zeroizing;

use super::KeyValueStore;
use crate::error::{StorageFault, StorageOp};

/// JSON object on disk, replaced whole on every write.
///
/// A write lands in an owner-only sibling `.tmp` file, is synced, and is
/// renamed over the target, so readers see either the old map or the new one
/// and a successful `set` survives a crash.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self, op: StorageOp) -> Result<BTreeMap<String, String>, StorageFault> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(StorageFault::new(
                    op,
                    format!("read {}: {e}", self.path.display()),
                ))
            }
        };
        if bytes.is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_slice(&bytes)
            .map_err(|e| StorageFault::new(op, format!("parse {}: {e}", self.path.display())))
    }

    async fn persist(
        &self,
        entries: &BTreeMap<String, String>,
        op: StorageOp,
    ) -> Result<(), StorageFault> {
        let data = Zeroizing::new(
            serde_json::to_vec_pretty(entries)
                .map_err(|e| StorageFault::new(op, format!("encode {}: {e}", self.path.display())))?,
        );
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || replace_file(&path, &data))
            .await
            .map_err(|e| StorageFault::new(op, format!("write task: {e}")))?
            .map_err(|e| StorageFault::new(op, format!("write {}: {e}", self.path.display())))
    }
}

/// Writes `data` to a 0600 sibling temp file, fsyncs it, renames it over
/// `target` and fsyncs the directory. The temp file never outlives a failure.
fn replace_file(target: &Path, data: &[u8]) -> io::Result<()> {
    let parent = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)?;
    let tmp = target.with_extension("json.tmp");
    // A leftover from a crash may carry looser permissions; start fresh.
    match fs::remove_file(&tmp) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    let staged = write_synced(&tmp, data).and_then(|()| fs::rename(&tmp, target));
    if let Err(e) = staged {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    #[cfg(unix)]
    {
        if let Ok(dir) = OpenOptions::new().read(true).open(&parent) {
            let _ = dir.sync_all();
        }
    }
    Ok(())
}

fn write_synced(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(data)?;
    file.sync_all()
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageFault> {
        let mut entries = self.load(StorageOp::Get).await?;
        Ok(entries.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageFault> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.load(StorageOp::Set).await?;
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries, StorageOp::Set).await
    }

    async fn delete(&self, key: &str) -> Result<(), StorageFault> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.load(StorageOp::Delete).await?;
        if entries.remove(key).is_none() {
            return Ok(());
        }
        self.persist(&entries, StorageOp::Delete).await
    }
}
