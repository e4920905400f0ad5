use super::memory::DeviceTable;
use super::{Device, DeviceStore};
use crate::{error::StoreError, types::Jid, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Device store persisted as a JSON file.
///
/// The whole table is loaded on [`open`](FileStore::open) and rewritten on
/// every change: the new contents go to a sibling `.tmp` file which is then
/// renamed over the original.
pub struct FileStore {
    path: PathBuf,
    table: Mutex<DeviceTable>,
}

impl FileStore {
    /// Open (or prepare to create) the store at `path`.
    ///
    /// Missing parent directories are created. A missing file is an empty
    /// store; an unreadable or corrupt one is an error.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Open(format!("{}: {e}", parent.display())))?;
        }
        let table = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| StoreError::Open(format!("{}: {e}", path.display())))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => DeviceTable::default(),
            Err(e) => return Err(StoreError::Open(format!("{}: {e}", path.display())).into()),
        };
        tracing::debug!(path = %path.display(), "opened session store");
        Ok(Self {
            path,
            table: Mutex::new(table),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, table: &DeviceTable) -> Result<()> {
        let data =
            serde_json::to_vec_pretty(table).map_err(|e| StoreError::Save(e.to_string()))?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, &data)
            .await
            .map_err(|e| StoreError::Save(format!("{}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StoreError::Save(format!("{}: {e}", self.path.display())))?;
        Ok(())
    }
}

#[async_trait]
impl DeviceStore for FileStore {
    async fn get_first_device(&self) -> Result<Option<Device>> {
        Ok(self.table.lock().await.first())
    }

    async fn get_device(&self, jid: &Jid) -> Result<Option<Device>> {
        Ok(self.table.lock().await.get(jid))
    }

    async fn save(&self, device: &Device) -> Result<()> {
        let mut table = self.table.lock().await;
        let mut next = table.clone();
        next.insert(device);
        self.persist(&next).await?;
        *table = next;
        Ok(())
    }

    async fn delete(&self, jid: &Jid) -> Result<()> {
        let mut table = self.table.lock().await;
        let mut next = table.clone();
        next.remove(jid);
        self.persist(&next).await?;
        *table = next;
        Ok(())
    }

    async fn get_all_devices(&self) -> Result<Vec<Device>> {
        Ok(self.table.lock().await.paired())
    }
}
