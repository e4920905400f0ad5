use super::{device_key, Device, DeviceStore, UNPAIRED_KEY};
use crate::{error::StoreError, types::Jid, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// Devices keyed by JID plus a pointer to the first one.
///
/// Shared by [`MemoryStore`] and the on-disk [`FileStore`](super::FileStore),
/// which serializes it as JSON.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub(crate) struct DeviceTable {
    devices: HashMap<String, Device>,
    first: Option<String>,
}

impl DeviceTable {
    pub(crate) fn first(&self) -> Option<Device> {
        let key = self.first.as_deref().unwrap_or(UNPAIRED_KEY);
        self.devices.get(key).cloned()
    }

    pub(crate) fn get(&self, jid: &Jid) -> Option<Device> {
        self.devices.get(&jid.to_string()).cloned()
    }

    pub(crate) fn insert(&mut self, device: &Device) {
        let key = device_key(device);
        if device.is_logged_in() {
            // A paired device supersedes the unpaired slot it was created from.
            self.devices.remove(UNPAIRED_KEY);
            self.first = Some(key.clone());
        }
        self.devices.insert(key, device.clone());
    }

    pub(crate) fn remove(&mut self, jid: &Jid) {
        let key = jid.to_string();
        self.devices.remove(&key);
        if self.first.as_deref() == Some(key.as_str()) {
            self.first = self
                .devices
                .iter()
                .filter(|(_, d)| d.is_logged_in())
                .map(|(k, _)| k)
                .min()
                .cloned();
        }
    }

    pub(crate) fn paired(&self) -> Vec<Device> {
        self.devices
            .values()
            .filter(|d| d.is_logged_in())
            .cloned()
            .collect()
    }
}

/// In-memory device store (for testing or single-run; not persistent).
#[derive(Default)]
pub struct MemoryStore {
    table: RwLock<DeviceTable>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeviceStore for MemoryStore {
    async fn get_first_device(&self) -> Result<Option<Device>> {
        let table = self
            .table
            .read()
            .map_err(|e| StoreError::Load(e.to_string()))?;
        Ok(table.first())
    }

    async fn get_device(&self, jid: &Jid) -> Result<Option<Device>> {
        let table = self
            .table
            .read()
            .map_err(|e| StoreError::Load(e.to_string()))?;
        Ok(table.get(jid))
    }

    async fn save(&self, device: &Device) -> Result<()> {
        self.table
            .write()
            .map_err(|e| StoreError::Save(e.to_string()))?
            .insert(device);
        Ok(())
    }

    async fn delete(&self, jid: &Jid) -> Result<()> {
        self.table
            .write()
            .map_err(|e| StoreError::Save(e.to_string()))?
            .remove(jid);
        Ok(())
    }

    async fn get_all_devices(&self) -> Result<Vec<Device>> {
        let table = self
            .table
            .read()
            .map_err(|e| StoreError::Load(e.to_string()))?;
        Ok(table.paired())
    }
}
