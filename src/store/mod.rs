//! Device/session store.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::pairing::generate_pairing_keys;
use crate::types::Jid;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Device identity and keys for one linked device.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Our JID after pairing (None if not paired).
    pub id: Option<Jid>,
    pub lid: Option<Jid>,
    pub business_name: Option<String>,
    pub platform: Option<String>,
    /// Noise key pair (32 + 32 bytes).
    pub noise_key_pub: Option<[u8; 32]>,
    pub noise_key_priv: Option<[u8; 32]>,
    /// Identity key pair (32 + 32 bytes).
    pub identity_key_pub: Option<[u8; 32]>,
    pub identity_key_priv: Option<[u8; 32]>,
    /// Adv secret for pairing.
    pub adv_secret_key: Option<[u8; 32]>,
}

impl Device {
    /// Fresh, unpaired device with newly generated pairing keys.
    pub fn generate() -> Self {
        let keys = generate_pairing_keys();
        Self {
            noise_key_pub: Some(keys.noise_public),
            noise_key_priv: Some(keys.noise_private),
            identity_key_pub: Some(keys.identity_public),
            identity_key_priv: Some(keys.identity_private),
            adv_secret_key: Some(keys.adv_secret),
            ..Default::default()
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.id.is_some()
    }

    /// Whether the device carries the keys needed to show a pairing QR.
    pub fn has_pairing_keys(&self) -> bool {
        self.noise_key_pub.is_some()
            && self.identity_key_pub.is_some()
            && self.adv_secret_key.is_some()
    }
}

/// Store trait: persist and load device state.
#[async_trait]
pub trait DeviceStore: Send + Sync {
    /// Get the first (or only) device. Used to create a client.
    async fn get_first_device(&self) -> crate::Result<Option<Device>>;

    /// Get device by JID.
    async fn get_device(&self, jid: &Jid) -> crate::Result<Option<Device>>;

    /// Save device state (after pairing or key changes).
    async fn save(&self, device: &Device) -> crate::Result<()>;

    /// Delete device (logout).
    async fn delete(&self, jid: &Jid) -> crate::Result<()>;

    /// Get all paired devices.
    async fn get_all_devices(&self) -> crate::Result<Vec<Device>>;

    /// Get the first device, generating and saving a new unpaired one when the
    /// store is empty.
    async fn get_or_create_first_device(&self) -> crate::Result<Device> {
        if let Some(device) = self.get_first_device().await? {
            return Ok(device);
        }
        let device = Device::generate();
        self.save(&device).await?;
        tracing::info!("created new unpaired device identity");
        Ok(device)
    }
}

/// Alias for shared store (common usage).
pub type Store = Arc<dyn DeviceStore>;

/// Key used for a device that has not been paired yet.
pub(crate) const UNPAIRED_KEY: &str = "__first";

/// Storage key of a device: its JID, or the unpaired slot.
pub(crate) fn device_key(device: &Device) -> String {
    device
        .id
        .as_ref()
        .map(|j| j.to_string())
        .unwrap_or_else(|| UNPAIRED_KEY.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_device_is_unpaired_with_keys() {
        let device = Device::generate();
        assert!(!device.is_logged_in());
        assert!(device.has_pairing_keys());
        assert_eq!(device_key(&device), UNPAIRED_KEY);
    }

    #[tokio::test]
    async fn get_or_create_reuses_existing_device() {
        let store = MemoryStore::new();
        let first = store.get_or_create_first_device().await.unwrap();
        let second = store.get_or_create_first_device().await.unwrap();
        assert_eq!(first, second);
    }
}
