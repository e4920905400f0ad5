//! The send-once flow: connect, pair if needed, send, disconnect.

use crate::cli::Invocation;
use crate::client::{ProtocolClient, SendResponse};
use crate::config::Config;
use crate::dispatch::MessageDispatcher;
use crate::handler::PairingEventHandler;
use crate::render::QrRenderer;
use crate::store::{Device, DeviceStore, FileStore, Store};
use crate::waiter::{PairingSignal, PairingWaiter};
use crate::{Error, Result};
use std::path::Path;
use std::sync::Arc;

/// Open the session store at `path` and load its device identity.
///
/// A store that cannot be opened is [`Error::Store`]; a failure reading or
/// creating the identity is [`Error::Device`].
pub async fn open_session(path: &Path) -> Result<(Store, Device)> {
    let store = FileStore::open(path)
        .await
        .inspect_err(|e| tracing::error!(error = %e, "failed to open session store"))?;
    let device = load_device(&store).await?;
    Ok((Arc::new(store), device))
}

/// The first device in `store`, created and saved if there is none.
pub async fn load_device(store: &dyn DeviceStore) -> Result<Device> {
    store
        .get_or_create_first_device()
        .await
        .map_err(|e| match e {
            Error::Store(inner) => Error::Device(inner),
            other => other,
        })
        .inspect_err(|e| tracing::error!(error = %e, "failed to get device"))
}

/// Run one invocation against `client`.
///
/// The client is disconnected before returning on every path after a
/// successful connect, including pairing timeout and send failure.
pub async fn run(
    client: &dyn ProtocolClient,
    invocation: &Invocation,
    config: &Config,
    renderer: Arc<dyn QrRenderer>,
) -> Result<SendResponse> {
    let signal = PairingSignal::new();
    client
        .add_event_handler(PairingEventHandler::new(signal.clone(), renderer).into_event_handler())
        .await;

    if let Err(e) = client.connect().await {
        tracing::error!(error = %e, "failed to connect");
        return Err(e);
    }

    let result = send_once(client, &signal, invocation, config).await;

    if let Err(e) = client.disconnect().await {
        tracing::warn!(error = %e, "disconnect failed");
    }
    result
}

async fn send_once(
    client: &dyn ProtocolClient,
    signal: &PairingSignal,
    invocation: &Invocation,
    config: &Config,
) -> Result<SendResponse> {
    if !client.is_logged_in() {
        tracing::info!("not logged in, waiting for QR code scan");
        PairingWaiter::new(signal.clone(), config.pair_timeout)
            .with_strategy(config.wait_strategy)
            .wait_paired()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "pairing did not complete"))?;
    }

    let response = MessageDispatcher::new(client)
        .dispatch(&invocation.recipient, &invocation.text)
        .await
        .inspect_err(|e| tracing::error!(error = %e, "error sending message"))?;
    println!("Message sent to {}", invocation.recipient);

    if !config.settle_delay.is_zero() {
        tokio::time::sleep(config.settle_delay).await;
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::types::Jid;
    use async_trait::async_trait;

    struct BrokenStore;

    #[async_trait]
    impl DeviceStore for BrokenStore {
        async fn get_first_device(&self) -> Result<Option<Device>> {
            Err(StoreError::Load("disk on fire".into()).into())
        }

        async fn get_device(&self, _jid: &Jid) -> Result<Option<Device>> {
            Ok(None)
        }

        async fn save(&self, _device: &Device) -> Result<()> {
            Ok(())
        }

        async fn delete(&self, _jid: &Jid) -> Result<()> {
            Ok(())
        }

        async fn get_all_devices(&self) -> Result<Vec<Device>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn session_identity_is_reused_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let (_, first) = open_session(&path).await.unwrap();
        let (_, second) = open_session(&path).await.unwrap();
        assert!(!first.is_logged_in());
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn unopenable_store_is_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let err = open_session(&blocker.join("session.json")).await.err().expect("expected open_session to fail");
        assert!(matches!(err, Error::Store(StoreError::Open(_))), "{err}");
        assert_eq!(err.exit_code(), 1);
    }

    #[tokio::test]
    async fn store_read_failure_is_device_error() {
        let err = load_device(&BrokenStore).await.unwrap_err();
        assert!(matches!(err, Error::Device(StoreError::Load(_))), "{err}");
        assert!(err.to_string().starts_with("failed to get device"));
    }
}
