//! Protocol client: connection lifecycle, pairing completion and sending.

mod recv;
mod send;

use crate::error::{Error, PairingError, SendError};
use crate::events::Event;
use crate::store::{Device, Store};
use crate::transport::{Connector, Transport};
use crate::types::{Jid, MessageId};
use async_trait::async_trait;
use prost::Message;
use sha2::Digest;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;

pub use recv::{PairSuccessNode, ServerFrame};
pub use send::{OutboundMessage, SendRequest, SendResponse, MESSAGE_TAG};

/// Default WebSocket URL for WhatsApp Web.
pub const DEFAULT_WS_URL: &str = "wss://web.whatsapp.com/ws";

/// Callback registered with [`ProtocolClient::add_event_handler`].
pub type EventHandler = Box<dyn Fn(Event) + Send + Sync>;

/// What the CLI needs from a WhatsApp connection.
///
/// Handlers may be invoked from any task the client dispatches events on.
#[async_trait]
pub trait ProtocolClient: Send + Sync {
    /// Register a handler called for every event.
    async fn add_event_handler(&self, handler: EventHandler);

    /// Connect to the servers. Emits [`Event::Qr`] when the device is unpaired.
    async fn connect(&self) -> crate::Result<()>;

    /// Close the connection. Safe to call when not connected.
    async fn disconnect(&self) -> crate::Result<()>;

    /// Send one message; returns once the transport has accepted it.
    async fn send_message(
        &self,
        to: &Jid,
        message: &OutboundMessage,
    ) -> crate::Result<SendResponse>;

    /// Whether the device identity is paired.
    fn is_logged_in(&self) -> bool;
}

/// Parameters for completing pairing after the QR code is scanned.
#[derive(Clone, Debug)]
pub struct CompletePairingParams<'a> {
    /// Raw device identity from server (payload, or payload || HMAC-SHA256 tag if verifying).
    pub device_identity_bytes: &'a [u8],
    pub business_name: &'a str,
    pub platform: &'a str,
    pub jid: Jid,
    pub lid: Jid,
    /// If set, device_identity_bytes is verified as payload || HMAC tag before use.
    pub hmac_key: Option<&'a [u8]>,
}

/// State shared between the client and its inbound reader task.
struct Session {
    store: Store,
    device: RwLock<Device>,
    handlers: RwLock<Vec<EventHandler>>,
    logged_in: AtomicBool,
}

impl Session {
    async fn dispatch_event(&self, evt: Event) {
        tracing::debug!(kind = evt.kind(), "dispatching event");
        let handlers = self.handlers.read().await;
        for f in handlers.iter() {
            f(evt.clone());
        }
    }

    async fn complete_pairing(&self, params: CompletePairingParams<'_>) -> crate::Result<()> {
        if let Some(key) = params.hmac_key {
            if let Err(e) = crate::pairing::verify_device_identity(params.device_identity_bytes, key) {
                tracing::warn!(jid = %params.jid, error = %e, "device identity rejected");
                self.dispatch_event(Event::PairError {
                    id: params.jid.clone(),
                    error: e.to_string(),
                })
                .await;
                return Err(e);
            }
        }

        let device = {
            let mut device = self.device.write().await;
            device.id = Some(params.jid.clone());
            device.lid = Some(params.lid.clone());
            device.business_name = Some(params.business_name.to_string());
            device.platform = Some(params.platform.to_string());
            device.clone()
        };
        self.store.save(&device).await?;
        self.logged_in.store(true, Ordering::SeqCst);
        tracing::info!(jid = %params.jid, "paired");
        self.dispatch_event(Event::PairSuccess {
            id: params.jid,
            lid: params.lid,
            business_name: params.business_name.to_string(),
            platform: params.platform.to_string(),
        })
        .await;
        Ok(())
    }

    /// Complete pairing from a server notification, verifying the device
    /// identity against our adv secret.
    async fn handle_pair_success(&self, node: PairSuccessNode) -> crate::Result<()> {
        let parse = |raw: &str| {
            raw.parse::<Jid>()
                .map_err(|e| PairingError::Protocol(format!("bad address {raw:?} in pair-success: {e}")))
        };
        let jid = parse(&node.jid)?;
        let lid = parse(&node.lid)?;
        let adv_secret = self.device.read().await.adv_secret_key;
        self.complete_pairing(CompletePairingParams {
            device_identity_bytes: &node.device_identity,
            business_name: &node.business_name,
            platform: &node.platform,
            jid,
            lid,
            hmac_key: adv_secret.as_ref().map(|k| k.as_slice()),
        })
        .await
    }
}

/// Client for the WhatsApp web multidevice API.
pub struct Client {
    session: Arc<Session>,
    connector: Arc<dyn Connector>,
    connected: AtomicBool,
    transport: RwLock<Option<Arc<dyn Transport>>>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl Client {
    /// Create a client for `device`, persisting changes to `store` and opening
    /// connections through `connector`.
    pub fn new(store: Store, device: Device, connector: Arc<dyn Connector>) -> Self {
        let logged_in = device.is_logged_in();
        Self {
            session: Arc::new(Session {
                store,
                device: RwLock::new(device),
                handlers: RwLock::new(Vec::new()),
                logged_in: AtomicBool::new(logged_in),
            }),
            connector,
            connected: AtomicBool::new(false),
            transport: RwLock::new(None),
            reader: Mutex::new(None),
        }
    }

    /// Whether the client is connected.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Get our JID if logged in.
    pub async fn get_own_id(&self) -> Option<Jid> {
        self.session.device.read().await.id.clone()
    }

    /// Generate a message ID (3EB0 + hex of hash).
    pub fn generate_message_id(&self) -> MessageId {
        use std::time::{SystemTime, UNIX_EPOCH};
        let mut data = Vec::with_capacity(8 + 20 + 16);
        let t = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        data.extend_from_slice(&t.to_be_bytes());
        data.extend_from_slice(b"@c.us");
        data.extend_from_slice(&rand::random::<[u8; 16]>());
        let hash = sha2::Sha256::digest(&data);
        format!("3EB0{}", hex::encode(&hash[..9]))
    }

    /// Record a successful pair: persist our JID and emit [`Event::PairSuccess`].
    ///
    /// If `params.hmac_key` is set, `params.device_identity_bytes` must carry a
    /// valid HMAC tag; otherwise [`Event::PairError`] is emitted and nothing is saved.
    /// The inbound reader calls this for every [`PairSuccessNode`].
    pub async fn complete_pairing(&self, params: CompletePairingParams<'_>) -> crate::Result<()> {
        self.session.complete_pairing(params).await
    }

    async fn recv_loop(session: Arc<Session>, mut inbound: mpsc::Receiver<Vec<u8>>) {
        while let Some(body) = inbound.recv().await {
            match ServerFrame::decode(body.as_slice()) {
                Ok(ServerFrame {
                    pair_success: Some(node),
                }) => {
                    if let Err(e) = session.handle_pair_success(node).await {
                        tracing::warn!(error = %e, "pair-success not applied");
                    }
                }
                Ok(_) => tracing::trace!(len = body.len(), "ignoring frame"),
                Err(e) => tracing::warn!(error = %e, "undecodable frame"),
            }
        }
        tracing::debug!("inbound stream closed");
    }
}

#[async_trait]
impl ProtocolClient for Client {
    async fn add_event_handler(&self, handler: EventHandler) {
        self.session.handlers.write().await.push(handler);
    }

    async fn connect(&self) -> crate::Result<()> {
        let connection = self.connector.connect().await?;
        *self.transport.write().await = Some(connection.transport);
        let reader = tokio::spawn(Self::recv_loop(self.session.clone(), connection.inbound));
        if let Some(old) = self.reader.lock().await.replace(reader) {
            old.abort();
        }
        self.connected.store(true, Ordering::SeqCst);

        if self.is_logged_in() {
            tracing::info!("connected with existing session");
            self.session.dispatch_event(Event::Connected).await;
        } else {
            let codes = crate::pairing::qr_codes(&*self.session.device.read().await)?;
            tracing::info!("connected without session, pairing required");
            self.session.dispatch_event(Event::Qr { codes }).await;
        }
        Ok(())
    }

    async fn disconnect(&self) -> crate::Result<()> {
        if let Some(reader) = self.reader.lock().await.take() {
            reader.abort();
        }
        let transport = self.transport.write().await.take();
        let was_connected = self.connected.swap(false, Ordering::SeqCst);
        if let Some(t) = transport {
            t.close().await?;
        }
        if was_connected {
            self.session
                .dispatch_event(Event::Disconnected {
                    reason: "client requested disconnect".into(),
                })
                .await;
        }
        Ok(())
    }

    async fn send_message(
        &self,
        to: &Jid,
        message: &OutboundMessage,
    ) -> crate::Result<SendResponse> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }
        if !self.is_logged_in() {
            return Err(Error::NotLoggedIn);
        }
        let transport = self
            .transport
            .read()
            .await
            .clone()
            .ok_or(Error::NotConnected)?;

        let id = self.generate_message_id();
        let request = SendRequest {
            id: id.clone(),
            to: to.to_string(),
            message: Some(message.clone()),
        };
        transport
            .send(&request.encode_to_vec())
            .await
            .map_err(|e| SendError::Transport(e.to_string()))?;
        tracing::debug!(%to, %id, "message handed to transport");

        Ok(SendResponse {
            timestamp: std::time::SystemTime::now(),
            id,
            sender: self.get_own_id().await,
        })
    }

    fn is_logged_in(&self) -> bool {
        self.session.logged_in.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConnectionError;
    use crate::store::{DeviceStore, MemoryStore};
    use crate::transport::Connection;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingTransport {
        frames: Mutex<Vec<Vec<u8>>>,
        closed: AtomicBool,
        fail: bool,
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn send(&self, data: &[u8]) -> crate::Result<()> {
            if self.fail {
                return Err(ConnectionError::Disconnected.into());
            }
            self.frames.lock().unwrap().push(data.to_vec());
            Ok(())
        }

        async fn close(&self) -> crate::Result<()> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FixedConnector(Arc<RecordingTransport>);

    #[async_trait]
    impl Connector for FixedConnector {
        async fn connect(&self) -> crate::Result<Connection> {
            Ok(Connection::send_only(self.0.clone()))
        }
    }

    /// Hands out one connection whose inbound frames the test pushes.
    struct ScriptedConnector {
        transport: Arc<RecordingTransport>,
        inbound: Mutex<Option<mpsc::Receiver<Vec<u8>>>>,
    }

    impl ScriptedConnector {
        fn new() -> (Self, mpsc::Sender<Vec<u8>>) {
            let (tx, rx) = mpsc::channel(8);
            let connector = Self {
                transport: Arc::default(),
                inbound: Mutex::new(Some(rx)),
            };
            (connector, tx)
        }
    }

    #[async_trait]
    impl Connector for ScriptedConnector {
        async fn connect(&self) -> crate::Result<Connection> {
            let transport: Arc<dyn Transport> = self.transport.clone();
            Ok(match self.inbound.lock().unwrap().take() {
                Some(rx) => Connection::new(transport, rx),
                None => Connection::send_only(transport),
            })
        }
    }

    struct RefusingConnector;

    #[async_trait]
    impl Connector for RefusingConnector {
        async fn connect(&self) -> crate::Result<Connection> {
            Err(ConnectionError::WebSocket("refused".into()).into())
        }
    }

    fn pair_success_frame(device: &Device, tamper: bool) -> Vec<u8> {
        let key = device.adv_secret_key.unwrap();
        let mut mac = <hmac::Hmac<sha2::Sha256> as hmac::Mac>::new_from_slice(&key).unwrap();
        hmac::Mac::update(&mut mac, b"device-identity");
        let mut identity = b"device-identity".to_vec();
        identity.extend_from_slice(&hmac::Mac::finalize(mac).into_bytes());
        if tamper {
            identity[0] ^= 1;
        }
        ServerFrame {
            pair_success: Some(PairSuccessNode {
                device_identity: identity,
                business_name: String::new(),
                platform: "android".into(),
                jid: "123@s.whatsapp.net".into(),
                lid: "0@lid".into(),
            }),
        }
        .encode_to_vec()
    }

    async fn wait_for_event(seen: &Arc<Mutex<Vec<Event>>>, pred: impl Fn(&Event) -> bool) {
        for _ in 0..100 {
            if seen.lock().unwrap().iter().any(&pred) {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("event not seen: {:?}", seen.lock().unwrap());
    }

    fn paired_device() -> Device {
        let mut dev = Device::generate();
        dev.id = Some(Jid::user("123"));
        dev
    }

    fn client_with(device: Device, transport: Arc<RecordingTransport>) -> (Client, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let client = Client::new(store.clone(), device, Arc::new(FixedConnector(transport)));
        (client, store)
    }

    async fn collect_events(client: &Client) -> Arc<Mutex<Vec<Event>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        client
            .add_event_handler(Box::new(move |evt| sink.lock().unwrap().push(evt)))
            .await;
        seen
    }

    #[test]
    fn generate_message_id_format() {
        let (client, _) = client_with(Device::generate(), Arc::default());
        let id = client.generate_message_id();
        assert!(id.starts_with("3EB0"));
        assert_eq!(id.len(), 4 + 18);
        assert!(id[4..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn connect_emits_qr_when_no_session() {
        let (client, _) = client_with(Device::generate(), Arc::default());
        let seen = collect_events(&client).await;
        client.connect().await.unwrap();

        let events = seen.lock().unwrap();
        assert!(matches!(&events[..], [Event::Qr { codes }] if codes.len() == crate::pairing::QR_CODE_COUNT));
        assert!(client.is_connected());
        assert!(!client.is_logged_in());
    }

    #[tokio::test]
    async fn connect_emits_connected_when_session_exists() {
        let (client, _) = client_with(paired_device(), Arc::default());
        let seen = collect_events(&client).await;
        client.connect().await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![Event::Connected]);
        assert!(client.is_logged_in());
    }

    #[tokio::test]
    async fn connect_failure_is_connection_error() {
        let store = Arc::new(MemoryStore::new());
        let client = Client::new(store, paired_device(), Arc::new(RefusingConnector));
        let err = client.connect().await.unwrap_err();
        assert!(matches!(err, Error::Connection(_)));
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn send_message_fails_when_not_connected() {
        let (client, _) = client_with(paired_device(), Arc::default());
        let res = client
            .send_message(&Jid::user("456"), &OutboundMessage::tagged("hello"))
            .await;
        assert!(matches!(res.unwrap_err(), Error::NotConnected));
    }

    #[tokio::test]
    async fn send_message_fails_when_not_paired() {
        let (client, _) = client_with(Device::generate(), Arc::default());
        client.connect().await.unwrap();
        let res = client
            .send_message(&Jid::user("456"), &OutboundMessage::tagged("hello"))
            .await;
        assert!(matches!(res.unwrap_err(), Error::NotLoggedIn));
    }

    #[tokio::test]
    async fn send_message_writes_one_frame() {
        let transport = Arc::new(RecordingTransport::default());
        let (client, _) = client_with(paired_device(), transport.clone());
        client.connect().await.unwrap();

        let to = Jid::user("456");
        let resp = client
            .send_message(&to, &OutboundMessage::tagged("hello"))
            .await
            .unwrap();
        assert_eq!(resp.sender, Some(Jid::user("123")));

        let frames = transport.frames.lock().unwrap();
        assert_eq!(frames.len(), 1);
        let req = SendRequest::decode(frames[0].as_slice()).unwrap();
        assert_eq!(req.id, resp.id);
        assert_eq!(req.to, "456@s.whatsapp.net");
        assert_eq!(req.message.unwrap().text(), "[wtc]hello");
    }

    #[tokio::test]
    async fn transport_failure_is_send_error() {
        let transport = Arc::new(RecordingTransport {
            fail: true,
            ..Default::default()
        });
        let (client, _) = client_with(paired_device(), transport);
        client.connect().await.unwrap();
        let err = client
            .send_message(&Jid::user("456"), &OutboundMessage::tagged("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Send(SendError::Transport(_))));
    }

    #[tokio::test]
    async fn disconnect_closes_transport_once() {
        let transport = Arc::new(RecordingTransport::default());
        let (client, _) = client_with(paired_device(), transport.clone());
        let seen = collect_events(&client).await;
        client.connect().await.unwrap();
        client.disconnect().await.unwrap();
        client.disconnect().await.unwrap();

        assert!(transport.closed.load(Ordering::SeqCst));
        assert!(!client.is_connected());
        let disconnects = seen
            .lock()
            .unwrap()
            .iter()
            .filter(|e| matches!(e, Event::Disconnected { .. }))
            .count();
        assert_eq!(disconnects, 1);
    }

    #[tokio::test]
    async fn complete_pairing_persists_identity() {
        let (client, store) = client_with(Device::generate(), Arc::default());
        let seen = collect_events(&client).await;
        client
            .complete_pairing(CompletePairingParams {
                device_identity_bytes: b"device-identity-payload",
                business_name: "Biz",
                platform: "Rust",
                jid: Jid::user("123"),
                lid: Jid::new("0", "lid"),
                hmac_key: None,
            })
            .await
            .unwrap();

        assert!(client.is_logged_in());
        let device = store.get_first_device().await.unwrap().unwrap();
        assert_eq!(device.id, Some(Jid::user("123")));
        assert!(device.has_pairing_keys());
        assert!(matches!(
            seen.lock().unwrap().last(),
            Some(Event::PairSuccess { platform, .. }) if platform == "Rust"
        ));
    }

    #[tokio::test]
    async fn complete_pairing_rejects_bad_hmac() {
        let (client, store) = client_with(Device::generate(), Arc::default());
        let seen = collect_events(&client).await;
        let err = client
            .complete_pairing(CompletePairingParams {
                device_identity_bytes: &[0u8; 40],
                business_name: "",
                platform: "",
                jid: Jid::user("123"),
                lid: Jid::new("0", "lid"),
                hmac_key: Some(b"key".as_slice()),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Pairing(_)));
        assert!(!client.is_logged_in());
        assert!(store.get_first_device().await.unwrap().is_none());
        assert!(matches!(
            seen.lock().unwrap().as_slice(),
            [Event::PairError { .. }]
        ));
    }

    #[tokio::test]
    async fn inbound_pair_success_completes_pairing() {
        let device = Device::generate();
        let frame = pair_success_frame(&device, false);
        let (connector, inbound) = ScriptedConnector::new();
        let store = Arc::new(MemoryStore::new());
        let client = Client::new(store.clone(), device, Arc::new(connector));
        let seen = collect_events(&client).await;
        client.connect().await.unwrap();
        assert!(!client.is_logged_in());

        inbound.send(ServerFrame::default().encode_to_vec()).await.unwrap();
        inbound.send(frame).await.unwrap();
        wait_for_event(&seen, |e| matches!(e, Event::PairSuccess { .. })).await;

        assert!(client.is_logged_in());
        assert_eq!(client.get_own_id().await, Some(Jid::user("123")));
        let saved = store.get_first_device().await.unwrap().unwrap();
        assert_eq!(saved.platform.as_deref(), Some("android"));
    }

    #[tokio::test]
    async fn inbound_pair_success_with_bad_hmac_is_rejected() {
        let device = Device::generate();
        let frame = pair_success_frame(&device, true);
        let (connector, inbound) = ScriptedConnector::new();
        let client = Client::new(Arc::new(MemoryStore::new()), device, Arc::new(connector));
        let seen = collect_events(&client).await;
        client.connect().await.unwrap();

        inbound.send(frame).await.unwrap();
        wait_for_event(&seen, |e| matches!(e, Event::PairError { .. })).await;
        assert!(!client.is_logged_in());
    }

    #[tokio::test]
    async fn disconnect_stops_inbound_reader() {
        let (connector, inbound) = ScriptedConnector::new();
        let client = Client::new(Arc::new(MemoryStore::new()), paired_device(), Arc::new(connector));
        client.connect().await.unwrap();
        client.disconnect().await.unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(1), inbound.closed())
            .await
            .expect("reader still holds the inbound stream");
    }
}
