//! Room session lifecycle.
//!
//! [`SessionConnector`] owns at most one live room session. `connect` runs the
//! credential exchange, opens the room socket and spawns a session task that
//! feeds inbound frames into the [`ConversationStore`] and writes queued
//! outbound chat frames. Tearing a session down cancels that task and waits for
//! it, so nothing from a superseded session reaches the store afterwards.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::{SinkExt, StreamExt};
use room_protocol::{CLOSE_ABNORMAL, CLOSE_POLICY_VIOLATION, OutboundChat};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, tungstenite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::controls::RoomControls;
use crate::credential::CredentialExchange;
use crate::dispatch::{DispatchOutcome, dispatch_frame};
use crate::endpoints::Endpoints;
use crate::error::{SendError, SessionError, TransportError};
use crate::store::ConversationStore;

type RoomSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Bound on the closing handshake, whichever side starts it.
const CLOSE_GRACE: Duration = Duration::from_millis(500);
/// Bound on waiting for a cancelled session task before aborting it.
const TEARDOWN_GRACE: Duration = Duration::from_secs(2);

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionPhase {
    /// No room selected.
    #[default]
    Idle,
    Authenticating,
    Connecting,
    Open,
    /// The last attempt or session failed; see [`SessionStatus::error`].
    Faulted,
    Closed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStatus {
    pub phase: SessionPhase,
    /// Last user-facing error; cleared when a session opens.
    pub error: Option<String>,
}

impl SessionStatus {
    pub fn is_connected(&self) -> bool {
        self.phase == SessionPhase::Open
    }
}

/// The live half of a session, kept so it can be torn down.
struct ActiveSession {
    room_id: String,
    display_name: String,
    outbound: mpsc::Sender<String>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

pub struct SessionConnector {
    endpoints: Endpoints,
    credentials: CredentialExchange,
    controls: RoomControls,
    store: ConversationStore,
    status: Arc<watch::Sender<SessionStatus>>,
    outbound_capacity: usize,
    active: Option<ActiveSession>,
}

impl SessionConnector {
    pub fn new(config: &ClientConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        let store = ConversationStore::new();
        let (status, _rx) = watch::channel(SessionStatus::default());
        Ok(Self {
            endpoints: config.endpoints.clone(),
            credentials: CredentialExchange::new(http.clone(), &config.endpoints),
            controls: RoomControls::new(http, config.endpoints.clone(), store.clone()),
            store,
            status: Arc::new(status),
            outbound_capacity: config.outbound_queue.max(1),
            active: None,
        })
    }

    pub fn store(&self) -> ConversationStore {
        self.store.clone()
    }

    pub fn controls(&self) -> &RoomControls {
        &self.controls
    }

    pub fn status(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    pub fn current_status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    /// Room of the current session, if one was opened.
    pub fn room_id(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.room_id.as_str())
    }

    /// Open a session for `room_id` as `display_name`.
    ///
    /// Any previous session is torn down first, even when the new attempt
    /// fails. Connecting again to the room that is already open is a no-op.
    /// An empty `room_id` leaves the connector idle.
    pub async fn connect(&mut self, room_id: &str, display_name: &str) -> Result<(), SessionError> {
        if self.is_open_for(room_id, display_name) {
            debug!(room_id, "session already open");
            return Ok(());
        }
        self.disconnect().await;

        if room_id.is_empty() {
            warn!("no room id given; staying idle");
            self.publish(SessionPhase::Idle, None);
            return Ok(());
        }

        self.publish(SessionPhase::Authenticating, None);
        let credential = match self.credentials.issue(display_name).await {
            Ok(credential) => credential,
            Err(e) => {
                warn!(room_id, error = %e, "credential exchange failed");
                self.publish(SessionPhase::Faulted, Some(e.to_string()));
                return Err(e.into());
            }
        };
        self.store.update(|s| s.set_identity(&credential.token, &credential.username));

        self.publish(SessionPhase::Connecting, None);
        let url = self.endpoints.room_socket_url(room_id, &credential.token);
        let socket = match tokio_tungstenite::connect_async(url.as_str()).await {
            Ok((socket, _response)) => socket,
            Err(e) => {
                let err = TransportError::from_handshake(e);
                warn!(room_id, error = %err, "room socket handshake failed");
                self.publish(SessionPhase::Faulted, Some(err.to_string()));
                return Err(err.into());
            }
        };

        info!(room_id, username = %credential.username, "joined room");
        self.publish(SessionPhase::Open, None);

        let (outbound, outbound_rx) = mpsc::channel(self.outbound_capacity);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_session(
            socket,
            SessionLink {
                room_id: room_id.to_string(),
                store: self.store.clone(),
                status: self.status.clone(),
                outbound_rx,
                cancel: cancel.clone(),
            },
        ));
        self.active = Some(ActiveSession {
            room_id: room_id.to_string(),
            display_name: display_name.to_string(),
            outbound,
            cancel,
            task,
        });
        Ok(())
    }

    /// Close the current session and reset the conversation.
    ///
    /// Safe to call in any state. When this returns the session task has
    /// stopped, the store is back to its initial state and the phase is
    /// `Closed`.
    pub async fn disconnect(&mut self) {
        if let Some(mut active) = self.active.take() {
            debug!(room_id = %active.room_id, "tearing down room session");
            active.cancel.cancel();
            let joined = match tokio::time::timeout(TEARDOWN_GRACE, &mut active.task).await {
                Ok(joined) => joined,
                Err(_) => {
                    warn!(room_id = %active.room_id, "session task did not stop; aborting it");
                    active.task.abort();
                    (&mut active.task).await
                }
            };
            if let Some(e) = joined.err().filter(|e| !e.is_cancelled()) {
                warn!(error = %e, "session task ended abnormally");
            }
        }
        self.store.reset();
        self.publish(SessionPhase::Closed, None);
    }

    /// Queue a chat message for the open session.
    ///
    /// On failure the reason is also recorded as the session error.
    pub fn send(&self, text: &str) -> Result<(), SendError> {
        let result = self.enqueue(text);
        if let Err(e) = &result {
            warn!(error = %e, "chat message not sent");
            let message = e.to_string();
            self.status.send_modify(|s| s.error = Some(message));
        }
        result
    }

    fn enqueue(&self, text: &str) -> Result<(), SendError> {
        let phase = self.status.borrow().phase;
        let active = match (&self.active, phase) {
            (Some(active), SessionPhase::Open) => active,
            _ => return Err(SendError::NotConnected),
        };
        if text.trim().is_empty() {
            return Err(SendError::EmptyMessage);
        }
        let frame = OutboundChat::new(text)
            .to_frame()
            .map_err(|e| SendError::Encode(e.to_string()))?;
        active.outbound.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => SendError::NotConnected,
        })
    }

    fn is_open_for(&self, room_id: &str, display_name: &str) -> bool {
        let open = self.status.borrow().phase == SessionPhase::Open;
        open && self
            .active
            .as_ref()
            .is_some_and(|a| a.room_id == room_id && a.display_name == display_name)
    }

    fn publish(&self, phase: SessionPhase, error: Option<String>) {
        debug!(?phase, "session phase");
        self.status.send_replace(SessionStatus { phase, error });
    }
}

impl Drop for SessionConnector {
    fn drop(&mut self) {
        if let Some(active) = &self.active {
            active.cancel.cancel();
        }
    }
}

struct SessionLink {
    room_id: String,
    store: ConversationStore,
    status: Arc<watch::Sender<SessionStatus>>,
    outbound_rx: mpsc::Receiver<String>,
    cancel: CancellationToken,
}

async fn run_session(socket: RoomSocket, link: SessionLink) {
    let SessionLink {
        room_id,
        store,
        status,
        mut outbound_rx,
        cancel,
    } = link;
    let (mut ws_write, mut ws_read) = socket.split();

    let failure = loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                let close = tungstenite::Message::Close(Some(CloseFrame {
                    code: CloseCode::Normal,
                    reason: "client disconnect".into(),
                }));
                let _ = tokio::time::timeout(CLOSE_GRACE, async {
                    let _ = ws_write.send(close).await;
                    let _ = ws_write.close().await;
                })
                .await;
                return;
            }

            Some(frame) = outbound_rx.recv() => {
                if let Err(e) = ws_write.send(tungstenite::Message::Text(frame.into())).await {
                    break Some(TransportError::from_stream(e));
                }
            }

            incoming = ws_read.next() => {
                match incoming {
                    Some(Ok(tungstenite::Message::Text(text))) => {
                        apply_frame(&store, &room_id, text.as_str());
                    }
                    Some(Ok(tungstenite::Message::Binary(bytes))) => {
                        apply_frame(&store, &room_id, &String::from_utf8_lossy(&bytes));
                    }
                    Some(Ok(tungstenite::Message::Close(frame))) => {
                        let (code, reason) = match &frame {
                            Some(f) => (Some(u16::from(f.code)), f.reason.as_str()),
                            None => (None, ""),
                        };
                        let outcome = close_outcome(code, reason).err();
                        // Push out the close reply queued while reading.
                        let _ = tokio::time::timeout(CLOSE_GRACE, ws_write.flush()).await;
                        break outcome;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break Some(TransportError::from_stream(e)),
                    None => break Some(TransportError::Lost("unknown error".to_string())),
                }
            }
        }
    };

    match failure {
        Some(err) => {
            warn!(room_id, error = %err, "room session ended");
            status.send_replace(SessionStatus {
                phase: SessionPhase::Faulted,
                error: Some(err.to_string()),
            });
        }
        None => {
            info!(room_id, "room closed by server");
            status.send_replace(SessionStatus {
                phase: SessionPhase::Closed,
                error: None,
            });
        }
    }
}

fn apply_frame(store: &ConversationStore, room_id: &str, frame: &str) {
    let received_at = Utc::now();
    let mut outcome = DispatchOutcome::Applied;
    store.update(|s| outcome = dispatch_frame(s, frame, received_at));
    if outcome == DispatchOutcome::Malformed {
        debug!(room_id, "malformed frame recorded in log");
    }
}

/// Map a server close to the session outcome. `Ok` is a clean close.
fn close_outcome(code: Option<u16>, reason: &str) -> Result<(), TransportError> {
    let reason = (!reason.is_empty()).then(|| reason.to_string());
    match code {
        Some(CLOSE_POLICY_VIOLATION) => Err(TransportError::Rejected(
            reason.unwrap_or_else(|| "authentication error".to_string()),
        )),
        Some(CLOSE_ABNORMAL) => Err(TransportError::Lost(
            reason.unwrap_or_else(|| "unknown error".to_string()),
        )),
        _ => Ok(()),
    }
}
