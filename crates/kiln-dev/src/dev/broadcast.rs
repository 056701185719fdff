//! Live browser connections keyed by route.
//!
//! Each connection is represented in the registry only by the sending half
//! of a channel. A per-connection pump task owns the transport, forwards
//! signals from the channel, and unsubscribes itself when the transport
//! closes. Broadcasting therefore never touches a socket directly.

use crate::error::TransportError;
use async_trait::async_trait;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Reply to a successful handshake.
pub const CONNECTED: &str = "Connected";

/// Signal telling a browser to reload its page.
pub const RELOAD: &str = "reload";

/// Pending signals buffered per connection.
const CLIENT_BUFFER: usize = 16;

/// Identifier assigned to each subscribed connection.
pub type ClientId = u64;

/// Bidirectional text channel to one browser.
#[async_trait]
pub trait ReloadTransport: Send {
    /// Next inbound message as text, or `None` once the peer closed.
    ///
    /// Binary frames are decoded lossily.
    async fn recv_text(&mut self) -> Result<Option<String>, TransportError>;

    async fn send_text(&mut self, text: &str) -> Result<(), TransportError>;
}

#[derive(Debug, Clone)]
struct Subscriber {
    id: ClientId,
    tx: mpsc::Sender<&'static str>,
}

/// Registry key for a route file.
pub fn route_key(route: &Path) -> String {
    route.to_string_lossy().into_owned()
}

/// Route -> live connections registry.
#[derive(Debug, Default)]
pub struct ReloadBroadcaster {
    clients: RwLock<FxHashMap<String, Vec<Subscriber>>>,
    next_client_id: AtomicU64,
}

impl ReloadBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection for `route`.
    ///
    /// # Returns
    ///
    /// Client ID and receiver for reload signals
    pub fn subscribe(
        &self,
        route: impl Into<String>,
    ) -> (ClientId, mpsc::Receiver<&'static str>) {
        let id = self.next_client_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(CLIENT_BUFFER);

        self.clients
            .write()
            .entry(route.into())
            .or_default()
            .push(Subscriber { id, tx });

        (id, rx)
    }

    /// Remove a connection. Unknown ids are ignored.
    pub fn unsubscribe(&self, route: &str, id: ClientId) {
        self.remove_clients(route, &[id]);
    }

    fn remove_clients(&self, route: &str, ids: &[ClientId]) {
        let mut clients = self.clients.write();
        if let Some(list) = clients.get_mut(route) {
            list.retain(|subscriber| !ids.contains(&subscriber.id));
            if list.is_empty() {
                clients.remove(route);
            }
        }
    }

    fn snapshot(&self, route: &str) -> Vec<Subscriber> {
        self.clients.read().get(route).cloned().unwrap_or_default()
    }

    /// Send [`RELOAD`] to every connection subscribed to one of `routes`.
    ///
    /// Never waits on a slow client: one whose buffer is full already has a
    /// reload queued and counts as delivered. Connections whose channel is
    /// closed are pruned afterwards. Routes with no subscribers are skipped.
    /// Returns the number of clients signalled.
    pub async fn broadcast<I, P>(&self, routes: I) -> usize
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut delivered = 0;

        for route in routes {
            let key = route_key(route.as_ref());
            let subscribers = self.snapshot(&key);
            if subscribers.is_empty() {
                continue;
            }

            let mut failed_ids = Vec::new();
            for subscriber in subscribers {
                match subscriber.tx.try_send(RELOAD) {
                    Ok(()) => delivered += 1,
                    // A full buffer already holds a reload for this client
                    Err(TrySendError::Full(_)) => {
                        tracing::trace!("Reload already pending for client {}", subscriber.id);
                        delivered += 1;
                    }
                    Err(TrySendError::Closed(_)) => failed_ids.push(subscriber.id),
                }
            }

            if !failed_ids.is_empty() {
                tracing::debug!("Pruning {} dead connections for {}", failed_ids.len(), key);
                self.remove_clients(&key, &failed_ids);
            }
        }

        delivered
    }

    /// Handshake with a new connection and start pumping signals to it.
    ///
    /// The first inbound message names the route. On success the client is
    /// answered with [`CONNECTED`] and subscribed, and a task takes over the
    /// transport until it closes. A failed handshake is logged and the
    /// connection dropped.
    pub async fn accept_connection<T>(self: &Arc<Self>, mut transport: T) -> Option<ClientId>
    where
        T: ReloadTransport + 'static,
    {
        let route = match transport.recv_text().await {
            Ok(Some(route)) => route,
            Ok(None) => {
                tracing::warn!(
                    "Reload handshake failed: {}",
                    TransportError::ClosedBeforeHandshake
                );
                return None;
            }
            Err(e) => {
                tracing::warn!("Reload handshake failed: {}", e);
                return None;
            }
        };

        // Subscribed before the reply so a client that saw CONNECTED cannot
        // miss a reload; signals queue until the pump starts.
        let (id, rx) = self.subscribe(route.clone());
        if let Err(e) = transport.send_text(CONNECTED).await {
            tracing::warn!("Reload handshake failed for {}: {}", route, e);
            self.unsubscribe(&route, id);
            return None;
        }

        tracing::info!("Client {} connected for {}", id, route);

        let broadcaster = Arc::clone(self);
        tokio::spawn(async move {
            pump(transport, rx).await;
            broadcaster.unsubscribe(&route, id);
            tracing::debug!("Client {} disconnected from {}", id, route);
        });

        Some(id)
    }

    /// Number of connections subscribed to `route`.
    pub fn subscriber_count(&self, route: &str) -> usize {
        self.clients.read().get(route).map_or(0, Vec::len)
    }

    /// Total number of subscribed connections.
    pub fn client_count(&self) -> usize {
        self.clients.read().values().map(Vec::len).sum()
    }
}

/// Forward signals until either side goes away. Inbound messages after the
/// handshake are ignored.
async fn pump<T: ReloadTransport>(mut transport: T, mut rx: mpsc::Receiver<&'static str>) {
    loop {
        tokio::select! {
            signal = rx.recv() => {
                let Some(signal) = signal else {
                    break;
                };
                if let Err(e) = transport.send_text(signal).await {
                    tracing::debug!("Dropping connection: {}", e);
                    break;
                }
            }
            inbound = transport.recv_text() => {
                match inbound {
                    Ok(Some(_)) => {}
                    Ok(None) => break,
                    Err(e) => {
                        tracing::debug!("Dropping connection: {}", e);
                        break;
                    }
                }
            }
        }
    }
}
