//! WebSocket transport
//!
//! Accepts TCP connections, performs the WebSocket handshake and gives each
//! peer a [`ChannelConnection`]. A reader loop feeds text frames to the
//! [`MessageRouter`]; a writer task drains the peer's outbound queue so a slow
//! socket only ever delays its own frames.

use crate::config::ServerConfig;
use crate::connection::{ChannelConnection, ConnectionId, SharedConnection};
use crate::error::SignalingError;
use crate::handler::MessageRouter;
use crate::state::RoomRegistry;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::{WebSocketStream, accept_async};
use tracing::{debug, error, info, warn};

/// How long a closing connection gets to flush queued frames
const CLOSE_GRACE: Duration = Duration::from_secs(5);

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;

/// A bound signaling server
pub struct Server {
    listener: TcpListener,
    router: MessageRouter,
    send_timeout: Option<Duration>,
}

impl Server {
    /// Bind the listener with a fresh registry
    pub async fn bind(config: ServerConfig) -> Result<Self, SignalingError> {
        let registry = Arc::new(RoomRegistry::with_pruning(config.prune_empty_rooms));
        Self::bind_with_registry(config, registry).await
    }

    /// Bind the listener around an existing registry
    pub async fn bind_with_registry(
        config: ServerConfig,
        registry: Arc<RoomRegistry>,
    ) -> Result<Self, SignalingError> {
        let listener = TcpListener::bind(config.addr).await?;
        Ok(Self {
            listener,
            router: MessageRouter::new(registry),
            send_timeout: config.send_timeout,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, SignalingError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections forever
    pub async fn run(self) -> Result<(), SignalingError> {
        self.run_until(std::future::pending()).await
    }

    /// Accept connections until `shutdown` resolves.
    ///
    /// Connections already accepted keep running on their own tasks.
    pub async fn run_until(self, shutdown: impl Future<Output = ()>) -> Result<(), SignalingError> {
        tokio::pin!(shutdown);
        info!("Signaling server listening on {}", self.local_addr()?);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Signaling server shutting down");
                    return Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer_addr)) => {
                        tokio::spawn(handle_connection(
                            stream,
                            peer_addr,
                            self.router.clone(),
                            self.send_timeout,
                        ));
                    }
                    Err(e) => warn!("Failed to accept connection: {}", e),
                },
            }
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    router: MessageRouter,
    send_timeout: Option<Duration>,
) {
    let ws = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake with {} failed: {}", peer_addr, e);
            return;
        }
    };

    let id = ConnectionId::new();
    info!("Connection {} established from {}", id, peer_addr);

    let (sink, mut frames) = ws.split();
    let (connection, outbound) = ChannelConnection::new(id);
    let connection: SharedConnection = Arc::new(connection);
    let mut writer = tokio::spawn(write_loop(id, sink, outbound, send_timeout));
    let mut writer_done = false;

    let reason = loop {
        tokio::select! {
            frame = frames.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if let Ok(routed) = router.handle_message(&connection, text.as_str()) {
                        debug!("Routed frame from connection {}: {:?}", id, routed);
                    }
                }
                Some(Ok(Message::Binary(data))) => {
                    debug!("Ignoring {} byte binary frame from connection {}", data.len(), id);
                }
                Some(Ok(Message::Close(frame))) => break close_reason(frame),
                Some(Ok(_)) => {}
                Some(Err(e)) => break format!("read error: {e}"),
                None => break "stream ended".to_owned(),
            },
            written = &mut writer => {
                writer_done = true;
                break match written {
                    Ok(Ok(())) => "writer closed".to_owned(),
                    Ok(Err(e)) => format!("write error: {e}"),
                    Err(e) => format!("writer task failed: {e}"),
                };
            }
        }
    };

    router.handle_close(id, &reason);
    // With the registry entry gone this is the last sender, so the writer
    // drains what is queued and closes the socket.
    drop(connection);

    if !writer_done {
        match tokio::time::timeout(CLOSE_GRACE, &mut writer).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => debug!("Connection {} closed with write error: {}", id, e),
            Ok(Err(e)) => error!("Writer task for connection {} failed: {}", id, e),
            Err(_) => {
                warn!("Connection {} did not flush within {:?}", id, CLOSE_GRACE);
                writer.abort();
            }
        }
    }
}

async fn write_loop(
    id: ConnectionId,
    mut sink: WsSink,
    mut outbound: mpsc::UnboundedReceiver<String>,
    send_timeout: Option<Duration>,
) -> Result<(), SignalingError> {
    while let Some(text) = outbound.recv().await {
        let send = sink.send(Message::text(text));
        match send_timeout {
            Some(limit) => tokio::time::timeout(limit, send).await.map_err(|_| {
                SignalingError::SendError(format!(
                    "write to connection {id} timed out after {limit:?}"
                ))
            })??,
            None => send.await?,
        }
    }

    // Peer may already be gone
    let _ = sink.close().await;
    Ok(())
}

fn close_reason(frame: Option<CloseFrame>) -> String {
    match frame {
        Some(frame) => format!("{} {}", u16::from(frame.code), frame.reason.as_str()),
        None => "closed without status".to_owned(),
    }
}
