//! Server network layer handling websocket connections and event dispatch

use crate::broadcast::{Broadcaster, GameMessage};
use crate::session::GameSession;
use crate::world::WorldData;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::{ClientEvent, ConnectionId, ProtocolError};
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    Connected {
        client_id: ConnectionId,
        addr: SocketAddr,
        outbound: mpsc::UnboundedSender<Message>,
    },
    TextReceived {
        client_id: ConnectionId,
        text: String,
    },
    Disconnected {
        client_id: ConnectionId,
    },
    Shutdown,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub max_clients: usize,
    /// Fixed RNG seed; a random one is used when absent
    pub seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_clients: 32,
            seed: None,
        }
    }
}

/// Main server coordinating connections and the game session
pub struct Server {
    listener: Option<TcpListener>,
    local_addr: SocketAddr,
    session: GameSession,
    max_clients: usize,
    outbound: HashMap<ConnectionId, mpsc::UnboundedSender<Message>>,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_rx: mpsc::UnboundedReceiver<GameMessage>,
    shutdown_tx: watch::Sender<bool>,
}

impl Server {
    pub async fn bind(
        addr: &str,
        world: WorldData,
        config: ServerConfig,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!("Server listening on ws://{}", local_addr);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (broadcaster, game_rx) = Broadcaster::new();
        let (shutdown_tx, _) = watch::channel(false);
        let session = match config.seed {
            Some(seed) => GameSession::with_seed(world, broadcaster, seed),
            None => GameSession::new(world, broadcaster),
        };

        Ok(Server {
            listener: Some(listener),
            local_addr,
            session,
            max_clients: config.max_clients,
            outbound: HashMap::new(),
            server_tx,
            server_rx,
            game_rx,
            shutdown_tx,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Handle for feeding messages (such as `Shutdown`) into the main loop
    pub fn message_sender(&self) -> mpsc::UnboundedSender<ServerMessage> {
        self.server_tx.clone()
    }

    /// Spawns task that accepts connections and assigns connection ids
    ///
    /// The task drops the listener as soon as the main loop stops.
    fn spawn_acceptor(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let listener = self.listener.take().ok_or("server is already running")?;
        let server_tx = self.server_tx.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let mut next_client_id: Option<ConnectionId> = Some(1);

            loop {
                let accepted = tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    accepted = listener.accept() => accepted,
                };

                match accepted {
                    Ok((stream, addr)) => {
                        let Some(client_id) = allocate_client_id(&mut next_client_id) else {
                            error!("Connection ids exhausted, refusing {}", addr);
                            continue;
                        };
                        tokio::spawn(Self::serve_connection(
                            stream,
                            addr,
                            client_id,
                            server_tx.clone(),
                        ));
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                    }
                }
            }

            debug!("Acceptor stopped");
        });

        Ok(())
    }

    /// Runs one websocket connection until either side closes it
    async fn serve_connection(
        stream: TcpStream,
        addr: SocketAddr,
        client_id: ConnectionId,
        server_tx: mpsc::UnboundedSender<ServerMessage>,
    ) {
        let ws_stream = match accept_async(stream).await {
            Ok(ws_stream) => ws_stream,
            Err(e) => {
                warn!("Websocket handshake with {} failed: {}", addr, e);
                return;
            }
        };

        let (mut sink, mut stream) = ws_stream.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

        // Single writer per connection keeps outbound events in emission order
        tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                if let Err(e) = sink.send(message).await {
                    debug!("Failed to send to client {}: {}", client_id, e);
                    break;
                }
            }
            let _ = sink.close().await;
        });

        if server_tx
            .send(ServerMessage::Connected {
                client_id,
                addr,
                outbound: outbound_tx,
            })
            .is_err()
        {
            return;
        }

        while let Some(frame) = stream.next().await {
            match frame {
                Ok(Message::Text(text)) => {
                    let message = ServerMessage::TextReceived {
                        client_id,
                        text: text.as_str().to_owned(),
                    };
                    if server_tx.send(message).is_err() {
                        break;
                    }
                }
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    debug!("Connection error from client {}: {}", client_id, e);
                    break;
                }
            }
        }

        let _ = server_tx.send(ServerMessage::Disconnected { client_id });
    }

    fn handle_connected(
        &mut self,
        client_id: ConnectionId,
        addr: SocketAddr,
        outbound: mpsc::UnboundedSender<Message>,
    ) {
        if self.outbound.len() >= self.max_clients {
            warn!(
                "Rejecting client {} from {}: server full ({} clients)",
                client_id, addr, self.max_clients
            );
            let _ = outbound.send(Message::Close(None));
            return;
        }

        info!("Client {} connected from {}", client_id, addr);
        self.outbound.insert(client_id, outbound);
        self.session.connect(client_id);
    }

    fn handle_text(&mut self, client_id: ConnectionId, text: &str) {
        if !self.outbound.contains_key(&client_id) {
            return;
        }

        match ClientEvent::from_json(text) {
            Ok(ClientEvent::Disconnect) => self.close_client(client_id),
            Ok(event) => {
                debug!("Client {} sent {}", client_id, event.name());
                self.session.handle_event(client_id, event);
            }
            Err(ProtocolError::UnknownEvent(name)) => {
                debug!("Ignoring unsupported event {} from client {}", name, client_id);
            }
            Err(e) => warn!("Rejected message from client {}: {}", client_id, e),
        }
    }

    /// Disconnect cleanup shared by transport close and explicit `disconnect`
    fn close_client(&mut self, client_id: ConnectionId) {
        if self.outbound.remove(&client_id).is_some() {
            info!("Client {} disconnected", client_id);
        }
        self.session.disconnect(client_id);
    }

    /// Fans queued game messages out to the per-connection writers
    fn flush_outbound(&mut self) {
        while let Ok(GameMessage { target, event }) = self.game_rx.try_recv() {
            let json = match event.to_json() {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to encode {} event: {}", event.name(), e);
                    continue;
                }
            };
            let frame = Message::text(json);

            for (client_id, outbound) in &self.outbound {
                if !target.includes(*client_id) {
                    continue;
                }
                if outbound.send(frame.clone()).is_err() {
                    debug!("Writer for client {} already closed", client_id);
                }
            }
        }
    }

    pub fn client_count(&self) -> usize {
        self.outbound.len()
    }

    /// Main server loop: one inbound message is handled to completion, then
    /// everything it produced is flushed before the next one is read.
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_acceptor()?;
        info!("Server started successfully");

        while let Some(message) = self.server_rx.recv().await {
            match message {
                ServerMessage::Connected {
                    client_id,
                    addr,
                    outbound,
                } => self.handle_connected(client_id, addr, outbound),
                ServerMessage::TextReceived { client_id, text } => {
                    self.handle_text(client_id, &text)
                }
                ServerMessage::Disconnected { client_id } => self.close_client(client_id),
                ServerMessage::Shutdown => {
                    info!("Server shutting down");
                    break;
                }
            }

            self.flush_outbound();
        }

        let _ = self.shutdown_tx.send(true);
        Ok(())
    }
}

/// Hands out the next connection id. Ids are never reused, so once `u32` is
/// used up every later call returns `None`.
fn allocate_client_id(next: &mut Option<ConnectionId>) -> Option<ConnectionId> {
    let id = (*next)?;
    *next = id.checked_add(1);
    Some(id)
}
