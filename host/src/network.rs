//! TCP side of the lobby host: accepting peers and queuing frames for them

use crate::peers::PeerTable;
use log::{debug, error, info, warn};
use shared::transport::{spawn_reader, spawn_writer, Outbound};
use shared::{ChannelId, Transport, TransportError, TransportEvent};
use std::io;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;

/// Events sent from the network tasks to the server loop
#[derive(Debug)]
pub enum NetworkEvent {
    /// A peer was accepted; its frames go through `outbound`. Nothing is
    /// read from it until the server answers on `admit`: `true` starts the
    /// reader, `false` closes the socket.
    Connected {
        channel: ChannelId,
        outbound: Outbound,
        admit: oneshot::Sender<bool>,
    },
    Transport(TransportEvent),
}

impl From<TransportEvent> for NetworkEvent {
    fn from(event: TransportEvent) -> Self {
        NetworkEvent::Transport(event)
    }
}

/// [`Transport`] over every accepted TCP peer
pub struct HostTransport {
    peers: PeerTable,
}

impl HostTransport {
    pub fn new(max_peers: usize) -> Self {
        Self {
            peers: PeerTable::new(max_peers),
        }
    }

    /// Takes ownership of an accepted peer's queue. Returns false when the
    /// lobby is full; the queue is dropped, which closes the connection.
    pub fn attach(&mut self, channel: ChannelId, outbound: Outbound) -> bool {
        self.peers.add(channel, outbound)
    }

    pub fn detach(&mut self, channel: &str) -> bool {
        self.peers.remove(channel)
    }

    pub fn peers(&self) -> &PeerTable {
        &self.peers
    }
}

impl Transport for HostTransport {
    fn send(&mut self, channel: &str, payload: &str) -> Result<(), TransportError> {
        self.peers.send(channel, payload)
    }
}

/// Binds the lobby listener and spawns the accept loop.
///
/// Every accepted stream gets a writer task and a [`NetworkEvent::Connected`]
/// carrying its queue. Its reader task only starts once the server admits
/// the peer, so the server always learns about a peer before any of its data
/// and a turned-away peer is never read from. Returns the bound address,
/// which doubles as the lobby id.
pub async fn listen(
    addr: &str,
    events: UnboundedSender<NetworkEvent>,
) -> io::Result<SocketAddr> {
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    info!("Lobby listening on {}", local_addr);

    tokio::spawn(async move {
        loop {
            let (stream, remote) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    continue;
                }
            };
            if let Err(e) = stream.set_nodelay(true) {
                warn!("Could not disable Nagle for {}: {}", remote, e);
            }

            let channel = remote.to_string();
            let (reader, writer) = stream.into_split();
            let outbound = spawn_writer(writer, channel.clone(), events.clone());
            let (admit, admitted) = oneshot::channel();
            if events
                .send(NetworkEvent::Connected {
                    channel: channel.clone(),
                    outbound,
                    admit,
                })
                .is_err()
            {
                info!("Server loop gone, stopping accept loop");
                break;
            }

            let events = events.clone();
            tokio::spawn(async move {
                match admitted.await {
                    Ok(true) => spawn_reader(reader, channel, events),
                    // Dropping the read half here, and the queue on the
                    // server side, closes the socket
                    _ => debug!("Closing connection from {}", channel),
                }
            });
        }
    });

    Ok(local_addr)
}

/// Convenience for callers that want the receiving half too
pub async fn listen_with_events(
    addr: &str,
) -> io::Result<(SocketAddr, UnboundedReceiver<NetworkEvent>)> {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let local_addr = listen(addr, tx).await?;
    Ok((local_addr, rx))
}
