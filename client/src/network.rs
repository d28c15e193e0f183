//! TCP connection to the lobby host

use log::info;
use shared::transport::{queue_frame, spawn_reader, spawn_writer, Outbound};
use shared::{ChannelId, Transport, TransportError, TransportEvent};
use std::io;
use tokio::net::TcpStream;
use tokio::sync::mpsc::UnboundedSender;

/// [`Transport`] with exactly one channel: the host
pub struct ClientTransport {
    channel: ChannelId,
    outbound: Outbound,
}

impl ClientTransport {
    /// Connects to the lobby at `addr`.
    ///
    /// `TransportEvent::Opened` is queued on `events` before the reader task
    /// starts, so the session sees the channel before any host message.
    pub async fn connect(
        addr: &str,
        events: UnboundedSender<TransportEvent>,
    ) -> io::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let channel = stream.peer_addr()?.to_string();
        info!("Connected to lobby {}", channel);

        let (reader, writer) = stream.into_split();
        let outbound = spawn_writer(writer, channel.clone(), events.clone());
        let _ = events.send(TransportEvent::Opened {
            channel: channel.clone(),
        });
        spawn_reader(reader, channel.clone(), events);

        Ok(Self { channel, outbound })
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }
}

impl Transport for ClientTransport {
    fn send(&mut self, channel: &str, payload: &str) -> Result<(), TransportError> {
        if channel != self.channel {
            return Err(TransportError::UnknownChannel(channel.to_string()));
        }
        queue_frame(&self.outbound, channel, payload)
    }
}
