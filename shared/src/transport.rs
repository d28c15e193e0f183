//! Peer channel abstraction and the stream framing behind it
//!
//! The session layer only sees [`Transport::send`] and a stream of
//! [`TransportEvent`]s. Concrete transports run one reader and one writer task
//! per stream ([`spawn_reader`], [`spawn_writer`]) and forward everything they
//! observe to the task that owns the session.

use crate::error::TransportError;
use log::{debug, warn};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Identity of a peer channel; the remote address for TCP transports
pub type ChannelId = String;

/// Largest payload accepted in a single frame
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Frames a connection may have waiting before further sends are refused
pub const OUTBOUND_QUEUE_LEN: usize = 64;

/// Queue feeding one connection's writer task
pub type Outbound = mpsc::Sender<Vec<u8>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The host is reachable under this lobby id
    RendezvousOpened(String),
    Opened { channel: ChannelId },
    Data { channel: ChannelId, payload: String },
    Closed { channel: ChannelId },
    Error { channel: ChannelId, reason: String },
}

impl TransportEvent {
    pub fn channel(&self) -> Option<&str> {
        match self {
            TransportEvent::RendezvousOpened(_) => None,
            TransportEvent::Opened { channel }
            | TransportEvent::Data { channel, .. }
            | TransportEvent::Closed { channel }
            | TransportEvent::Error { channel, .. } => Some(channel),
        }
    }
}

/// Outbound half of a peer transport
pub trait Transport {
    /// Queues `payload` for one channel. Delivery is not confirmed.
    fn send(&mut self, channel: &str, payload: &str) -> Result<(), TransportError>;
}

/// Writes one frame: a big-endian `u32` length followed by the payload
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() > MAX_FRAME_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame of {} bytes exceeds {}", payload.len(), MAX_FRAME_LEN),
        ));
    }
    writer.write_u32(payload.len() as u32).await?;
    writer.write_all(payload).await?;
    writer.flush().await
}

/// Reads one frame. `Ok(None)` means the peer closed the stream.
pub async fn read_frame<R>(reader: &mut R) -> io::Result<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let len = match reader.read_u32().await {
        Ok(len) => len as usize,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    };
    if len > MAX_FRAME_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame of {} bytes exceeds {}", len, MAX_FRAME_LEN),
        ));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(Some(payload))
}

/// Queues one frame without waiting. A full queue means the peer is not
/// keeping up; the frame is refused rather than buffered.
pub fn queue_frame(
    outbound: &Outbound,
    channel: &str,
    payload: &str,
) -> Result<(), TransportError> {
    outbound
        .try_send(payload.as_bytes().to_vec())
        .map_err(|e| match e {
            TrySendError::Full(_) => TransportError::QueueFull(channel.to_string()),
            TrySendError::Closed(_) => TransportError::ChannelClosed(channel.to_string()),
        })
}

/// Spawns the task draining queued frames into `writer`.
///
/// The queue holds at most [`OUTBOUND_QUEUE_LEN`] frames. A frame over
/// [`MAX_FRAME_LEN`] is dropped with a warning and the connection stays up;
/// any other write failure is reported on `events` as
/// [`TransportEvent::Error`]. Dropping every clone of the returned sender
/// shuts the write half down.
pub fn spawn_writer<W, E>(
    mut writer: W,
    channel: ChannelId,
    events: mpsc::UnboundedSender<E>,
) -> Outbound
where
    W: AsyncWrite + Unpin + Send + 'static,
    E: From<TransportEvent> + Send + 'static,
{
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<Vec<u8>>(OUTBOUND_QUEUE_LEN);

    tokio::spawn(async move {
        while let Some(payload) = outbound_rx.recv().await {
            if payload.len() > MAX_FRAME_LEN {
                warn!(
                    "Dropping {} byte frame for {}, limit is {}",
                    payload.len(),
                    channel,
                    MAX_FRAME_LEN
                );
                continue;
            }
            if let Err(e) = write_frame(&mut writer, &payload).await {
                warn!("Failed to write to {}: {}", channel, e);
                let _ = events.send(E::from(TransportEvent::Error {
                    channel: channel.clone(),
                    reason: e.to_string(),
                }));
                return;
            }
        }
        let _ = writer.shutdown().await;
        debug!("Writer for {} finished", channel);
    });

    outbound_tx
}

/// Spawns the task turning frames from `reader` into
/// [`TransportEvent::Data`]. End of stream is reported as `Closed`, a read
/// failure as `Error`; either one ends the task.
pub fn spawn_reader<R, E>(mut reader: R, channel: ChannelId, events: mpsc::UnboundedSender<E>)
where
    R: AsyncRead + Unpin + Send + 'static,
    E: From<TransportEvent> + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            let event = match read_frame(&mut reader).await {
                Ok(Some(frame)) => match String::from_utf8(frame) {
                    Ok(payload) => TransportEvent::Data {
                        channel: channel.clone(),
                        payload,
                    },
                    Err(_) => {
                        warn!("Dropping non UTF-8 frame from {}", channel);
                        continue;
                    }
                },
                Ok(None) => {
                    let _ = events.send(E::from(TransportEvent::Closed {
                        channel: channel.clone(),
                    }));
                    break;
                }
                Err(e) => {
                    let _ = events.send(E::from(TransportEvent::Error {
                        channel: channel.clone(),
                        reason: e.to_string(),
                    }));
                    break;
                }
            };

            if events.send(E::from(event)).is_err() {
                debug!("Event loop gone, stopping reader for {}", channel);
                break;
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_write_frame_prefixes_length() {
        let mut mock = Builder::new().write(&[0, 0, 0, 5]).write(b"hello").build();
        write_frame(&mut mock, b"hello").await.unwrap();
    }

    #[tokio::test]
    async fn test_read_frames_until_eof() {
        let mut mock = Builder::new()
            .read(&[0, 0, 0, 2])
            .read(b"hi")
            .read(&[0, 0, 0, 3])
            .read(b"you")
            .build();

        assert_eq!(read_frame(&mut mock).await.unwrap(), Some(b"hi".to_vec()));
        assert_eq!(read_frame(&mut mock).await.unwrap(), Some(b"you".to_vec()));
        assert_eq!(read_frame(&mut mock).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_empty_frame() {
        let mut mock = Builder::new().read(&[0, 0, 0, 0]).build();
        assert_eq!(read_frame(&mut mock).await.unwrap(), Some(Vec::new()));
    }

    #[tokio::test]
    async fn test_oversized_frame_is_rejected() {
        let len = (MAX_FRAME_LEN as u32 + 1).to_be_bytes();
        let mut mock = Builder::new().read(&len).build();
        let err = read_frame(&mut mock).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);

        let mut sink = Builder::new().build();
        let payload = vec![0u8; MAX_FRAME_LEN + 1];
        let err = write_frame(&mut sink, &payload).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn test_truncated_frame_is_an_error() {
        let mut mock = Builder::new().read(&[0, 0, 0, 10]).read(b"short").build();
        let err = read_frame(&mut mock).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn test_connection_tasks_forward_frames() {
        let (local, mut remote) = tokio::io::duplex(1024);
        let (read_half, write_half) = tokio::io::split(local);
        let (events_tx, mut events_rx) = mpsc::unbounded_channel::<TransportEvent>();
        let outbound = spawn_writer(write_half, "peer".to_string(), events_tx.clone());
        spawn_reader(read_half, "peer".to_string(), events_tx);

        queue_frame(&outbound, "peer", "ping").unwrap();
        assert_eq!(read_frame(&mut remote).await.unwrap(), Some(b"ping".to_vec()));

        write_frame(&mut remote, b"pong").await.unwrap();
        assert_eq!(
            events_rx.recv().await,
            Some(TransportEvent::Data {
                channel: "peer".into(),
                payload: "pong".into()
            })
        );

        drop(remote);
        assert_eq!(
            events_rx.recv().await,
            Some(TransportEvent::Closed {
                channel: "peer".into()
            })
        );
    }

    #[tokio::test]
    async fn test_oversized_outbound_frame_keeps_connection() {
        let (local, mut remote) = tokio::io::duplex(64 * 1024);
        let (events_tx, mut events_rx) = mpsc::unbounded_channel::<TransportEvent>();
        let outbound = spawn_writer(local, "peer".to_string(), events_tx);

        outbound.send(vec![b'x'; MAX_FRAME_LEN + 1]).await.unwrap();
        queue_frame(&outbound, "peer", "after").unwrap();

        assert_eq!(read_frame(&mut remote).await.unwrap(), Some(b"after".to_vec()));
        assert!(events_rx.try_recv().is_err());
    }

    #[test]
    fn test_full_queue_refuses_frames() {
        let (outbound, mut rx) = mpsc::channel(2);
        queue_frame(&outbound, "slow", "1").unwrap();
        queue_frame(&outbound, "slow", "2").unwrap();
        assert!(matches!(
            queue_frame(&outbound, "slow", "3"),
            Err(TransportError::QueueFull(_))
        ));

        assert_eq!(rx.try_recv().unwrap(), b"1".to_vec());
        queue_frame(&outbound, "slow", "3").unwrap();

        drop(rx);
        assert!(matches!(
            queue_frame(&outbound, "slow", "4"),
            Err(TransportError::ChannelClosed(_))
        ));
    }

    #[test]
    fn test_event_channel() {
        let event = TransportEvent::Data {
            channel: "a".into(),
            payload: "{}".into(),
        };
        assert_eq!(event.channel(), Some("a"));
        assert_eq!(TransportEvent::RendezvousOpened("x".into()).channel(), None);
    }
}
