//! Connected peer bookkeeping for the lobby host
//!
//! This module tracks the outbound queue of every accepted connection and
//! enforces the lobby's capacity. It is the only place that knows how a
//! channel id maps onto a live writer task.

use log::info;
use shared::transport::{queue_frame, Outbound};
use shared::{ChannelId, TransportError};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// One accepted connection
#[derive(Debug)]
pub struct Peer {
    /// Remote address, also used as the channel id
    pub channel: ChannelId,
    /// Queue feeding the connection's writer task
    pub outbound: Outbound,
    pub connected_at: Instant,
}

impl Peer {
    pub fn new(channel: ChannelId, outbound: Outbound) -> Self {
        Self {
            channel,
            outbound,
            connected_at: Instant::now(),
        }
    }

    /// How long this peer has been connected
    pub fn connected_for(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

/// All peers of one lobby, capped at `max_peers`
pub struct PeerTable {
    peers: HashMap<ChannelId, Peer>,
    max_peers: usize,
}

impl PeerTable {
    pub fn new(max_peers: usize) -> Self {
        Self {
            peers: HashMap::new(),
            max_peers,
        }
    }

    /// Registers a connection. Returns false when the lobby is full or the
    /// channel is already known; the caller drops the connection then.
    pub fn add(&mut self, channel: ChannelId, outbound: Outbound) -> bool {
        if self.is_full() || self.peers.contains_key(&channel) {
            return false;
        }

        info!("Peer {} connected", channel);
        self.peers
            .insert(channel.clone(), Peer::new(channel, outbound));
        true
    }

    /// Forgets a connection. Dropping its queue ends the writer task.
    pub fn remove(&mut self, channel: &str) -> bool {
        match self.peers.remove(channel) {
            Some(peer) => {
                info!(
                    "Peer {} disconnected after {:.1}s",
                    peer.channel,
                    peer.connected_for().as_secs_f32()
                );
                true
            }
            None => false,
        }
    }

    /// Queues one frame for a peer. A peer whose queue is full misses the
    /// frame; the next snapshot supersedes it.
    pub fn send(&self, channel: &str, payload: &str) -> Result<(), TransportError> {
        let peer = self
            .peers
            .get(channel)
            .ok_or_else(|| TransportError::UnknownChannel(channel.to_string()))?;
        queue_frame(&peer.outbound, channel, payload)
    }

    pub fn contains(&self, channel: &str) -> bool {
        self.peers.contains_key(channel)
    }

    pub fn is_full(&self) -> bool {
        self.peers.len() >= self.max_peers
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
