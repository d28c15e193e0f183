//! # Lobby Host Library
//!
//! The host opens a lobby, accepts peers over TCP and runs the only
//! authoritative copy of the game. Clients never simulate; they mirror the
//! snapshots the host shares after every tick.
//!
//! ## Core Responsibilities
//!
//! ### Lobby
//! Peers join by connecting to the lobby id (the listener address). The host
//! keeps the membership list, republishes it whenever someone joins, leaves
//! or renames, and starts the game once every peer reports it is staged.
//!
//! ### Authoritative Simulation
//! Every frame the host advances players, spawns power-ups, detects crashes
//! and pickups, and shares the result. Remote steering arrives as
//! `PLAYER_INPUT` messages and is applied to the player assigned to the
//! sending peer.
//!
//! ### Round Cycle
//! When at most one player is left the round ends; after a short pause a new
//! round starts with the same participants.
//!
//! ## Architecture Design
//!
//! ### Single Event Loop
//! Network tasks only do I/O. Accepted connections, frames and disconnects
//! reach one loop over an unbounded channel, and that loop alone owns the
//! session and the world, so nothing needs locking.
//!
//! ### Framed TCP
//! Messages travel as length-prefixed JSON frames. Snapshots carry whole
//! trails, which quickly outgrow a datagram.

pub mod network;
pub mod peers;
pub mod server;

pub use server::{Server, ServerConfig};
