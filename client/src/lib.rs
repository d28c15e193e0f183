//! # Lobby Client Library
//!
//! A client joins a host's lobby and mirrors the game the host runs. It
//! never simulates on its own: every world change arrives as a snapshot or
//! a power-up hint, and the only thing it sends back during play is the
//! local player's steering.
//!
//! ## Module Organization
//!
//! ### Network Module (`network`)
//! One framed TCP connection to the host, exposed as a single-channel
//! transport.
//!
//! ### Input Module (`input`)
//! Change detection for steering, with a keep-alive so the host keeps
//! seeing input while nothing changes.
//!
//! ### App Module (`app`)
//! The event loop tying the session to the mirrored game:
//! - Announces the user name when the connection opens
//! - Stages itself once the host moves the lobby to the game screen
//! - Applies snapshots and power-up hints as they arrive
//! - Stops when the host goes away
//!
//! ## Usage Example
//!
//! ```no_run
//! use client::{ClientApp, ClientConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig {
//!     lobby: "127.0.0.1:9000".to_string(),
//!     user_name: "alice".to_string(),
//!     ..ClientConfig::default()
//! };
//! let mut app = ClientApp::connect(config).await?;
//! app.run().await?;
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod input;
pub mod network;

pub use app::{ClientApp, ClientConfig};
