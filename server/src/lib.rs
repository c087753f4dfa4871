//! The TCP front end for the RTMP engine: binds a listener, runs the
//! handshake and a [`inlet_rtmp::session::ServerSession`] for every
//! connection on its own task, and reports what happens to an
//! [`IngestHandler`] supplied by the embedding application.

mod config;
mod connection;
mod error;
mod handler;
mod server;

pub use config::ServerConfig;
pub use error::ConnectionError;
pub use handler::{Decision, IngestHandler, MediaFrame, MediaKind};
pub use server::IngestServer;
