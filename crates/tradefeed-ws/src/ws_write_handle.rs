//! Write handle for sending frames on a managed connection.
//!
//! Sending is fire-and-forget and only succeeds while the connection is
//! open. Frames are never queued across a disconnect: anything sent while
//! closed is dropped, and anything still buffered when a connection ends
//! is discarded before the next one opens.

use crate::connection::ConnectionState;
use crate::message::JoinRequest;
use crate::transport::Outbound;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

/// Why a frame was not queued.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    #[error("connection not open")]
    NotOpen,

    #[error("outbound buffer full")]
    BufferFull,

    #[error("channel closed")]
    ChannelClosed,

    #[error("serialize: {0}")]
    Serialize(String),
}

/// Cloneable write handle.
#[derive(Clone)]
pub struct WsWriteHandle {
    tx: mpsc::Sender<Outbound>,
    state: Arc<RwLock<ConnectionState>>,
}

impl WsWriteHandle {
    pub fn new(tx: mpsc::Sender<Outbound>, state: Arc<RwLock<ConnectionState>>) -> Self {
        Self { tx, state }
    }

    /// Queue a raw text frame if the connection is open.
    pub fn send_text(&self, text: String) -> Result<(), SendError> {
        if !self.is_open() {
            debug!("Connection not open, dropping outbound frame");
            return Err(SendError::NotOpen);
        }

        self.tx.try_send(Outbound::Text(text)).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendError::BufferFull,
            mpsc::error::TrySendError::Closed(_) => SendError::ChannelClosed,
        })
    }

    /// Serialize `payload` to JSON and queue it.
    pub fn send<T: Serialize>(&self, payload: &T) -> Result<(), SendError> {
        let text =
            serde_json::to_string(payload).map_err(|e| SendError::Serialize(e.to_string()))?;
        self.send_text(text)
    }

    /// Join a channel on the live connection.
    ///
    /// Needed only for channels registered after the connection opened;
    /// joins for registered channels are replayed on every open.
    pub fn join(&self, channel: &str) -> Result<(), SendError> {
        self.send(&JoinRequest::new(channel))
    }

    pub fn is_open(&self) -> bool {
        *self.state.read() == ConnectionState::Open && !self.tx.is_closed()
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.state.read()
    }
}
