//! Transport seam between the connection manager and the socket library.
//!
//! `ConnectionManager` only sees a sink of `Outbound` frames and a stream
//! of `Inbound` frames. The production connector wraps tokio-tungstenite;
//! tests plug in scripted transports to drive reconnects and silence.

use crate::error::{WsError, WsResult};
use futures_util::future::{self, BoxFuture};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use std::pin::Pin;
use tokio_tungstenite::{connect_async_tls_with_config, tungstenite::Message};

/// Frame received from the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Text frame (binary frames are decoded as UTF-8, lossily).
    Text(String),
    /// WebSocket-level ping; must be answered with a pong.
    Ping(Vec<u8>),
    /// WebSocket-level pong.
    Pong,
    /// Close frame from the peer.
    Close { code: u16, reason: String },
}

/// Frame sent to the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text(String),
    Pong(Vec<u8>),
    Close,
}

impl From<Outbound> for Message {
    fn from(frame: Outbound) -> Self {
        match frame {
            Outbound::Text(text) => Message::Text(text),
            Outbound::Pong(data) => Message::Pong(data),
            Outbound::Close => Message::Close(None),
        }
    }
}

pub type FrameSink = Pin<Box<dyn Sink<Outbound, Error = WsError> + Send>>;
pub type FrameStream = Pin<Box<dyn Stream<Item = WsResult<Inbound>> + Send>>;

/// One open physical connection.
///
/// Dropping both halves closes it.
pub struct Transport {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

/// Opens physical connections.
pub trait Connector: Send + Sync {
    fn connect(&self, url: &str) -> BoxFuture<'static, WsResult<Transport>>;
}

/// Production connector backed by tokio-tungstenite.
#[derive(Debug, Default, Clone, Copy)]
pub struct TungsteniteConnector;

impl Connector for TungsteniteConnector {
    fn connect(&self, url: &str) -> BoxFuture<'static, WsResult<Transport>> {
        let url = url.to_string();
        Box::pin(async move {
            // TCP_NODELAY: frames are small and latency-sensitive
            let (ws_stream, _response) =
                connect_async_tls_with_config(url.as_str(), None, true, None).await?;
            let (write, read) = ws_stream.split();

            let sink = write.with(|frame: Outbound| {
                future::ready(Ok::<_, WsError>(Message::from(frame)))
            });
            let stream = read.filter_map(|msg| future::ready(map_inbound(msg)));

            Ok(Transport {
                sink: Box::pin(sink),
                stream: Box::pin(stream),
            })
        })
    }
}

fn map_inbound(
    msg: Result<Message, tokio_tungstenite::tungstenite::Error>,
) -> Option<WsResult<Inbound>> {
    match msg {
        Ok(Message::Text(text)) => Some(Ok(Inbound::Text(text))),
        Ok(Message::Binary(bytes)) => Some(Ok(Inbound::Text(
            String::from_utf8_lossy(&bytes).into_owned(),
        ))),
        Ok(Message::Ping(data)) => Some(Ok(Inbound::Ping(data))),
        Ok(Message::Pong(_)) => Some(Ok(Inbound::Pong)),
        Ok(Message::Close(frame)) => {
            let (code, reason) = frame
                .map(|f| (f.code.into(), f.reason.to_string()))
                .unwrap_or((1000, "Normal close".to_string()));
            Some(Ok(Inbound::Close { code, reason }))
        }
        Ok(Message::Frame(_)) => None,
        Err(e) => Some(Err(e.into())),
    }
}
