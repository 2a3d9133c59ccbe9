//! Transport-independent WebSocket frames.
//!
//! The accepted client socket (axum) and the dialed upstream socket
//! (tokio-tungstenite) have different message types. Both are adapted to
//! [`Frame`] and boxed into a [`FrameSink`] / [`FrameStream`] pair so the
//! pumps never see either library.

use std::pin::Pin;

use axum::extract::ws::{Message as AxumMessage, WebSocket};
use bytes::Bytes;
use futures::{Sink, SinkExt, Stream, StreamExt, future};
use parley_core::{EnvelopeKind, RelayError};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

/// A single WebSocket frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 text.
    Text(String),
    /// Opaque binary data.
    Binary(Bytes),
    /// Keepalive ping.
    Ping(Bytes),
    /// Keepalive reply.
    Pong(Bytes),
    /// Close handshake.
    Close,
}

impl Frame {
    /// Split a data frame into its envelope kind and payload.
    ///
    /// Control frames return `None`.
    pub fn into_data(self) -> Option<(EnvelopeKind, Bytes)> {
        match self {
            Self::Text(text) => Some((EnvelopeKind::Text, Bytes::from(text))),
            Self::Binary(data) => Some((EnvelopeKind::Binary, data)),
            Self::Ping(_) | Self::Pong(_) | Self::Close => None,
        }
    }
}

impl From<AxumMessage> for Frame {
    fn from(msg: AxumMessage) -> Self {
        match msg {
            AxumMessage::Text(text) => Self::Text(text.as_str().to_owned()),
            AxumMessage::Binary(data) => Self::Binary(data),
            AxumMessage::Ping(data) => Self::Ping(data),
            AxumMessage::Pong(data) => Self::Pong(data),
            AxumMessage::Close(_) => Self::Close,
        }
    }
}

impl From<Frame> for AxumMessage {
    fn from(frame: Frame) -> Self {
        match frame {
            Frame::Text(text) => Self::Text(text.into()),
            Frame::Binary(data) => Self::Binary(data),
            Frame::Ping(data) => Self::Ping(data),
            Frame::Pong(data) => Self::Pong(data),
            Frame::Close => Self::Close(None),
        }
    }
}

impl From<Frame> for WsMessage {
    fn from(frame: Frame) -> Self {
        match frame {
            Frame::Text(text) => Self::Text(text.into()),
            Frame::Binary(data) => Self::Binary(data),
            Frame::Ping(data) => Self::Ping(data),
            Frame::Pong(data) => Self::Pong(data),
            Frame::Close => Self::Close(None),
        }
    }
}

/// Convert a tungstenite message. Raw frames never surface on read and map to `None`.
fn frame_from_ws(msg: WsMessage) -> Option<Frame> {
    match msg {
        WsMessage::Text(text) => Some(Frame::Text(text.as_str().to_owned())),
        WsMessage::Binary(data) => Some(Frame::Binary(data)),
        WsMessage::Ping(data) => Some(Frame::Ping(data)),
        WsMessage::Pong(data) => Some(Frame::Pong(data)),
        WsMessage::Close(_) => Some(Frame::Close),
        WsMessage::Frame(_) => None,
    }
}

/// Write half of an adapted socket.
pub type FrameSink = Pin<Box<dyn Sink<Frame, Error = RelayError> + Send>>;

/// Read half of an adapted socket.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Frame, RelayError>> + Send>>;

/// Both halves of an adapted socket.
pub type Duplex = (FrameSink, FrameStream);

/// Adapt an accepted axum WebSocket.
pub fn from_axum(socket: WebSocket) -> Duplex {
    let (sink, stream) = socket.split();
    let sink = sink
        .sink_map_err(RelayError::transport)
        .with(|frame: Frame| future::ready(Ok::<_, RelayError>(AxumMessage::from(frame))));
    let stream = stream.map(|msg| msg.map(Frame::from).map_err(RelayError::transport));
    (Box::pin(sink), Box::pin(stream))
}

/// Adapt a dialed tokio-tungstenite WebSocket.
pub fn from_tungstenite(socket: WebSocketStream<MaybeTlsStream<TcpStream>>) -> Duplex {
    let (sink, stream) = socket.split();
    let sink = sink
        .sink_map_err(RelayError::transport)
        .with(|frame: Frame| future::ready(Ok::<_, RelayError>(WsMessage::from(frame))));
    let stream = stream.filter_map(|msg| {
        future::ready(match msg {
            Ok(msg) => frame_from_ws(msg).map(Ok),
            Err(e) => Some(Err(RelayError::transport(e))),
        })
    });
    (Box::pin(sink), Box::pin(stream))
}

/// In-memory duplex for exercising pumps without sockets.
#[cfg(test)]
pub(crate) mod memory {
    use super::*;
    use futures::channel::mpsc;

    /// The far side of a [`duplex`]: frames written by the pump arrive on
    /// `written`; frames sent on `incoming` are read by the pump.
    pub(crate) struct Remote {
        pub written: mpsc::UnboundedReceiver<Frame>,
        pub incoming: mpsc::UnboundedSender<Result<Frame, RelayError>>,
    }

    pub(crate) fn duplex() -> (Duplex, Remote) {
        let (write_tx, written) = mpsc::unbounded::<Frame>();
        let (incoming, read_rx) = mpsc::unbounded::<Result<Frame, RelayError>>();
        let sink: FrameSink = Box::pin(write_tx.sink_map_err(RelayError::transport));
        let stream: FrameStream = Box::pin(read_rx);
        ((sink, stream), Remote { written, incoming })
    }
}
