use std::collections::VecDeque;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace};

use super::codec::{Inbound, StompCodec};
use super::constants::CONNECTION_TIMEOUT;
use super::error::{StompError, StompResult};
use super::frame::Frame;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, WsMessage>;
type WsReader = SplitStream<WsStream>;

/// Unit queued for the connection's writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Frame(Frame),
    Heartbeat,
}

/// Byte-level STOMP link. The client loop drives exactly one at a time.
#[async_trait]
pub trait StompConnection: Send {
    async fn connect(&mut self, url: &str) -> StompResult<()>;
    async fn disconnect(&mut self) -> StompResult<()>;
    async fn send(&mut self, frame: &Frame) -> StompResult<()>;
    async fn send_heartbeat(&mut self) -> StompResult<()>;
    /// Waits for the next decoded unit. Cancel safe.
    async fn receive(&mut self) -> StompResult<Inbound>;
}

pub struct WebSocketConnection {
    writer: Option<WsWriter>,
    reader: Option<WsReader>,
    codec: StompCodec,
    pending: VecDeque<Inbound>,
}

impl WebSocketConnection {
    #[must_use]
    pub fn new() -> Self {
        Self {
            writer: None,
            reader: None,
            codec: StompCodec::new(),
            pending: VecDeque::new(),
        }
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.writer.is_some()
    }

    async fn write(&mut self, text: String) -> StompResult<()> {
        let writer = self.writer.as_mut().ok_or(StompError::NotConnected)?;
        writer
            .send(WsMessage::Text(text.into()))
            .await
            .map_err(|e| StompError::websocket(e.to_string()))
    }

    fn closed(&mut self, code: u16, reason: String) -> StompError {
        self.writer = None;
        self.reader = None;
        StompError::ConnectionClosed { code, reason }
    }
}

impl Default for WebSocketConnection {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StompConnection for WebSocketConnection {
    async fn connect(&mut self, url: &str) -> StompResult<()> {
        let (ws_stream, _) = timeout(CONNECTION_TIMEOUT, connect_async(url))
            .await
            .map_err(|_| StompError::timeout("websocket connect"))?
            .map_err(|e| StompError::connection_failed(e.to_string()))?;

        let (writer, reader) = ws_stream.split();
        self.writer = Some(writer);
        self.reader = Some(reader);
        self.codec.reset();
        self.pending.clear();

        debug!(url = %url, "WebSocket connected");
        Ok(())
    }

    async fn disconnect(&mut self) -> StompResult<()> {
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.close().await;
        }
        self.reader = None;
        self.codec.reset();
        self.pending.clear();
        debug!("WebSocket connection closed");
        Ok(())
    }

    async fn send(&mut self, frame: &Frame) -> StompResult<()> {
        trace!(command = %frame.command, "Sending frame");
        self.write(StompCodec::encode(frame)).await
    }

    async fn send_heartbeat(&mut self) -> StompResult<()> {
        self.write("\n".to_string()).await
    }

    async fn receive(&mut self) -> StompResult<Inbound> {
        loop {
            if let Some(inbound) = self.pending.pop_front() {
                return Ok(inbound);
            }

            let reader = self.reader.as_mut().ok_or(StompError::NotConnected)?;
            match reader.next().await {
                Some(Ok(WsMessage::Text(text))) => {
                    let decoded = self.codec.decode(text.as_bytes())?;
                    self.pending.extend(decoded);
                }
                Some(Ok(WsMessage::Binary(data))) => {
                    let decoded = self.codec.decode(&data)?;
                    self.pending.extend(decoded);
                }
                Some(Ok(WsMessage::Close(frame))) => {
                    let (code, reason) = frame.map_or_else(
                        || (1000, "Normal closure".to_string()),
                        |f| (f.code.into(), f.reason.to_string()),
                    );
                    return Err(self.closed(code, reason));
                }
                Some(Ok(WsMessage::Ping(data))) => {
                    if let Some(writer) = self.writer.as_mut() {
                        let _ = writer.send(WsMessage::Pong(data)).await;
                    }
                }
                Some(Ok(WsMessage::Pong(_) | WsMessage::Frame(_))) => {}
                Some(Err(e)) => {
                    self.writer = None;
                    self.reader = None;
                    return Err(StompError::websocket(e.to_string()));
                }
                None => return Err(self.closed(1006, "Stream ended".to_string())),
            }
        }
    }
}
