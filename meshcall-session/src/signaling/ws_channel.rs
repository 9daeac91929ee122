use crate::signaling::{InboundSignal, SignalingChannel};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use meshcall_core::{PartnerId, RelayDelivery, RelayFrame, RoomId};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

struct Connection {
    room: RoomId,
    outgoing: mpsc::UnboundedSender<Message>,
    writer: JoinHandle<()>,
    reader: JoinHandle<()>,
}

/// Client side of the WebSocket relay.
pub struct WsSignalingChannel {
    base_url: String,
    connection: Mutex<Option<Connection>>,
}

impl WsSignalingChannel {
    /// `base_url` is the relay root, e.g. `ws://127.0.0.1:8080`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            connection: Mutex::new(None),
        }
    }

    fn room_url(&self, room: &RoomId, local: PartnerId) -> String {
        format!("{}/ws/{}/{}", self.base_url, room, local)
    }
}

#[async_trait]
impl SignalingChannel for WsSignalingChannel {
    async fn join(
        &self,
        room: &RoomId,
        local: PartnerId,
        inbound: mpsc::UnboundedSender<InboundSignal>,
    ) -> Result<()> {
        let mut connection = self.connection.lock().await;
        if let Some(existing) = connection.as_ref() {
            bail!("already connected to room '{}'", existing.room);
        }

        let url = self.room_url(room, local);
        let (stream, _) = connect_async(url.as_str())
            .await
            .with_context(|| format!("connecting to relay at {url}"))?;
        info!("Connected to relay room '{}' as {}", room, local);

        let (mut ws_write, mut ws_read) = stream.split();
        let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel::<Message>();

        let writer = tokio::spawn(async move {
            while let Some(msg) = outgoing_rx.recv().await {
                let closing = matches!(msg, Message::Close(_));
                if ws_write.send(msg).await.is_err() || closing {
                    break;
                }
            }
        });

        let reader = tokio::spawn(async move {
            while let Some(msg) = ws_read.next().await {
                match msg {
                    Ok(Message::Text(text)) => match serde_json::from_str::<RelayDelivery>(&text) {
                        Ok(delivery) => {
                            let signal = InboundSignal {
                                from: delivery.from,
                                room: delivery.room,
                                payload: delivery.payload,
                            };
                            if inbound.send(signal).is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!("Invalid relay delivery: {}", e),
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Relay connection error: {}", e);
                        break;
                    }
                }
            }
            debug!("Relay reader finished");
        });

        *connection = Some(Connection {
            room: room.clone(),
            outgoing,
            writer,
            reader,
        });
        Ok(())
    }

    async fn send(
        &self,
        room: &RoomId,
        _from: PartnerId,
        to: Option<PartnerId>,
        payload: String,
    ) -> Result<()> {
        let connection = self.connection.lock().await;
        let Some(connection) = connection.as_ref() else {
            bail!("not connected to the relay");
        };
        if &connection.room != room {
            bail!("connected to room '{}', not '{}'", connection.room, room);
        }

        let frame = serde_json::to_string(&RelayFrame { to, payload })?;
        connection
            .outgoing
            .send(Message::Text(frame))
            .context("relay connection is gone")?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let Some(connection) = self.connection.lock().await.take() else {
            return Ok(());
        };

        let _ = connection.outgoing.send(Message::Close(None));
        drop(connection.outgoing);
        if let Err(e) = connection.writer.await {
            warn!("Relay writer ended abnormally: {}", e);
        }
        connection.reader.abort();
        info!("Left relay room '{}'", connection.room);
        Ok(())
    }
}
