// Push channel plumbing: a WebSocket client split into an outgoing text
// sender and an incoming event receiver.

use async_trait::async_trait;
use futures_util::stream::Stream;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::error::{Result, SyncError};

/// Events surfaced by an open push channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// A text frame (raw JSON string).
    Message(String),
    /// The remote side closed or the connection failed. Always the last event.
    Closed,
}

/// An open channel. Dropping `outgoing` closes the connection.
#[derive(Debug)]
pub struct PushChannel {
    pub outgoing: mpsc::Sender<String>,
    pub incoming: mpsc::Receiver<ChannelEvent>,
}

#[async_trait]
pub trait ChannelOpener: Send + Sync {
    async fn open(&self, url: &str) -> Result<PushChannel>;
}

// ---------------------------------------------------------------------------
// WebSocket implementation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct WsChannelOpener;

#[async_trait]
impl ChannelOpener for WsChannelOpener {
    async fn open(&self, url: &str) -> Result<PushChannel> {
        let (ws_stream, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| SyncError::Network(format!("WebSocket connect to {url} failed: {e}")))?;
        info!("Push channel open: {url}");

        let (mut write, read) = ws_stream.split();
        let (out_tx, mut out_rx) = mpsc::channel::<String>(32);
        let (in_tx, in_rx) = mpsc::channel::<ChannelEvent>(256);

        tokio::spawn(async move {
            while let Some(text) = out_rx.recv().await {
                if let Err(e) = write.send(Message::Text(text.into())).await {
                    warn!("Push channel send failed: {e}");
                    break;
                }
            }
            let _ = write.close().await;
            debug!("Push channel writer finished");
        });

        let source = url.to_string();
        tokio::spawn(async move {
            if forward_messages(read, &in_tx, &source).await.is_ok() {
                let _ = in_tx.send(ChannelEvent::Closed).await;
            }
        });

        Ok(PushChannel {
            outgoing: out_tx,
            incoming: in_rx,
        })
    }
}

/// Forward text frames from `stream` through `tx` until a close frame, an
/// error, or the end of the stream. Returns `Err(())` once the receiver is
/// gone.
pub async fn forward_messages<St>(
    mut stream: St,
    tx: &mpsc::Sender<ChannelEvent>,
    source: &str,
) -> std::result::Result<(), ()>
where
    St: Stream<Item = std::result::Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    while let Some(msg_result) = stream.next().await {
        match msg_result {
            Ok(Message::Text(text)) => {
                if tx.send(ChannelEvent::Message(text.to_string())).await.is_err() {
                    return Err(());
                }
            }
            Ok(Message::Close(_)) => {
                info!("{source} sent close frame");
                break;
            }
            Err(e) => {
                warn!("WebSocket error from {source}: {e}");
                break;
            }
            _ => {}
        }
    }
    Ok(())
}
