// WebSocket server for the real-time draft channel.
//
// Each connection joins one league room (first message must be `join`),
// immediately receives a full status_update for resync, then gets hub
// events fanned out to it. Client `pick` messages are forwarded to the
// authoritative service path; failures come back as `error` events on the
// offending connection only. Socket writes happen here, per connection,
// never inside the session or hub.

use std::sync::Arc;

use anyhow::Result;
use futures_util::stream::{SplitSink, Stream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{info, warn};

use crate::api::DraftService;
use crate::protocol::{ClientMessage, ServerEvent};

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;

/// Run the WebSocket server on `127.0.0.1:{port}`, spawning one task per
/// connection. Runs until the task is cancelled.
pub async fn run(port: u16, service: Arc<DraftService>) -> Result<()> {
    let listener = TcpListener::bind(format!("127.0.0.1:{port}")).await?;
    let local_addr = listener.local_addr()?;
    info!("draft channel listening on {local_addr}");

    loop {
        let (stream, addr) = listener.accept().await?;
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            let addr = addr.to_string();
            if let Err(e) = handle_connection(stream, addr.clone(), service).await {
                warn!("connection {addr} ended with error: {e:#}");
            }
        });
    }
}

async fn handle_connection(
    stream: TcpStream,
    addr: String,
    service: Arc<DraftService>,
) -> Result<()> {
    let ws_stream = tokio_tungstenite::accept_async(stream).await?;
    let (mut write, read) = ws_stream.split();

    // Pump parsed client messages into a channel so the main loop can
    // select over them alongside hub events.
    let (msg_tx, mut msg_rx) = mpsc::channel::<ClientMessage>(32);
    let reader_addr = addr.clone();
    let reader = tokio::spawn(async move {
        let _ = read_client_messages(read, &msg_tx, &reader_addr).await;
    });

    // The first message must join a league room.
    let (league_id, team_id) = match msg_rx.recv().await {
        Some(ClientMessage::Join { league_id, team_id }) => (league_id, team_id),
        Some(other) => {
            warn!("client {addr} sent {other:?} before joining");
            let _ = send_event(
                &mut write,
                &ServerEvent::Error {
                    message: "join required before any other message".to_string(),
                },
            )
            .await;
            reader.abort();
            return Ok(());
        }
        None => {
            reader.abort();
            return Ok(());
        }
    };

    let (conn_id, mut events) = service.hub().subscribe(league_id);
    info!(league_id, team_id, "client {addr} joined draft room");

    // Full resync on join; reconnecting clients rely on this rather than
    // any buffered deltas.
    let resync = match service.draft_status(league_id) {
        Ok(state) => ServerEvent::StatusUpdate { state },
        Err(e) => ServerEvent::Error {
            message: e.to_string(),
        },
    };
    let mut connected = send_event(&mut write, &resync).await.is_ok();

    while connected {
        tokio::select! {
            maybe_event = events.recv() => match maybe_event {
                Some(event) => {
                    connected = send_event(&mut write, event.as_ref()).await.is_ok();
                }
                // Evicted by the hub (backpressure) or hub dropped.
                None => break,
            },
            maybe_msg = msg_rx.recv() => match maybe_msg {
                Some(ClientMessage::Pick { movie_id }) => {
                    if let Err(e) = service.make_pick(league_id, team_id, movie_id).await {
                        connected = send_event(
                            &mut write,
                            &ServerEvent::Error {
                                message: e.to_string(),
                            },
                        )
                        .await
                        .is_ok();
                    }
                    // On success the committed pick arrives via the hub.
                }
                Some(ClientMessage::Join { .. }) => {
                    connected = send_event(
                        &mut write,
                        &ServerEvent::Error {
                            message: "already joined".to_string(),
                        },
                    )
                    .await
                    .is_ok();
                }
                None => break,
            },
        }
    }

    service.hub().unsubscribe(league_id, conn_id);
    reader.abort();
    let _ = write.close().await;
    info!(league_id, "client {addr} left draft room");
    Ok(())
}

async fn send_event(write: &mut WsSink, event: &ServerEvent) -> Result<()> {
    let json = serde_json::to_string(event)?;
    write.send(Message::Text(json.into())).await?;
    Ok(())
}

/// Parse text frames into [`ClientMessage`]s, forwarding them through `tx`.
/// Malformed payloads are logged and skipped; binary/ping/pong frames are
/// ignored. Returns `Err(())` when the channel is closed (receiver
/// dropped), signalling the caller to stop.
///
/// Generic over the stream type so it can be tested with in-memory streams
/// without opening TCP ports.
pub async fn read_client_messages<St>(
    mut stream: St,
    tx: &mpsc::Sender<ClientMessage>,
    addr: &str,
) -> Result<(), ()>
where
    St: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    while let Some(msg_result) = stream.next().await {
        match msg_result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(parsed) => {
                    if tx.send(parsed).await.is_err() {
                        return Err(());
                    }
                }
                Err(e) => {
                    warn!("ignoring malformed message from {addr}: {e}");
                }
            },
            Ok(Message::Close(_)) => {
                info!("client {addr} sent close frame");
                break;
            }
            Err(e) => {
                warn!("websocket error from {addr}: {e}");
                break;
            }
            _ => {
                // Ignore Binary, Ping, Pong, Frame variants.
            }
        }
    }
    Ok(())
}
