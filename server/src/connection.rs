//! Websocket transport

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use arena_protocol::{ClientCommand, ServerEvent, parse_client_frame};
use futures_util::stream::SplitStream;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{WebSocketStream, accept_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::ArenaServer;

type WsStream = WebSocketStream<TcpStream>;

/// Accept websocket links until the listener fails
pub async fn serve(server: Arc<ArenaServer>, listener: TcpListener) -> Result<()> {
    loop {
        let (stream, peer) = listener
            .accept()
            .await
            .context("Failed to accept connection")?;

        let server = Arc::clone(&server);
        tokio::spawn(async move {
            if let Err(e) = handle_socket(server, stream, peer).await {
                warn!(%peer, error = %e, "Link failed");
            }
        });
    }
}

async fn handle_socket(server: Arc<ArenaServer>, stream: TcpStream, peer: SocketAddr) -> Result<()> {
    let ws = accept_async(stream)
        .await
        .context("WebSocket handshake failed")?;
    let (mut sink, mut frames) = ws.split();

    let Some((identity, display_name)) = read_auth(&mut frames).await? else {
        let event = ServerEvent::error("The first frame must be auth", false);
        sink.send(Message::Text(event.to_wire_format())).await?;
        return Ok(());
    };

    let (link, mut events) = match server.connect(&identity, &display_name) {
        Ok(bound) => bound,
        Err(e) => {
            sink.send(Message::Text(e.to_event().to_wire_format())).await?;
            return Ok(());
        }
    };
    info!(%peer, link, identity = %identity, "Link open");

    let result: Result<()> = async {
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => sink
                        .send(Message::Text(event.to_wire_format()))
                        .await
                        .context("Failed to send event")?,
                    // Replaced by a newer link or the server closed
                    None => break,
                },
                frame = frames.next() => match frame {
                    Some(Ok(Message::Text(text))) => match parse_client_frame(&text) {
                        Ok(command) => server.handle(link, command).await,
                        Err(e) => {
                            debug!(link, error = %e, "Malformed frame");
                            let event = ServerEvent::error(format!("{:#}", e), true);
                            sink.send(Message::Text(event.to_wire_format())).await?;
                        }
                    },
                    Some(Ok(Message::Ping(data))) => sink.send(Message::Pong(data)).await?,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(link, error = %e, "WebSocket error");
                        break;
                    }
                },
            }
        }
        Ok(())
    }
    .await;

    server.disconnect(link);
    let _ = sink.close().await;
    result
}

/// Wait for the auth frame. None if the link sent anything else first.
async fn read_auth(frames: &mut SplitStream<WsStream>) -> Result<Option<(String, String)>> {
    while let Some(message) = frames.next().await {
        match message.context("WebSocket error")? {
            Message::Text(text) => {
                return match parse_client_frame(&text) {
                    Ok(ClientCommand::Auth {
                        identity,
                        display_name,
                    }) => Ok(Some((identity, display_name))),
                    _ => Ok(None),
                };
            }
            Message::Close(_) => return Ok(None),
            _ => {}
        }
    }

    Ok(None)
}
