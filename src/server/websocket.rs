use crate::agent::ChatAgent;
use crate::models::chat::Session;
use crate::models::websocket::{ ClientMessage, ServerMessage };

use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::io::{ AsyncRead, AsyncWrite };

use tokio_tungstenite::{ accept_async, WebSocketStream };
use tokio_tungstenite::tungstenite::protocol::Message;

use chrono::Utc;
use futures::{ Sink, SinkExt, StreamExt };
use log::{ info, warn, error };

const MAX_MESSAGE_SIZE: usize = 1 * 1024 * 1024;

pub async fn start_ws_server(
    addr: &str,
    agent: Arc<ChatAgent>
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;
    info!("WS server listening on: {}", addr);

    loop {
        let (stream, peer) = listener.accept().await?;
        info!("Incoming connection from: {}", peer);
        let agent_clone = Arc::clone(&agent);

        tokio::spawn(async move {
            match accept_async(stream).await {
                Ok(ws) => handle_connection(peer, ws, agent_clone).await,
                Err(e) => error!("Handshake failed for {}: {}", peer, e),
            }
        });
    }
}

async fn send_json<T>(tx: &mut T, msg: &ServerMessage) -> Result<(), Box<dyn Error + Send + Sync>>
    where T: Sink<Message> + Unpin, T::Error: Error + Send + Sync + 'static
{
    let json = serde_json::to_string(msg)?;
    tx.send(Message::Text(json)).await?;
    Ok(())
}

/// Runs one input cycle: resolve the question, echo it, wait for the
/// reply. Nothing else is read from the socket until the reply is sent.
async fn run_cycle<T>(
    tx: &mut T,
    agent: &ChatAgent,
    session: &mut Session,
    typed: Option<&str>
) -> Result<(), Box<dyn Error + Send + Sync>>
    where T: Sink<Message> + Unpin, T::Error: Error + Send + Sync + 'static
{
    let Some(question) = session.take_input(typed) else {
        return Ok(());
    };

    send_json(tx, &ServerMessage::User { content: question.clone() }).await?;
    send_json(tx, &ServerMessage::Processing).await?;

    let reply = match agent.answer(session, &question).await {
        Ok(content) => ServerMessage::Response { content, timestamp: Utc::now().timestamp() },
        Err(e) => ServerMessage::Error { message: format!("Error: {}", e.detail()) },
    };
    send_json(tx, &reply).await
}

pub async fn handle_connection<S>(
    peer: SocketAddr,
    websocket: WebSocketStream<S>,
    agent: Arc<ChatAgent>
)
    where S: AsyncRead + AsyncWrite + Unpin
{
    let (mut tx, mut rx) = websocket.split();
    let mut session = agent.new_session();
    info!("Assigned session ID {} to {}", session.id(), peer);

    let history = ServerMessage::History { turns: session.all().to_vec() };
    if let Err(e) = send_json(&mut tx, &history).await {
        error!("Failed to send history to {}: {}", peer, e);
        return;
    }

    while let Some(msg) = rx.next().await {
        let message = match msg {
            Ok(message) => message,
            Err(e) => {
                match e {
                    | tokio_tungstenite::tungstenite::Error::ConnectionClosed
                    | tokio_tungstenite::tungstenite::Error::Protocol(_)
                    | tokio_tungstenite::tungstenite::Error::Utf8 => {
                        info!("WebSocket connection closed or protocol error for {}: {}", peer, e);
                    }
                    tokio_tungstenite::tungstenite::Error::Io(ref io_err) if
                        io_err.kind() == std::io::ErrorKind::ConnectionReset
                    => {
                        info!("WebSocket connection reset by peer {}", peer);
                    }
                    _ => {
                        error!("Error receiving message from {}: {}", peer, e);
                    }
                }
                break;
            }
        };

        if message.len() > MAX_MESSAGE_SIZE {
            warn!(
                "Message from {} exceeds size limit ({} > {})",
                peer,
                message.len(),
                MAX_MESSAGE_SIZE
            );
            let error_msg = ServerMessage::Error { message: "Message too large".to_string() };
            if send_json(&mut tx, &error_msg).await.is_err() {
                error!("Failed to send size limit error to {}", peer);
            }
            break;
        }

        let outcome = match message {
            Message::Text(text) => {
                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Chat { content }) => {
                        run_cycle(&mut tx, &agent, &mut session, Some(&content)).await
                    }
                    Ok(ClientMessage::Preset { id }) => {
                        match session.select_preset(&id) {
                            Ok(()) => run_cycle(&mut tx, &agent, &mut session, None).await,
                            Err(e) => {
                                warn!("{} requested {}", peer, e);
                                send_json(&mut tx, &ServerMessage::Error { message: e.to_string() }).await
                            }
                        }
                    }
                    Err(e) => {
                        error!("Failed to parse message from {}: {}", peer, e);
                        let error_msg = ServerMessage::Error {
                            message: format!("Failed to parse message: {}", e),
                        };
                        send_json(&mut tx, &error_msg).await
                    }
                }
            }
            Message::Close(_) => {
                info!("Received close frame from {}", peer);
                break;
            }
            Message::Ping(ping_data) => {
                tx.send(Message::Pong(ping_data)).await
                    .map_err(|e| Box::new(e) as Box<dyn Error + Send + Sync>)
            }
            Message::Binary(_) => {
                warn!("Ignoring binary message from {}", peer);
                Ok(())
            }
            Message::Pong(_) | Message::Frame(_) => Ok(()),
        };

        if let Err(e) = outcome {
            error!("Error sending message to {}: {}", peer, e);
            break;
        }
    }

    info!(
        "WebSocket connection closed for {} (Session ID: {}, {} turns)",
        peer,
        session.id(),
        session.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_support::StubClient;
    use crate::config::prompt::GREETING;
    use crate::models::chat::Turn;
    use futures::channel::mpsc;

    fn decode(messages: Vec<Message>) -> Vec<ServerMessage> {
        messages
            .into_iter()
            .map(|m| match m {
                Message::Text(t) => serde_json::from_str(&t).unwrap(),
                other => panic!("unexpected frame {:?}", other),
            })
            .collect()
    }

    #[tokio::test]
    async fn cycle_sends_echo_processing_and_reply() {
        let agent = ChatAgent::with_client(Arc::new(StubClient::replying("Bring a passport.")));
        let mut session = agent.new_session();
        let (mut tx, rx) = mpsc::unbounded::<Message>();

        session.select_preset("travel_documents").unwrap();
        run_cycle(&mut tx, &agent, &mut session, None).await.unwrap();
        drop(tx);

        let sent = decode(rx.collect().await);
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[0], ServerMessage::User {
            content: "What documents are required for international travel?".into(),
        });
        assert_eq!(sent[1], ServerMessage::Processing);
        assert!(matches!(&sent[2], ServerMessage::Response { content, .. } if content == "Bring a passport."));
        assert_eq!(session.len(), 3);
    }

    #[tokio::test]
    async fn failed_cycle_reports_error_inline() {
        let agent = ChatAgent::with_client(Arc::new(StubClient::failing("API key not valid")));
        let mut session = agent.new_session();
        let (mut tx, rx) = mpsc::unbounded::<Message>();

        run_cycle(&mut tx, &agent, &mut session, Some("hi")).await.unwrap();
        drop(tx);

        let sent = decode(rx.collect().await);
        assert_eq!(sent.last(), Some(&ServerMessage::Error { message: "Error: API key not valid".into() }));
    }

    #[tokio::test]
    async fn empty_input_sends_nothing() {
        let stub = Arc::new(StubClient::replying("unused"));
        let agent = ChatAgent::with_client(stub.clone());
        let mut session = agent.new_session();
        let (mut tx, rx) = mpsc::unbounded::<Message>();

        run_cycle(&mut tx, &agent, &mut session, Some("  ")).await.unwrap();
        drop(tx);

        assert!(rx.collect::<Vec<_>>().await.is_empty());
        assert_eq!(stub.calls(), 0);
        assert_eq!(session.len(), 1);
    }

    async fn next_server_message<S>(client: &mut WebSocketStream<S>) -> ServerMessage
        where S: AsyncRead + AsyncWrite + Unpin
    {
        loop {
            match client.next().await {
                Some(Ok(Message::Text(t))) => {
                    return serde_json::from_str(&t).unwrap();
                }
                Some(Ok(Message::Pong(_))) => {
                    continue;
                }
                other => panic!("unexpected frame {:?}", other),
            }
        }
    }

    async fn send_client<S>(client: &mut WebSocketStream<S>, msg: &ClientMessage)
        where S: AsyncRead + AsyncWrite + Unpin
    {
        client.send(Message::Text(serde_json::to_string(msg).unwrap())).await.unwrap();
    }

    #[tokio::test]
    async fn connection_serves_one_session_end_to_end() {
        let agent = Arc::new(
            ChatAgent::with_client(Arc::new(StubClient::replying("Refunds take 7 days.")))
        );
        let (client_io, server_io) = tokio::io::duplex(64 * 1024);
        let peer: SocketAddr = "127.0.0.1:50000".parse().unwrap();

        let server = tokio::spawn(async move {
            let ws = accept_async(server_io).await.unwrap();
            handle_connection(peer, ws, agent).await;
        });
        let (mut client, _) = tokio_tungstenite::client_async("ws://localhost/", client_io)
            .await
            .unwrap();

        match next_server_message(&mut client).await {
            ServerMessage::History { turns } => {
                assert_eq!(turns, vec![Turn::bot(GREETING)]);
            }
            other => panic!("expected history, got {:?}", other),
        }

        send_client(&mut client, &ClientMessage::Preset { id: "nope".into() }).await;
        assert_eq!(
            next_server_message(&mut client).await,
            ServerMessage::Error { message: "Unknown preset 'nope'".into() }
        );

        send_client(&mut client, &ClientMessage::Preset { id: "refund_policy".into() }).await;
        assert_eq!(
            next_server_message(&mut client).await,
            ServerMessage::User { content: "Explain refund rules for cancelled tickets".into() }
        );
        assert_eq!(next_server_message(&mut client).await, ServerMessage::Processing);
        assert!(matches!(
            next_server_message(&mut client).await,
            ServerMessage::Response { ref content, .. } if content == "Refunds take 7 days."
        ));

        client.send(Message::Ping(vec![1, 2, 3])).await.unwrap();
        match client.next().await {
            Some(Ok(Message::Pong(data))) => assert_eq!(data, vec![1, 2, 3]),
            other => panic!("expected pong, got {:?}", other),
        }

        let oversized = "x".repeat(MAX_MESSAGE_SIZE + 1);
        client.send(Message::Text(oversized)).await.unwrap();
        assert_eq!(
            next_server_message(&mut client).await,
            ServerMessage::Error { message: "Message too large".into() }
        );

        server.await.unwrap();
    }
}
