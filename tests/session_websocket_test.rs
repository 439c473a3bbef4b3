// End-to-end session tests against a local WebSocket game server
//
// A tiny in-process server plays the game server's side of the protocol:
// registration notice, snapshots, and a terminal snapshot with a winner.

use futures_util::{SinkExt, StreamExt};
use grid_agent::config::Config;
use grid_agent::debug_logger::DebugLogger;
use grid_agent::engine::Strategy;
use grid_agent::session::Session;
use grid_agent::types::{Direction, MoveCommand};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;

fn board(head: (usize, usize), apple: (usize, usize)) -> Value {
    let mut map = vec![vec![Value::Null; 5]; 5];
    map[head.0][head.1] = json!({ "type": "snake-head", "playerName": "Kaa" });
    map[apple.0][apple.1] = json!({ "type": "apple" });
    json!({ "map": map, "winner": null, "players": [{ "name": "Kaa" }] })
}

/// Serves one game to one client and reports the connection query string and
/// every move received, including any sent after the terminal snapshot
async fn serve_one_game(
    listener: TcpListener,
    snapshots: Vec<Value>,
    done: oneshot::Sender<(String, Vec<MoveCommand>)>,
) {
    let (stream, _) = listener.accept().await.unwrap();

    let mut query = String::new();
    let ws = tokio_tungstenite::accept_hdr_async(
        stream,
        |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            query = req.uri().query().unwrap_or_default().to_string();
            Ok(resp)
        },
    )
    .await
    .unwrap();
    let (mut tx, mut rx) = ws.split();

    tx.send(Message::Text(
        json!({ "message": "Player connected successfully.", "id": "k", "name": "Kaa" })
            .to_string()
            .into(),
    ))
    .await
    .unwrap();

    let mut moves = Vec::new();
    for snapshot in snapshots {
        tx.send(Message::Text(snapshot.to_string().into())).await.unwrap();
        let reply = rx.next().await.unwrap().unwrap();
        moves.push(serde_json::from_str(reply.to_text().unwrap()).unwrap());
    }

    let mut over = board((0, 0), (4, 4));
    over["winner"] = json!("Kaa");
    tx.send(Message::Text(over.to_string().into())).await.unwrap();
    // Anything after the terminal snapshot must be ignored by the client
    let _ = tx.send(Message::Text(board((0, 0), (4, 4)).to_string().into())).await;

    while let Some(Ok(frame)) = rx.next().await {
        if let Message::Text(text) = frame {
            moves.push(serde_json::from_str(&text).unwrap());
        }
    }

    let _ = done.send((query, moves));
}

fn fast_config(server_url: String) -> Config {
    let mut config = Config::default_hardcoded();
    config.connection.server_url = server_url;
    config.pacing.base_delay_ms = 0;
    config.pacing.delay_increment_ms = 5;
    config
}

#[tokio::test]
async fn test_session_seeks_apple_and_stops_on_winner() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (done_tx, done_rx) = oneshot::channel();

    let snapshots = vec![board((2, 2), (2, 4)), board((2, 3), (2, 4)), board((1, 0), (4, 0))];
    tokio::spawn(serve_one_game(listener, snapshots, done_tx));

    let config = fast_config(format!("ws://{}", addr));
    let session =
        Session::new("k", Strategy::SeekGoal, &config, DebugLogger::disabled()).with_seed(1);
    let url = config.connection.url_for("k");

    let summary = tokio::time::timeout(Duration::from_secs(10), session.run(&url))
        .await
        .expect("session should finish")
        .expect("session should not fail");

    assert_eq!(summary.ticks, 3);
    assert_eq!(summary.moves_sent, 3);
    assert_eq!(summary.winner.as_deref(), Some("Kaa"));

    let (query, moves) = tokio::time::timeout(Duration::from_secs(10), done_rx)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(query, "id=k");
    let directions: Vec<Direction> = moves.iter().map(|m| m.direction).collect();
    assert_eq!(directions, vec![Direction::Right, Direction::Right, Direction::Down]);
    assert!(moves.iter().all(|m| m.player_id == "k"));
}

#[tokio::test]
async fn test_session_ends_when_server_closes() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        ws.send(Message::Text(board((2, 2), (0, 0)).to_string().into()))
            .await
            .unwrap();
        let _ = ws.next().await;
        let _ = ws.close(None).await;
        // Drain until the client acknowledges the close
        while let Some(Ok(_)) = ws.next().await {}
    });

    let config = fast_config(format!("ws://{}", addr));
    let session = Session::new("k", "timeout".parse().unwrap(), &config, DebugLogger::disabled());

    let url = config.connection.url_for("k");
    let summary = tokio::time::timeout(Duration::from_secs(10), session.run(&url))
        .await
        .expect("session should finish")
        .expect("closing is not an error");

    assert_eq!(summary.ticks, 1);
    assert_eq!(summary.moves_sent, 1);
    assert_eq!(summary.winner, None);
}

#[tokio::test]
async fn test_connection_refused_is_an_error() {
    // Bind then drop to get a port nobody is listening on
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };

    let config = fast_config(format!("ws://{}", addr));
    let session = Session::new("k", Strategy::Random, &config, DebugLogger::disabled());
    let result = session.run(&config.connection.url_for("k")).await;
    assert!(result.is_err());
}
