//! Transport and REST client tests against local servers.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use poloniex_book::client::{LineTransport, RestClient, SnapshotSource, WebSocketTransport};
use poloniex_book::{Config, Error};
use rust_decimal_macros::dec;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

const LINE: &str = "0*{'seq': 1}*{'type': 'orderBookRemove', 'data': {'type': 'bid', 'rate': '1'}}";

/// Accept one WebSocket client, check its subscribe frame, then send a ping,
/// two lines and a close frame.
async fn spawn_feed_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

        let subscribe = ws.next().await.unwrap().unwrap();
        assert_eq!(subscribe, Message::Text("subscribe BTC_ETH".into()));

        ws.send(Message::Ping(vec![1, 2, 3])).await.unwrap();
        ws.send(Message::Binary(vec![0xff])).await.unwrap();
        ws.send(Message::Text(LINE.into())).await.unwrap();
        ws.send(Message::Text("second".into())).await.unwrap();

        // Expect the pong for our ping before closing
        while let Some(Ok(msg)) = ws.next().await {
            if let Message::Pong(data) = msg {
                assert_eq!(data, vec![1, 2, 3]);
                break;
            }
        }
        ws.close(None).await.unwrap();
    });

    format!("ws://{addr}")
}

#[tokio::test]
async fn test_websocket_transport_delivers_text_frames() {
    let url = spawn_feed_server().await;
    let mut ws = WebSocketTransport::new(url).with_subscribe_frame("subscribe BTC_ETH");

    ws.start().await.unwrap();
    assert!(ws.is_connected());

    let first = timeout(Duration::from_secs(5), ws.next_line()).await.unwrap().unwrap();
    assert_eq!(first.as_deref(), Some(LINE));
    let second = timeout(Duration::from_secs(5), ws.next_line()).await.unwrap().unwrap();
    assert_eq!(second.as_deref(), Some("second"));

    let end = timeout(Duration::from_secs(5), ws.next_line()).await.unwrap().unwrap();
    assert_eq!(end, None);

    ws.stop().await.unwrap();
    assert!(!ws.is_connected());
    ws.stop().await.unwrap();
}

#[cfg(unix)]
#[tokio::test]
async fn test_process_transport_reads_stdout_lines() {
    use poloniex_book::client::ProcessTransport;

    let mut transport = ProcessTransport::new("sh")
        .arg("-c")
        .arg(r#"printf '%s\r\n' "*{'seq': 1}" "*{'seq': 2}""#);

    transport.start().await.unwrap();
    assert!(transport.is_running());

    let first = transport.next_line().await.unwrap().unwrap();
    assert_eq!(first.trim_end(), "*{'seq': 1}");
    let decoded = poloniex_book::feed::decode_line(&first).unwrap();
    assert_eq!(decoded.tick.sequence, 1);

    let second = transport.next_line().await.unwrap().unwrap();
    assert_eq!(second.trim_end(), "*{'seq': 2}");
    assert_eq!(transport.next_line().await.unwrap(), None);

    transport.stop().await.unwrap();
    assert!(!transport.is_running());
}

#[cfg(unix)]
#[tokio::test]
async fn test_process_transport_restarts() {
    use poloniex_book::client::ProcessTransport;

    let mut transport = ProcessTransport::new("sh").arg("-c").arg("echo line; sleep 30");

    for _ in 0..2 {
        transport.start().await.unwrap();
        let line = timeout(Duration::from_secs(5), transport.next_line()).await.unwrap().unwrap();
        assert_eq!(line.as_deref(), Some("line"));
        // stop kills the sleeping child rather than waiting 30s
        timeout(Duration::from_secs(5), transport.stop()).await.unwrap().unwrap();
    }
}

/// Serve one canned HTTP response per connection and return the base URL
async fn spawn_http_server(responses: Vec<(u16, &'static str)>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        for (status, body) in responses {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let n = stream.read(&mut buf).await.unwrap();
            let request = String::from_utf8_lossy(&buf[..n]).to_string();
            assert!(request.starts_with("GET /public?command="), "{request}");

            let response = format!(
                "HTTP/1.1 {status} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
        }
    });

    format!("http://{addr}/public")
}

#[tokio::test]
async fn test_rest_client_parses_snapshot_and_history() {
    let base = spawn_http_server(vec![
        (
            200,
            r#"{"asks":[["0.03245000",12.5],["0.03250000",3]],"bids":[["0.03240000",1.25]],"isFrozen":"0","seq":311283922}"#,
        ),
        (
            200,
            r#"[{"globalTradeID":1,"tradeID":5455034,"date":"2018-10-16 18:05:19","type":"buy","rate":"0.03245000","amount":"0.5","total":"0.016225"}]"#,
        ),
    ])
    .await;
    let client = RestClient::new(&Config::new("BTC_ETH").with_rest_base_url(base)).unwrap();

    let book = client.order_book("BTC_ETH", 2).await.unwrap();
    assert_eq!(book.seq, Some(311283922));
    assert_eq!(book.asks.len(), 2);
    assert_eq!(book.bids[0].amount, dec!(1.25));

    let trades = client.trade_history("BTC_ETH").await.unwrap();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].trade_id, 5455034);
}

#[tokio::test]
async fn test_rest_client_maps_error_bodies() {
    let base = spawn_http_server(vec![
        (200, r#"{"error":"Invalid currency pair."}"#),
        (503, r#"{"error":"Service unavailable"}"#),
    ])
    .await;
    let client = RestClient::new(&Config::new("NOPE").with_rest_base_url(base)).unwrap();

    match client.order_book("NOPE", 5).await {
        Err(Error::Api(message)) => assert_eq!(message, "Invalid currency pair."),
        other => panic!("expected API error, got {other:?}"),
    }
    match client.trade_history("NOPE").await {
        Err(Error::Api(message)) => assert!(message.contains("503"), "{message}"),
        other => panic!("expected API error, got {other:?}"),
    }
}
