//! BinanceExchange against a mockito server.

use std::sync::Arc;
use std::time::Duration;

use crypto_mcp_bridge::types::object;
use crypto_mcp_bridge::{BinanceExchange, Error, ExchangeClient, McpBridge, MemoryLedger};
use mockito::{Matcher, Server};
use serde_json::json;

const TICKER_BODY: &str = r#"{
    "symbol": "BTCUSDT",
    "lastPrice": "64250.10000000",
    "bidPrice": "64250.00000000",
    "askPrice": "64250.20000000",
    "highPrice": "65010.00000000",
    "lowPrice": "63100.50000000",
    "volume": "18234.11200000"
}"#;

fn exchange(url: &str) -> BinanceExchange {
    BinanceExchange::new(url, Duration::from_secs(5)).expect("valid base url")
}

#[tokio::test]
async fn test_ticker_parses_string_fields() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/v3/ticker/24hr")
        .match_query(Matcher::UrlEncoded("symbol".into(), "BTCUSDT".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(TICKER_BODY)
        .create_async()
        .await;

    let ticker = exchange(&server.url()).ticker("BTC").await.unwrap();
    mock.assert_async().await;
    assert_eq!(ticker.symbol, "BTC/USDT");
    assert_eq!(ticker.last, 64250.1);
    assert_eq!(ticker.low, 63100.5);
    assert_eq!(ticker.volume, 18234.112);
}

#[tokio::test]
async fn test_order_book_levels() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/v3/depth")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("symbol".into(), "ETHBTC".into()),
            Matcher::UrlEncoded("limit".into(), "2".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"lastUpdateId": 1, "bids": [["0.0521", "3.5"], ["0.0520", "1.0"]], "asks": [["0.0522", "2.0"], ["0.0523", "4.25"]]}"#,
        )
        .create_async()
        .await;

    let book = exchange(&server.url()).order_book("ETH/BTC", 2).await.unwrap();
    assert_eq!(book.symbol, "ETH/BTC");
    assert_eq!(book.bids.len(), 2);
    assert_eq!(book.bids[0].price, 0.0521);
    assert_eq!(book.asks[1].quantity, 4.25);
}

#[tokio::test]
async fn test_api_error_maps_to_downstream() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/v3/ticker/24hr")
        .match_query(Matcher::Any)
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(r#"{"code": -1121, "msg": "Invalid symbol."}"#)
        .create_async()
        .await;

    let err = exchange(&server.url()).ticker("NOPE").await.unwrap_err();
    assert!(matches!(err, Error::Downstream { .. }));
    assert!(err.to_string().contains("Invalid symbol."));
}

#[tokio::test]
async fn test_exchange_outage_becomes_failure_result() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/v3/ticker/24hr")
        .match_query(Matcher::Any)
        .with_status(503)
        .with_body("Service Unavailable")
        .create_async()
        .await;

    let bridge = McpBridge::builder()
        .with_default_tools(
            Arc::new(exchange(&server.url())),
            Arc::new(MemoryLedger::default()),
        )
        .unwrap()
        .build()
        .unwrap();

    let envelope = bridge
        .call_tool_envelope("alice", "get_crypto_price", object(json!({"symbol": "BTC"})))
        .await;
    assert!(envelope.is_error());
    let structured = envelope.structured().expect("handler ran");
    assert_eq!(structured.error_type(), Some("downstream_error"));
}
