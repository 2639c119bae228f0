//! Live top of book for one pair
//!
//! Bootstraps over REST, then follows the push feed from either a streamer
//! process or a WebSocket endpoint.
//!
//! ```bash
//! # Streamer process printing one feed line per stdout line
//! POLONIEX_PAIR=BTC_ETH STREAMER_CMD="python streamer.py BTC_ETH" cargo run --example live_book
//!
//! # WebSocket endpoint sending one feed line per text frame
//! POLONIEX_PAIR=BTC_ETH FEED_URL=wss://feed.example.com/BTC_ETH cargo run --example live_book
//! ```

use std::sync::Arc;
use std::time::Duration;

use poloniex_book::client::{ProcessTransport, RestClient, WebSocketTransport};
use poloniex_book::{BookCoordinator, Config, CoordinatorState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("poloniex_book=info".parse()?),
        )
        .init();

    let pair = std::env::var("POLONIEX_PAIR").unwrap_or_else(|_| "BTC_ETH".to_string());
    let depth = std::env::var("BOOK_DEPTH")
        .ok()
        .and_then(|d| d.parse().ok())
        .unwrap_or(10);

    let config = Config::new(&pair).with_book_depth(depth);
    let source = Arc::new(RestClient::new(&config)?);

    println!("Bootstrapping {pair} ({depth} levels)...");
    let coordinator = BookCoordinator::bootstrapped(config, source).await?;

    if let Ok(url) = std::env::var("FEED_URL") {
        let mut transport = WebSocketTransport::new(url);
        if let Ok(frame) = std::env::var("FEED_SUBSCRIBE") {
            transport = transport.with_subscribe_frame(frame);
        }
        coordinator.start(transport).await?;
    } else {
        let cmd = std::env::var("STREAMER_CMD")
            .map_err(|_| "set FEED_URL or STREAMER_CMD to choose a feed")?;
        let mut parts = cmd.split_whitespace();
        let program = parts.next().ok_or("STREAMER_CMD is empty")?;
        coordinator
            .start(ProcessTransport::new(program).args(parts))
            .await?;
    }

    println!("Live. Press Ctrl-C to stop.\n");
    let mut ticker = tokio::time::interval(Duration::from_secs(2));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {}
        }

        if coordinator.state() == CoordinatorState::Stopped {
            println!("Ingestion ended: {:?}", coordinator.last_error());
            break;
        }

        let stats = coordinator.stats();
        match (coordinator.best_bid(), coordinator.best_ask()) {
            (Some(bid), Some(ask)) => println!(
                "seq {:?} | bid {} x {} | ask {} x {} | spread {} | ticks {} gaps {}",
                coordinator.last_sequence(),
                bid.price,
                bid.amount,
                ask.price,
                ask.amount,
                ask.price - bid.price,
                stats.ticks_applied,
                stats.sequence_gaps,
            ),
            _ => println!("book has an empty side ({:?})", coordinator.state()),
        }

        if let Some(trade) = coordinator.recent_trades(1).first() {
            println!(
                "  last trade #{} {:?} {} @ {}",
                trade.trade_id, trade.side, trade.amount, trade.price
            );
        }
    }

    println!("\nStopping...");
    coordinator.stop().await?;
    Ok(())
}
