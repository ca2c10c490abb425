//! Tideway CLI chat client
//!
//! Connects to the realtime endpoint derived from an origin, prints
//! inbound chat messages, and sends each stdin line as a chat message.
//!
//! Run with: tideway-client --origin https://stay.example

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tideway::types::CHAT_MESSAGE;
use tideway::{ChannelConfig, ChannelHub, Session};

#[derive(Parser, Debug)]
#[command(name = "tideway-client")]
#[command(about = "Interactive chat client for a tideway realtime endpoint")]
struct Args {
    /// Page origin to derive the endpoint from (http/https/ws/wss)
    #[arg(long, env = "TIDEWAY_ORIGIN", default_value = "http://localhost:3000")]
    origin: String,

    /// User identifier (omit for an anonymous session)
    #[arg(long, env = "TIDEWAY_USER_ID")]
    user_id: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tideway=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let session = match args.user_id {
        Some(user_id) => Session::for_user(user_id),
        None => Session::anonymous(),
    };
    tracing::info!(session_id = %session.session_id, version = tideway::VERSION, "starting");

    let hub = ChannelHub::new(ChannelConfig::default());
    let channel = hub.open(&args.origin, session)?;

    channel.register_handler(CHAT_MESSAGE, |payload| {
        let text = payload
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_owned)
            .unwrap_or_else(|| payload.to_string());
        println!("<< {text}");
    });

    let mut state = channel.watch_state();
    tokio::spawn(async move {
        while state.changed().await.is_ok() {
            let current = *state.borrow_and_update();
            tracing::info!(state = %current, "connection state changed");
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(text) if !text.trim().is_empty() => {
                    if let Err(e) = channel.send_chat(text.trim()).await {
                        tracing::warn!(error = %e, "message not sent");
                    }
                }
                Some(_) => {}
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    hub.shutdown();
    Ok(())
}
