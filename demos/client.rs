//! Chat relay client
//!
//! Run with: cargo run --example client <HOST:PORT> <NICKNAME>
//!
//! Lines typed on stdin are sent as chat messages; end of input (ctrl-d)
//! announces departure and exits.

use chat_relay::client::{ChatClient, ChatEvent};
use tokio::io::{AsyncBufReadExt, BufReader};

fn print_usage() {
    eprintln!("Usage: client <HOST:PORT> <NICKNAME>");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    let (addr, nickname) = match (args.get(1), args.get(2)) {
        (Some(addr), Some(nickname)) => (addr.clone(), nickname.clone()),
        _ => {
            print_usage();
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut client = match ChatClient::connect(addr.as_str(), &nickname).await {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    println!("Connected to {} as {}", addr, nickname);

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            event = client.next_event() => match event? {
                Some(ChatEvent::Message { nickname, text }) => println!("{}: {}", nickname, text),
                Some(ChatEvent::Joined(nickname)) => println!("* {} joined", nickname),
                Some(ChatEvent::Left(nickname)) => println!("* {} left", nickname),
                Some(ChatEvent::ServerError(reason)) => eprintln!("! server: {}", reason),
                None => {
                    println!("Server closed the connection");
                    break;
                }
            },
            line = stdin.next_line() => match line? {
                Some(text) => {
                    let text = text.trim();
                    if text.is_empty() {
                        continue;
                    }
                    if let Err(e) = client.send(text).await {
                        eprintln!("! {}", e);
                    }
                }
                None => {
                    client.exit().await?;
                    break;
                }
            },
        }
    }

    Ok(())
}
