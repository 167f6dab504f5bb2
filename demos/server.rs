//! Chat relay server
//!
//! Run with: cargo run --example server <HOST:PORT>
//!
//! Examples:
//!   cargo run --example server 127.0.0.1:7667
//!   cargo run --example server 0.0.0.0:7667
//!
//! Clients connect with the companion client binary, or with netcat:
//!   nc 127.0.0.1 7667
//! then type `NICK yourname` and chat with `MSG hello`.

use std::net::{SocketAddr, ToSocketAddrs};

use chat_relay::{ChatServer, ServerConfig};

/// Resolve the single HOST:PORT argument to a bind address.
fn parse_bind_addr(arg: &str) -> Result<SocketAddr, String> {
    arg.to_socket_addrs()
        .map_err(|e| format!("invalid bind address '{}': {}", arg, e))?
        .next()
        .ok_or_else(|| format!("bind address '{}' did not resolve", arg))
}

fn print_usage() {
    eprintln!("Usage: server <HOST:PORT>");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  server 127.0.0.1:7667");
    eprintln!("  server 0.0.0.0:7667");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let bind_addr = match args.get(1) {
        Some(arg) => match parse_bind_addr(arg) {
            Ok(addr) => addr,
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!();
                print_usage();
                std::process::exit(1);
            }
        },
        None => {
            print_usage();
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("chat_relay=info".parse()?)
                .add_directive("server=info".parse()?),
        )
        .init();

    let server = ChatServer::new(ServerConfig::with_addr(bind_addr));
    println!("Chat relay listening on {}", bind_addr);

    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
            println!("\nShutting down...");
        })
        .await?;

    let stats = server.stats().snapshot();
    println!(
        "Served {} connections, relayed {} messages",
        stats.connections_accepted, stats.messages_relayed
    );

    Ok(())
}
