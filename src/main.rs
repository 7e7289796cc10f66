//! watchparty - headless watch party client.
//!
//! Joins a room on a relay with a simulated player and reads user actions
//! from stdin.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn, Level};

use watchparty_client::{
    adapter_events, CallbackHandler, PlaybackAdapter, RelayConnection, RelayOptions,
    SessionBuilder, SessionEvent, SessionHandle, SimulatedPlayer,
};
use watchparty_timing::SystemClock;

/// Command-line arguments
struct Args {
    /// Relay WebSocket URL
    relay: String,
    room: String,
    user: String,
    /// Enable debug logging
    debug: bool,
    /// Write logs to this file instead of stderr
    log_file: Option<PathBuf>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            relay: "ws://127.0.0.1:3000".to_string(),
            room: "lobby".to_string(),
            user: std::env::var("USER").unwrap_or_else(|_| "guest".to_string()),
            debug: false,
            log_file: None,
        }
    }
}

fn parse_args() -> Args {
    let mut args = Args::default();
    let mut iter = std::env::args().skip(1);

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--relay" | "-r" => {
                if let Some(url) = iter.next() {
                    args.relay = url;
                }
            }
            "--room" => {
                if let Some(room) = iter.next() {
                    args.room = room;
                }
            }
            "--user" | "-u" => {
                if let Some(user) = iter.next() {
                    args.user = user;
                }
            }
            "--debug" | "-d" => {
                args.debug = true;
            }
            "--log-file" | "-l" => {
                if let Some(path) = iter.next() {
                    args.log_file = Some(PathBuf::from(path));
                }
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            _ => {
                eprintln!("Unknown argument: {}", arg);
                print_help();
                std::process::exit(1);
            }
        }
    }

    args
}

fn print_help() {
    println!("watchparty - headless watch party client");
    println!();
    println!("Usage: watchparty-rs [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -r, --relay URL      Relay WebSocket URL (default: ws://127.0.0.1:3000)");
    println!("      --room ID        Room to join (default: lobby)");
    println!("  -u, --user NAME      Display name (default: $USER)");
    println!("  -d, --debug          Enable debug logging");
    println!("  -l, --log-file PATH  Write logs to PATH instead of stderr");
    println!("  -h, --help           Show this help message");
    println!();
    println!("Commands on stdin: play, pause, seek <secs>, chat <text>, sync, stats, quit");
}

fn setup_logging(args: &Args) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let level = if args.debug { Level::DEBUG } else { Level::INFO };

    let file = match &args.log_file {
        Some(path) => match std::fs::File::create(path) {
            Ok(file) => Some(file),
            Err(e) => {
                eprintln!("Cannot open log file {:?}: {}", path, e);
                None
            }
        },
        None => None,
    };

    match file {
        Some(file) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            tracing_subscriber::fmt()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_max_level(level)
                .init();
            info!("Logging to {:?}", args.log_file);
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_target(args.debug)
                .with_max_level(level)
                .init();
            None
        }
    }
}

fn print_event(event: SessionEvent) {
    match event {
        SessionEvent::Connected => println!("* connected"),
        SessionEvent::Disconnected => println!("* disconnected, reconnecting"),
        SessionEvent::MediaChanged { media, title } => println!("* now playing {} ({})", title, media),
        SessionEvent::RemoteAction { kind, position } => println!("* room {} at {:.1}s", kind, position),
        SessionEvent::Chat { username, message } => println!("<{}> {}", username, message),
        SessionEvent::PeerStats(peer) => {
            println!(
                "* {} at {:.1}s ({:.0} ms, {})",
                peer.username, peer.position, peer.latency_ms, peer.platform
            )
        }
        SessionEvent::StateSynced(_) | SessionEvent::LocalAction { .. } => {}
    }
}

/// Apply one stdin line. Returns `false` to quit.
fn run_command(line: &str, player: &SimulatedPlayer, session: &SessionHandle) -> Result<bool> {
    let line = line.trim();
    let (command, rest) = line.split_once(' ').unwrap_or((line, ""));

    match command {
        "" => {}
        "play" => player.user_play()?,
        "pause" => player.user_pause()?,
        "seek" => {
            let secs: f64 = rest
                .trim()
                .parse()
                .with_context(|| format!("invalid position '{}'", rest.trim()))?;
            player.user_seek(secs)?;
        }
        "chat" => session.send_chat(rest.trim())?,
        "sync" => session.request_sync()?,
        "stats" => {
            let stats = session.stats();
            println!(
                "position {:.1}s, rate {:.3}, {} ticks, {} resyncs, {} nudges, {} echoes, {:.0}% probe loss",
                player.position(),
                player.rate(),
                stats.ticks,
                stats.hard_resyncs,
                stats.nudges,
                stats.echoes_suppressed,
                stats.probe_loss_percent()
            );
        }
        "quit" | "exit" => return Ok(false),
        other => println!("Unknown command: {}", other),
    }

    Ok(true)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args();

    // Setup logging before anything else
    let _guard = setup_logging(&args);

    info!(relay = %args.relay, room = %args.room, user = %args.user, "Starting watchparty");

    let (events_tx, events_rx) = adapter_events();
    let player = SimulatedPlayer::new(Arc::new(SystemClock), events_tx);

    let (mut relay, link) = RelayConnection::spawn(RelayOptions::new(&args.relay))?;
    let mut session = SessionBuilder::new(&args.room, &args.user)
        .event_handler(CallbackHandler::new(print_event))
        .spawn(player.clone(), events_rx, link)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match run_command(&line, &player, &session) {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(e) => warn!("{:#}", e),
                }
            }
            _ = &mut ctrl_c => break,
        }
    }

    session.stop().await;
    relay.stop().await;
    info!("Goodbye");

    Ok(())
}
