use anyhow::Result;
use std::env;
use std::sync::Arc;
use std::time::Duration;

use streamview::{resolve_source_url, HeadlessSink, Session, StreamConfig, WsConnector};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let source = match args.get(1).map(|s| s.as_str()) {
        None | Some("help") | Some("--help") | Some("-h") => {
            print_help();
            return Ok(());
        }
        Some(source) => source.to_string(),
    };

    let mut config = if args.contains(&"--background".to_string()) {
        StreamConfig::unattended()
    } else {
        StreamConfig::default()
    };
    if let Some(mode) = parse_arg(&args, "--mode") {
        config.mode = mode.to_string();
    }
    let duration = parse_arg(&args, "--duration").and_then(|s| s.parse::<u64>().ok());

    let url = resolve_source_url(&source, None)?;
    println!("Connecting to {} (mode: {})", url, config.mode);

    let sink = Arc::new(HeadlessSink::new());
    let session = Session::new(config, url, sink.clone(), Arc::new(WsConnector::new()));
    let handle = session.handle();
    handle.resume();

    let run = tokio::spawn(session.run());

    match duration {
        Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
        None => {
            tokio::signal::ctrl_c().await?;
            println!("Interrupted, shutting down");
        }
    }

    handle.shutdown();
    run.await?;

    println!(
        "Streams attached: {}, fragments: {}, stills: {}",
        sink.streams_attached(),
        sink.fragments_rendered(),
        sink.stills_shown()
    );
    Ok(())
}

/// Parse a command line argument value
fn parse_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|arg| arg == flag)
        .and_then(|pos| args.get(pos + 1))
        .map(|s| s.as_str())
}

/// Print help information
fn print_help() {
    println!("Streamview Viewer");
    println!("Headless adaptive media-streaming client for relay endpoints");
    println!();
    println!("USAGE:");
    println!("    streamview <SOURCE> [OPTIONS]");
    println!();
    println!("SOURCE:");
    println!("    A relay signaling endpoint; http(s) schemes are rewritten");
    println!("    to ws(s), e.g. http://relay:1984/api/ws?src=camera1");
    println!();
    println!("OPTIONS:");
    println!("    --mode LIST             Transport priority (default: webrtc,mse,mp4,mjpeg)");
    println!("    --background            Unattended profile: never suspend, 10s reconnect spacing");
    println!("    --duration SECS         Exit after the given number of seconds");
    println!();
    println!("EXAMPLES:");
    println!("    streamview http://relay.local:1984/api/ws?src=door --duration 30");
    println!("    streamview ws://relay.local:1984/api/ws?src=door --mode webrtc");
}
