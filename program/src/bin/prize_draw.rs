// Prize Draw Engine - Daemon entrypoint
//
// Reads one command per stdin line, `<identity> <instruction>`, where the
// instruction is anything `DrawInstruction::unpack` accepts, or
// `<identity> login <user> <pass>` to become operator. Network transport is
// left to embedding collaborators.
use std::collections::HashSet;

use prize_draw::artifacts::DiskArtifactStore;
use prize_draw::instruction::{Caller, DrawInstruction};
use prize_draw::observer::ChannelBroadcaster;
use prize_draw::processor::Processor;
use prize_draw::storage::StateFile;
use prize_draw::{Config, DrawEngine, Sweeper};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    let broadcaster = ChannelBroadcaster::new(64);
    let mut updates = broadcaster.subscribe();

    let engine = DrawEngine::builder(config.clone())
        .broadcaster(broadcaster)
        .artifact_store(DiskArtifactStore::open(&config.upload_dir)?)
        .state_file(StateFile::new(&config.state_path))
        .build()?;
    let _sweeper = Sweeper::spawn(&engine, config.sweep_interval);

    tracing::info!(
        state = %serde_json::to_string(&engine.snapshot())?,
        "prize draw engine running"
    );

    let mut operators = HashSet::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Ok(snapshot) => tracing::info!(state = %serde_json::to_string(&snapshot)?, "state"),
                Err(RecvError::Lagged(skipped)) => tracing::warn!(skipped, "state updates lagged"),
                Err(RecvError::Closed) => break,
            },
            line = lines.next_line(), if stdin_open => match line? {
                Some(line) => handle_line(&config, &engine, &mut operators, &line),
                None => stdin_open = false,
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                break;
            }
        }
    }

    Ok(())
}

fn handle_line(config: &Config, engine: &DrawEngine, operators: &mut HashSet<String>, line: &str) {
    let line = line.trim();
    let Some((identity, command)) = line.split_once(char::is_whitespace) else {
        if !line.is_empty() {
            tracing::warn!(line, "expected `<identity> <instruction>`");
        }
        return;
    };

    if let Some(credentials) = command.trim().strip_prefix("login ") {
        let mut parts = credentials.split_whitespace();
        let user = parts.next().unwrap_or_default();
        let pass = parts.next().unwrap_or_default();
        match Processor::login(config, identity, user, pass) {
            Ok(caller) => {
                operators.insert(caller.identity);
            }
            Err(err) => tracing::warn!(identity, code = err.code(), "{}", err),
        }
        return;
    }

    let caller = if operators.contains(identity) {
        Caller::operator(identity)
    } else {
        Caller::participant(identity)
    };

    let result = DrawInstruction::unpack(command)
        .and_then(|instruction| Processor::process(engine, &caller, instruction));
    match result {
        Ok(response) => tracing::info!(identity, ?response, "processed"),
        Err(err) => tracing::warn!(identity, code = err.code(), "{}", err),
    }
}
