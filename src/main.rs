use std::io::BufRead;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{info, warn};

use puddle::app::cli::Args;
use puddle::app::commands::HELP;
use puddle::app::{parse_command, AppEvent, ConsoleSink, InputCommand};
use puddle::artwork::ArtworkFetcher;
use puddle::config::{AppConfig, UserConfig};
use puddle::player::get_backend;
use puddle::reconciler::PlaybackReconciler;
use puddle::service::{Command, ReconcilerService, ServiceConfig};

#[tokio::main]
async fn main() -> Result<()> {
    human_panic::setup_panic!();
    let args = Args::parse();

    if args.generate_config {
        print!("{}", toml::to_string_pretty(&UserConfig::default())?);
        return Ok(());
    }

    let (mut config, mut state) = AppConfig::load();
    args.apply(&mut config);

    let _log_guard = match puddle::logging::init(&AppConfig::get_log_dir(), &config.log_level) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Logging disabled: {e:#}");
            None
        }
    };
    info!(host = %config.mpd_host, port = config.mpd_port, "starting puddle");

    let backend = get_backend(&config);
    let mut reconciler = PlaybackReconciler::new(backend);
    reconciler.subscribe(Arc::new(ConsoleSink::new()));

    // One HTTP client for every artwork download
    let client = reqwest::Client::builder()
        .user_agent(concat!("puddle/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_default();
    let artwork = ArtworkFetcher::new(client);

    let (handle, task) =
        ReconcilerService::spawn(reconciler, ServiceConfig::from(&config), Some(artwork));

    let _ = handle.set_volume(i32::from(state.volume)).await;
    if let Some(query) = args.query.clone().or_else(|| state.last_query.clone()) {
        let _ = handle.search(query).await;
    }

    let (tx, mut rx) = mpsc::channel(100);

    // Stdin is read on a plain thread: a blocked read must not hold up runtime shutdown.
    let tx_input = tx.clone();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx_input.blocking_send(AppEvent::Input(line)).is_err() {
                return;
            }
        }
        let _ = tx_input.blocking_send(AppEvent::InputClosed);
    });

    let tx_signal = tx;
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = tx_signal.send(AppEvent::Interrupt).await;
        }
    });

    println!("puddle ready. Type `help` for commands.");
    while let Some(event) = rx.recv().await {
        let line = match event {
            AppEvent::Input(line) => line,
            AppEvent::InputClosed | AppEvent::Interrupt => break,
        };

        match parse_command(&line) {
            Ok(InputCommand::Quit) => break,
            Ok(InputCommand::Help) => println!("{HELP}"),
            Ok(InputCommand::Player(command)) => {
                match &command {
                    Command::Search(query) => state.last_query = Some(query.clone()),
                    Command::SetVolume(percent) => state.volume = (*percent).clamp(0, 100) as u8,
                    _ => {}
                }
                if handle.send(command).await.is_err() {
                    warn!("playback service stopped unexpectedly");
                    break;
                }
            }
            Err(message) => println!("{message}"),
        }
    }

    println!();
    task.shutdown().await;
    if let Err(e) = state.save() {
        warn!(error = %e, "failed to save state");
    }
    info!("bye");
    Ok(())
}
