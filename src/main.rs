// ABOUTME: Entry point for the provisio CLI application.
// ABOUTME: Loads the config, connects, runs the install phases, and maps the outcome to an exit code.

mod cli;

use clap::Parser;
use cli::Cli;
use colored::Colorize;
use provisio::cancel::Cancellation;
use provisio::config::Config;
use provisio::error::Result;
use provisio::install::Installer;
use provisio::output::{Output, OutputMode};
use provisio::ssh::HostKeyPolicy;
use tracing_subscriber::EnvFilter;

/// Exit code for a run stopped by interrupt or deadline (128 + SIGINT).
const EXIT_INTERRUPTED: i32 = 130;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let output = Output::new(cli.output);
    let code = match run(cli, &output).await {
        Ok(()) => {
            output.success("✨ Installation completed successfully!");
            0
        }
        Err(e) if e.is_cancelled() => {
            output.warning(&format!("⚠️ Installation interrupted: {e}"));
            EXIT_INTERRUPTED
        }
        Err(e) => {
            output.error(&format!("❌ Installation failed: {e}"));
            1
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli, output: &Output) -> Result<()> {
    let config = Config::load(&cli.config)?;

    let host_key_policy = if cli.known_hosts.is_some() || cli.trust_first_use {
        HostKeyPolicy::KnownHosts {
            path: cli.known_hosts.clone(),
            trust_on_first_use: cli.trust_first_use,
        }
    } else {
        HostKeyPolicy::AcceptAny
    };

    let session_config = config
        .session_config(&cli.ip, cli.port, &cli.user)
        .host_key_policy(host_key_policy);

    let cancel = match config.run_timeout {
        Some(limit) => Cancellation::new().with_timeout(limit),
        None => Cancellation::new(),
    };
    listen_for_interrupt(cancel.clone(), cli.output);

    output.progress(&format!(
        "🔌 Connecting to {}@{}:{}...",
        cli.user, cli.ip, cli.port
    ));
    let mut installer =
        Installer::connect(session_config, config, Box::new(Output::new(cli.output))).await?;

    output.progress("🚀 Starting installation process...");
    installer.install(&cancel).await?;
    Ok(())
}

/// Set the cancellation flag on SIGINT or SIGTERM. The running command is
/// left to finish; the installer stops before the next one.
fn listen_for_interrupt(cancel: Cancellation, mode: OutputMode) {
    tokio::spawn(async move {
        wait_for_signal().await;
        if mode != OutputMode::Json {
            eprintln!(
                "\n{}",
                "Received interrupt signal, gracefully shutting down...".yellow()
            );
        }
        tracing::info!("interrupt received; stopping after the current command");
        cancel.cancel();
    });
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = terminate.recv() => {}
            }
        }
        Err(e) => {
            tracing::warn!("cannot listen for SIGTERM: {}", e);
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
