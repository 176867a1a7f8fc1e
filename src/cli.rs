// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines the target host, config path, and output options.

use clap::Parser;
use provisio::output::OutputMode;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "provisio")]
#[command(about = "Provision a remote host over SSH from a phased YAML command list")]
#[command(version)]
pub struct Cli {
    /// Remote server IP address or hostname
    #[arg(long)]
    pub ip: String,

    /// SSH port number
    #[arg(short, long, default_value_t = 22)]
    pub port: u16,

    /// Path to configuration YAML file
    #[arg(short, long)]
    pub config: PathBuf,

    /// SSH username
    #[arg(short, long, default_value = "root")]
    pub user: String,

    /// Output mode
    #[arg(long, value_enum, default_value_t = OutputMode::Normal)]
    pub output: OutputMode,

    /// Verify the host key against this known_hosts file
    #[arg(long)]
    pub known_hosts: Option<PathBuf>,

    /// Record unknown host keys instead of rejecting them (implies verification)
    #[arg(long)]
    pub trust_first_use: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}
