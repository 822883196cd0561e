// SPDX-FileCopyrightText: 2026 Mesh Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! MESH - a decentralized agent-coordination engine over group chat.
//!
//! This is the binary entry point for the MESH agent.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod serve;

use clap::{Parser, Subcommand};

/// MESH - a decentralized agent-coordination engine over group chat.
#[derive(Parser, Debug)]
#[command(name = "mesh", version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "mesh.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the coordination engine against the configured transport.
    Serve,
    /// Parse and validate the configuration, then exit.
    CheckConfig,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve => {
            if let Err(e) = serve::run(&cli.config).await {
                eprintln!("mesh serve failed: {e}");
                std::process::exit(1);
            }
        }
        Commands::CheckConfig => match mesh_config::load_from_path(&cli.config) {
            Ok(_) => println!("{}: ok", cli.config),
            Err(e) => {
                eprintln!("{}: {e}", cli.config);
                std::process::exit(1);
            }
        },
    }
}
