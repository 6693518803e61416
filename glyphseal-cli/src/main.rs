//! Glyphseal CLI - document sealing and verification tool.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

mod commands;
mod exit_codes;
mod utils;

#[derive(Parser)]
#[command(name = "glyphseal")]
#[command(author, version, about = "Visually-embedded proof of origin for documents", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seal a document: fingerprint it, sign an attestation, emit the QR payload
    Seal {
        /// Path to the image or PDF to seal
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Corner anchor for the seal graphic
        #[arg(long, default_value = "bottom-right")]
        corner: String,

        /// Seal center, percent from the left edge (overrides --corner)
        #[arg(long)]
        x: Option<f64>,

        /// Seal center, percent from the top edge (overrides --corner)
        #[arg(long)]
        y: Option<f64>,

        /// Seal size, percent of the shorter image dimension (10-35)
        #[arg(long, default_value_t = 15.0)]
        size: f64,

        /// Authenticated identifier (email or handle)
        #[arg(long)]
        identity: String,

        /// Identity provider (google, github, twitter, facebook, linkedin, email)
        #[arg(long, default_value = "email")]
        provider: String,

        /// Display name to show on the seal caption
        #[arg(long)]
        display_name: Option<String>,

        /// Optional URL to include in the attestation
        #[arg(long)]
        url: Option<String>,

        /// Signing endpoint URL (default: GLYPHSEAL_ENDPOINT)
        #[arg(long)]
        endpoint: Option<String>,

        /// Bearer credential for the signing endpoint (default: GLYPHSEAL_TOKEN)
        #[arg(long)]
        token: Option<String>,

        /// Sign with a locally generated throwaway key instead of the endpoint
        #[arg(long)]
        offline: bool,

        /// Suppress decorative output
        #[arg(short, long)]
        quiet: bool,
    },

    /// Verify a document against a seal payload
    Verify {
        /// Path to the document to verify
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// QR payload or share link (defaults to the <FILE>.glyph sidecar)
        #[arg(value_name = "PAYLOAD")]
        payload: Option<String>,

        /// Print the full verification report as JSON
        #[arg(long)]
        json: bool,

        /// Suppress decorative output
        #[arg(short, long)]
        quiet: bool,
    },

    /// Decode and display an attestation payload without a document
    Inspect {
        /// QR payload, share link, or path to a .glyph sidecar
        #[arg(value_name = "PAYLOAD")]
        payload: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Seal {
            file,
            corner,
            x,
            y,
            size,
            identity,
            provider,
            display_name,
            url,
            endpoint,
            token,
            offline,
            quiet,
        } => {
            commands::seal::execute(commands::seal::SealArgs {
                file,
                corner,
                x,
                y,
                size,
                identity,
                provider,
                display_name,
                url,
                endpoint,
                token,
                offline,
                quiet,
            })
            .await
        }
        Commands::Verify {
            file,
            payload,
            json,
            quiet,
        } => commands::verify::execute(file, payload, json, quiet).await,
        Commands::Inspect { payload } => commands::inspect::execute(payload),
    };

    if let Err(err) = result {
        let exit = exit_codes::ExitCode::from_anyhow(&err);
        if let Some(message) = &exit.message {
            eprintln!("{} {message}", "error:".red().bold());
        }
        std::process::exit(exit.code);
    }
}
