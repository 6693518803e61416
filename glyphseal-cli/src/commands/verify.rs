//! Verify command implementation.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use tracing::{debug, info};

use glyphseal_core::{VerificationEngine, VerificationReport, VerificationStatus};

use crate::utils;

/// Execute the verify command.
pub async fn execute(
    file: PathBuf,
    payload: Option<String>,
    json: bool,
    quiet: bool,
) -> Result<()> {
    let content = std::fs::read(&file)
        .with_context(|| format!("Failed to read file: {}", file.display()))?;
    info!(path = %file.display(), bytes = content.len(), "Read document");

    let payload = match payload {
        Some(payload) => payload,
        None => {
            let sidecar = utils::payload_path(&file);
            debug!(path = %sidecar.display(), "Loading payload sidecar");
            utils::load_payload(&sidecar)?
        }
    };

    let mime = utils::mime_from_path(&file)?;

    // Hashing large documents is CPU-bound; keep it off the runtime threads.
    let report = tokio::task::spawn_blocking(move || {
        VerificationEngine::default().verify(&content, mime, &payload)
    })
    .await
    .context("verification task failed")?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        );
    } else if !quiet {
        print_report(&report);
    }

    if report.status.is_verified() {
        Ok(())
    } else {
        bail!("verification failed: {}", report.status)
    }
}

fn print_report(report: &VerificationReport) {
    let verdict = report.status.verdict();
    let banner = format!("║  {:^38}  ║", verdict.title);
    let frame_top = "╔══════════════════════════════════════════╗";
    let frame_bottom = "╚══════════════════════════════════════════╝";

    println!();
    match report.status {
        VerificationStatus::VerifiedExact => {
            println!("{}", frame_top.green());
            println!("{}", banner.green().bold());
            println!("{}", frame_bottom.green());
        }
        VerificationStatus::VerifiedVisual => {
            println!("{}", frame_top.yellow());
            println!("{}", banner.yellow().bold());
            println!("{}", frame_bottom.yellow());
        }
        _ => {
            println!("{}", frame_top.red());
            println!("{}", banner.red().bold());
            println!("{}", frame_bottom.red());
        }
    }
    println!();

    let axis = |ok: bool| {
        if ok {
            "valid".green()
        } else {
            "FAILED".red()
        }
    };
    println!(
        "   {} {}",
        "Signature:".dimmed(),
        axis(report.details.signature_valid)
    );
    println!(
        "   {} {}",
        "Exact content match:".dimmed(),
        axis(report.details.cryptographic_match)
    );
    println!(
        "   {} {}",
        "Visual content match:".dimmed(),
        axis(report.details.perceptual_match)
    );

    if let Some(signature) = &report.details.signature_verification {
        println!(
            "   {} {} via {}",
            "Sealed by:".dimmed(),
            signature.identity.identifier,
            signature.identity.provider
        );
        println!("   {} {}", "Sealed at:".dimmed(), signature.timestamp);
        if let Some(error) = &signature.error {
            println!("   {} {}", "Signature error:".dimmed(), error.red());
        }
    }

    println!();
    println!("   {}", verdict.description);
    println!("   {}", verdict.recommendation.italic());
}
