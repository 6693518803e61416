//! Inspect command implementation.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use glyphseal_core::codec;

use crate::utils;

/// Execute the inspect command: decode a payload without a document.
pub fn execute(payload: String) -> Result<()> {
    // Accept a bare payload, a share link, or a sidecar path.
    let text = if Path::new(&payload).is_file() {
        utils::load_payload(Path::new(&payload))?
    } else {
        payload
    };

    let attestation = codec::decode_payload(codec::extract_payload(&text))
        .context("Failed to decode attestation")?;
    let sizes = codec::size_breakdown(&attestation)?;
    let fit = codec::select_qr_version(sizes.final_size)?;

    println!();
    println!("{}", "Attestation".bold());
    println!("   {} {}", "Version:".dimmed(), attestation.version);
    println!(
        "   {} {} via {}",
        "Identity:".dimmed(),
        attestation.identity.identifier,
        attestation.identity.provider
    );
    if let Some(name) = &attestation.identity.display_name {
        println!("   {} {name}", "Display name:".dimmed());
    }
    println!(
        "   {} {} (key {})",
        "Service:".dimmed(),
        attestation.service.name,
        attestation.service.public_key_id
    );
    println!("   {} {}", "Timestamp:".dimmed(), attestation.timestamp);
    println!(
        "   {} {}",
        "Fingerprint:".dimmed(),
        attestation.hashes.cryptographic
    );
    println!(
        "   {} {}",
        "Perceptual:".dimmed(),
        attestation.hashes.perceptual
    );
    if let Some(zone) = &attestation.exclusion_zone {
        println!(
            "   {} {}x{} at ({}, {})",
            "Exclusion zone:".dimmed(),
            zone.width,
            zone.height,
            zone.x,
            zone.y
        );
    }
    if let Some(url) = &attestation.user_url {
        println!("   {} {url}", "URL:".dimmed());
    }
    println!(
        "   {} {}",
        "Signature:".dimmed(),
        match &attestation.signature {
            Some(sig) => format!("{} bytes", sig.len()),
            None => "missing".red().to_string(),
        }
    );
    println!();
    println!("{}", "Payload".bold());
    println!(
        "   {} {} → {} → {} → {} bytes",
        "Pipeline:".dimmed(),
        sizes.original_size,
        sizes.compact_size,
        sizes.binary_size,
        sizes.final_size
    );
    println!(
        "   {} v{} ({:.0}% of {} bytes)",
        "QR version:".dimmed(),
        fit.version,
        fit.utilization * 100.0,
        fit.capacity
    );

    Ok(())
}
