//! Seal command implementation.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use image::GenericImageView;
use tracing::{debug, info, warn};

use glyphseal_core::{
    codec, compute_hashes, corner_anchors, seal_attestation, seal_rect, CanvasSize, CornerAnchor,
    DocumentKind, ExclusionZone, HttpSigningClient, Identity, IdentityProvider, LocalSigner,
    SealPlacement, ServiceInfo, SigningClientConfig, UnsignedAttestation,
};

use crate::utils;

/// Name this client reports in the attestation's service info.
const SERVICE_NAME: &str = "glyphseal";

pub struct SealArgs {
    pub file: PathBuf,
    pub corner: String,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub size: f64,
    pub identity: String,
    pub provider: String,
    pub display_name: Option<String>,
    pub url: Option<String>,
    pub endpoint: Option<String>,
    pub token: Option<String>,
    pub offline: bool,
    pub quiet: bool,
}

fn parse_corner(value: &str) -> Result<CornerAnchor> {
    CornerAnchor::ALL
        .into_iter()
        .find(|anchor| anchor.label() == value)
        .with_context(|| {
            format!(
                "unknown corner '{value}' (expected one of: top-left, top-right, \
                 bottom-left, bottom-right)"
            )
        })
}

/// Compute the exclusion zone for a raster document.
fn image_zone(content: &[u8], args: &SealArgs) -> Result<ExclusionZone> {
    let (width, height) = image::load_from_memory(content)
        .context("Failed to read image dimensions")?
        .dimensions();
    let canvas = CanvasSize::new(width, height);

    let placement = match (args.x, args.y) {
        (Some(x), Some(y)) => SealPlacement {
            x_percent: x,
            y_percent: y,
            size_percent: args.size,
        },
        (None, None) => {
            let corner = parse_corner(&args.corner)?;
            corner_anchors(args.size, canvas)
                .into_iter()
                .find(|(anchor, _)| *anchor == corner)
                .map(|(_, placement)| placement)
                .context("corner anchor not found")?
        }
        _ => bail!("--x and --y must be given together"),
    };

    let rect = seal_rect(placement, canvas);
    debug!(?rect, "Computed seal geometry");
    Ok(ExclusionZone::white(rect.x, rect.y, rect.width, rect.height))
}

/// Execute the seal command.
pub async fn execute(args: SealArgs) -> Result<()> {
    let content = std::fs::read(&args.file)
        .with_context(|| format!("Failed to read file: {}", args.file.display()))?;

    let mime = utils::mime_from_path(&args.file)?;
    let kind = DocumentKind::from_mime(mime)?;
    info!(path = %args.file.display(), bytes = content.len(), %kind, "Read document");

    let zone = match kind {
        DocumentKind::Image => Some(image_zone(&content, &args)?),
        DocumentKind::MultiPage => None,
    };

    let hashes = compute_hashes(kind, &content, zone.as_ref())
        .context("Failed to fingerprint the document")?;
    debug!(cryptographic = %hashes.cryptographic, "Computed fingerprint");

    let identity = Identity {
        provider: IdentityProvider::parse(&args.provider)?,
        identifier: args.identity.clone(),
        display_name: args.display_name.clone(),
    };
    let mut attestation = UnsignedAttestation::new(
        hashes,
        identity,
        ServiceInfo {
            name: SERVICE_NAME.into(),
            public_key_id: "pending".into(),
        },
    );
    if let Some(zone) = zone {
        attestation = attestation.with_exclusion_zone(zone);
    }
    if let Some(url) = &args.url {
        attestation = attestation.with_user_url(url.clone());
    }

    let endpoint = args
        .endpoint
        .clone()
        .or_else(|| std::env::var("GLYPHSEAL_ENDPOINT").ok());
    let token = args
        .token
        .clone()
        .or_else(|| std::env::var("GLYPHSEAL_TOKEN").ok());

    let signed = match endpoint {
        Some(endpoint) if !args.offline => {
            info!(%endpoint, "Signing via remote endpoint");
            let mut config = SigningClientConfig::new(endpoint);
            if let Some(token) = token {
                config = config.with_credential(token);
            }
            let client = HttpSigningClient::new(config)?;
            seal_attestation(attestation, &client).await?
        }
        _ => {
            warn!("Signing with a locally generated throwaway key");
            if !args.quiet {
                eprintln!(
                    "{}",
                    "Signing offline with a throwaway key (not tied to a service identity)"
                        .yellow()
                );
            }
            let signer = LocalSigner::generate("local");
            seal_attestation(attestation, &signer).await?
        }
    };

    let payload = codec::encode_payload(&signed)?;
    let fit = codec::select_qr_version(payload.len())?;
    let sizes = codec::size_breakdown(&signed)?;

    let payload_file = utils::payload_path(&args.file);
    std::fs::write(&payload_file, &payload)
        .with_context(|| format!("Failed to write payload file: {}", payload_file.display()))?;
    info!(path = %payload_file.display(), "Payload saved");

    if !args.quiet {
        println!();
        println!("{}", "Document sealed".green().bold());
        println!();
        println!("   {} {}", "Payload saved:".dimmed(), payload_file.display());
        println!(
            "   {} {}",
            "Fingerprint:".dimmed(),
            &signed.hashes.cryptographic[..16]
        );
        println!(
            "   {} v{} ({} / {} bytes, {:.0}% used)",
            "QR version:".dimmed(),
            fit.version,
            payload.len(),
            fit.capacity,
            fit.utilization * 100.0
        );
        println!(
            "   {} {} → {} → {} → {} bytes",
            "Pipeline:".dimmed(),
            sizes.original_size,
            sizes.compact_size,
            sizes.binary_size,
            sizes.final_size
        );
        println!("   {} {}", "Signed at:".dimmed(), signed.timestamp);
    }

    Ok(())
}
