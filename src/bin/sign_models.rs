//! Signing utility for ckd-risk model artifacts.
//!
//! Two subcommands:
//! - `keygen` writes a fresh Ed25519 seed (0600) and optionally the public key
//! - `sign` hashes every file the catalog lists into `manifest.json` and
//!   writes the detached signature `model.sig`
//!
//! # Usage
//!
//! ```bash
//! sign_models keygen --out-seed <path> [--out-pub <path>] [--force]
//! sign_models sign <model_dir> [--serial <u64>]
//! ```
//!
//! The signing seed is read from `CKD_MODEL_SIGNING_KEY_B64_FILE`, or in debug
//! builds from `CKD_MODEL_SIGNING_KEY_B64`. Seed material is zeroized after use.

use std::env;
use std::fs;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use base64::engine::general_purpose;
use base64::Engine;
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use ckd_risk::adapters::artifacts::integrity::{
    build_manifest, write_signed_manifest, MANIFEST_FILE, SIGNATURE_FILE,
};
use ckd_risk::adapters::artifacts::Catalog;

const KEY_FILE_ENV: &str = "CKD_MODEL_SIGNING_KEY_B64_FILE";
const KEY_ENV: &str = "CKD_MODEL_SIGNING_KEY_B64";

const USAGE: &str = "Usage:
  sign_models keygen --out-seed <path> [--out-pub <path>] [--force]
  sign_models sign <model_dir> [--serial <u64>]";

#[derive(Zeroize, ZeroizeOnDrop)]
struct Seed([u8; 32]);

fn main() -> Result<()> {
    let mut args = env::args().skip(1);
    match args.next().as_deref() {
        Some("keygen") => keygen(args),
        Some("sign") => sign(args),
        Some("-h" | "--help") => {
            println!("{USAGE}");
            Ok(())
        }
        _ => bail!("{USAGE}"),
    }
}

fn keygen(mut args: impl Iterator<Item = String>) -> Result<()> {
    let mut out_seed: Option<PathBuf> = None;
    let mut out_pub: Option<PathBuf> = None;
    let mut force = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--out-seed" => out_seed = Some(args.next().ok_or_else(|| anyhow!(USAGE))?.into()),
            "--out-pub" => out_pub = Some(args.next().ok_or_else(|| anyhow!(USAGE))?.into()),
            "--force" => force = true,
            _ => bail!("Unknown arg: {arg}\n{USAGE}"),
        }
    }
    let out_seed = out_seed.ok_or_else(|| anyhow!(USAGE))?;

    for path in std::iter::once(&out_seed).chain(out_pub.as_ref()) {
        if path.exists() && !force {
            bail!("Refusing to overwrite existing file {path:?}. Use --force.");
        }
    }

    let mut seed = Seed([0u8; 32]);
    OsRng.fill_bytes(&mut seed.0);
    let verifying_key = SigningKey::from_bytes(&seed.0).verifying_key();

    let seed_b64 = Zeroizing::new(general_purpose::STANDARD.encode(seed.0));
    let pub_b64 = general_purpose::STANDARD.encode(verifying_key.as_bytes());

    write_line(&out_seed, &seed_b64, 0o600)?;
    println!("Wrote signing seed (base64) to {out_seed:?}");

    if let Some(path) = &out_pub {
        // Public key is non-secret; allow read access.
        write_line(path, &pub_b64, 0o644)?;
        println!("Wrote public key (base64) to {path:?}");
    }

    // Print only non-secret material.
    println!("CKD_MODEL_PUBKEY_B64={pub_b64}");
    Ok(())
}

fn sign(mut args: impl Iterator<Item = String>) -> Result<()> {
    let mut model_dir: Option<PathBuf> = None;
    let mut serial: Option<u64> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--serial" => {
                let v = args.next().ok_or_else(|| anyhow!(USAGE))?;
                serial = Some(v.trim().parse().context("--serial must be a u64")?);
            }
            _ if model_dir.is_none() => model_dir = Some(PathBuf::from(arg)),
            _ => bail!("{USAGE}"),
        }
    }
    let model_dir = model_dir.ok_or_else(|| anyhow!(USAGE))?;

    let seed = read_signing_seed()?;
    let signing_key = SigningKey::from_bytes(&seed.0);

    let catalog = Catalog::read_unverified(&model_dir)?;
    let files = catalog.bound_files();

    let created_at = chrono::Utc::now().timestamp();
    let serial = serial.unwrap_or_else(|| u64::try_from(created_at).unwrap_or(1));

    let manifest = build_manifest(&model_dir, &files, serial, created_at)?;
    write_signed_manifest(&model_dir, &manifest, &signing_key)?;

    println!("Bound {} files: {}", files.len(), files.join(", "));
    println!("Signed manifest: {:?}", model_dir.join(MANIFEST_FILE));
    println!("Wrote signature: {:?}", model_dir.join(SIGNATURE_FILE));
    println!(
        "CKD_MODEL_PUBKEY_B64={}",
        general_purpose::STANDARD.encode(signing_key.verifying_key().as_bytes())
    );
    Ok(())
}

fn read_signing_seed_b64() -> Result<Zeroizing<String>> {
    let secret = if let Ok(path) = env::var(KEY_FILE_ENV) {
        Zeroizing::new(
            fs::read_to_string(path.trim()).context("Failed reading signing key file")?,
        )
    } else if cfg!(debug_assertions) && env::var(KEY_ENV).is_ok() {
        Zeroizing::new(env::var(KEY_ENV)?)
    } else {
        bail!("Missing signing key. Set {KEY_FILE_ENV} (or {KEY_ENV} in debug builds).");
    };

    let trimmed = Zeroizing::new(secret.trim().to_string());
    if trimmed.is_empty() {
        bail!("Empty signing key");
    }
    Ok(trimmed)
}

fn read_signing_seed() -> Result<Seed> {
    let b64 = read_signing_seed_b64()?;
    let raw = Zeroizing::new(
        general_purpose::STANDARD
            .decode(b64.as_bytes())
            .context("Invalid base64 in signing key")?,
    );

    let bytes: [u8; 32] = raw.as_slice().try_into().map_err(|_| {
        anyhow!(
            "Signing key seed must be 32 bytes after base64 decode (got {})",
            raw.len()
        )
    })?;
    Ok(Seed(bytes))
}

fn write_line(path: &Path, content: &str, mode: u32) -> Result<()> {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    let mut opts = fs::OpenOptions::new();
    opts.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        opts.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;

    let mut file = opts
        .open(path)
        .with_context(|| format!("Failed to open {path:?}"))?;
    file.write_all(content.as_bytes())?;
    file.write_all(b"\n")?;
    Ok(())
}
