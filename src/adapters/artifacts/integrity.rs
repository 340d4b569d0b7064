//! Artifact integrity: signed manifest binding every artifact file by hash.
//!
//! `manifest.json` lists each artifact with its SHA-256 digest and is signed
//! with Ed25519 (`model.sig`, 64 raw bytes). Files are only parsed after their
//! bytes match the digest the signed manifest promised.
//!
//! Unsigned directories load only in debug builds and only when the caller
//! explicitly asks for it.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::ArtifactError;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const SIGNATURE_FILE: &str = "model.sig";
pub const MANIFEST_VERSION: u32 = 1;

/// How the loader establishes trust in an artifact directory.
#[derive(Debug, Clone)]
pub enum Verification {
    /// Require a manifest signed by this key.
    Signed(VerifyingKey),
    /// Accept a directory without a signature. Digests are still checked when
    /// a manifest is present.
    Unsigned,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelManifest {
    pub version: u32,
    /// Monotonic release number of the artifact set.
    pub serial: u64,
    /// Unix timestamp (seconds) of signing.
    pub created_at: i64,
    /// Relative file name to lowercase hex SHA-256.
    pub files: BTreeMap<String, String>,
}

#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Decode a base64 Ed25519 verifying key.
///
/// # Errors
/// Returns `ArtifactError::Signature` if the text is not a valid key.
pub fn verifying_key_from_b64(b64: &str) -> Result<VerifyingKey, ArtifactError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(b64.trim())
        .map_err(|_| ArtifactError::Signature("Invalid public key base64".into()))?;
    let key: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
        ArtifactError::Signature("Invalid public key length (expected 32 bytes)".into())
    })?;
    VerifyingKey::from_bytes(&key)
        .map_err(|_| ArtifactError::Signature("Invalid verifying key".into()))
}

/// Establish trust in `dir` and return the manifest, if any.
///
/// # Errors
/// Returns `ArtifactError` if the signature is required but missing or
/// invalid, or the manifest is malformed.
pub fn verify_directory(
    dir: &Path,
    verification: &Verification,
) -> Result<Option<ModelManifest>, ArtifactError> {
    let manifest_path = dir.join(MANIFEST_FILE);
    let sig_path = dir.join(SIGNATURE_FILE);

    let key = match verification {
        Verification::Signed(key) => key,
        Verification::Unsigned => {
            if !manifest_path.exists() {
                tracing::warn!(
                    "Loading UNSIGNED artifacts from {:?} without a manifest",
                    dir
                );
                return Ok(None);
            }
            let bytes = read(&manifest_path)?;
            tracing::warn!("Loading artifacts from {:?} without checking the signature", dir);
            return parse_manifest(&bytes).map(Some);
        }
    };

    if !manifest_path.exists() || !sig_path.exists() {
        return Err(ArtifactError::Signature(format!(
            "{MANIFEST_FILE} and {SIGNATURE_FILE} are required in {}",
            dir.display()
        )));
    }

    let sig_bytes = read(&sig_path)?;
    let sig_array: [u8; 64] = sig_bytes.as_slice().try_into().map_err(|_| {
        ArtifactError::Signature("Invalid signature length (expected 64 bytes)".into())
    })?;
    let signature = Signature::from_bytes(&sig_array);

    let manifest_bytes = read(&manifest_path)?;
    key.verify(&manifest_bytes, &signature)
        .map_err(|_| ArtifactError::Signature("Invalid artifact signature".into()))?;

    let manifest = parse_manifest(&manifest_bytes)?;
    tracing::info!(
        "Verified artifact manifest (serial={}, created_at={}, files={})",
        manifest.serial,
        manifest.created_at,
        manifest.files.len()
    );
    Ok(Some(manifest))
}

fn parse_manifest(bytes: &[u8]) -> Result<ModelManifest, ArtifactError> {
    let manifest: ModelManifest = serde_json::from_slice(bytes)
        .map_err(|e| ArtifactError::Manifest(format!("Invalid {MANIFEST_FILE}: {e}")))?;
    if manifest.version != MANIFEST_VERSION {
        return Err(ArtifactError::Manifest(format!(
            "Unsupported manifest version: {}",
            manifest.version
        )));
    }
    Ok(manifest)
}

/// Hash `files` in `dir` into a manifest.
///
/// # Errors
/// Returns `ArtifactError` if a file name is not plain or cannot be read.
pub fn build_manifest(
    dir: &Path,
    files: &[&str],
    serial: u64,
    created_at: i64,
) -> Result<ModelManifest, ArtifactError> {
    let mut digests = BTreeMap::new();
    for name in files {
        let bytes = read_bound(dir, name, None)?;
        digests.insert((*name).to_string(), sha256_hex(&bytes));
    }
    Ok(ModelManifest {
        version: MANIFEST_VERSION,
        serial,
        created_at,
        files: digests,
    })
}

/// Write `manifest.json` and its detached signature into `dir`.
///
/// # Errors
/// Returns `ArtifactError` if either file cannot be written.
pub fn write_signed_manifest(
    dir: &Path,
    manifest: &ModelManifest,
    key: &SigningKey,
) -> Result<(), ArtifactError> {
    let bytes = serde_json::to_vec_pretty(manifest)
        .map_err(|e| ArtifactError::Manifest(format!("Failed to serialize {MANIFEST_FILE}: {e}")))?;
    let signature = key.sign(&bytes);

    write(&dir.join(MANIFEST_FILE), &bytes)?;
    write(&dir.join(SIGNATURE_FILE), &signature.to_bytes())
}

/// Read an artifact file, checking it against the manifest when one exists.
///
/// # Errors
/// Returns `ArtifactError::Unbound` if the manifest does not list the file and
/// `ArtifactError::Digest` if its bytes do not match.
pub fn read_bound(
    dir: &Path,
    name: &str,
    manifest: Option<&ModelManifest>,
) -> Result<Vec<u8>, ArtifactError> {
    check_file_name(name)?;
    let bytes = read(&dir.join(name))?;

    if let Some(manifest) = manifest {
        let expected = manifest
            .files
            .get(name)
            .ok_or_else(|| ArtifactError::Unbound(name.to_string()))?;
        if !expected.eq_ignore_ascii_case(&sha256_hex(&bytes)) {
            return Err(ArtifactError::Digest(name.to_string()));
        }
    }
    Ok(bytes)
}

/// Artifact names are plain file names inside the artifact directory.
fn check_file_name(name: &str) -> Result<(), ArtifactError> {
    let plain = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && Path::new(name).is_relative();
    if plain {
        Ok(())
    } else {
        Err(ArtifactError::Manifest(format!(
            "Artifact name {name:?} must be a plain file name"
        )))
    }
}

fn read(path: &Path) -> Result<Vec<u8>, ArtifactError> {
    fs::read(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write(path: &Path, bytes: &[u8]) -> Result<(), ArtifactError> {
    fs::write(path, bytes).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })
}
