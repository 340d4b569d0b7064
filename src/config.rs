//! Runtime configuration read from the environment.

use std::fs;
use std::path::{Path, PathBuf};

use crate::adapters::artifacts::integrity::verifying_key_from_b64;
use crate::adapters::artifacts::Verification;
use crate::adapters::ArtifactError;

pub const MODEL_PATH_ENV: &str = "CKD_MODEL_PATH";
pub const LOG_MODE_ENV: &str = "CKD_LOG_MODE";
pub const LOG_FILE_ENV: &str = "CKD_LOG_FILE";
pub const PUBKEY_ENV: &str = "CKD_MODEL_PUBKEY_B64";
pub const PUBKEY_FILE_ENV: &str = "CKD_MODEL_PUBKEY_B64_FILE";
pub const ALLOW_UNSIGNED_MODELS_ENV: &str = "CKD_ALLOW_UNSIGNED_MODELS";

const DEFAULT_MODEL_PATH: &str = "models";
const DEFAULT_LOG_FILE: &str = "ckd-risk.log";

/// Where log output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    /// File when attached to a terminal, stdout otherwise.
    Auto,
    File,
    Stdout,
}

impl LogMode {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "file" => Self::File,
            "stdout" => Self::Stdout,
            _ => Self::Auto,
        }
    }

    /// Writing to the terminal would corrupt the TUI's alternate screen.
    #[must_use]
    pub fn use_file(self, interactive: bool) -> bool {
        match self {
            Self::File => true,
            Self::Stdout => false,
            Self::Auto => interactive,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub model_path: PathBuf,
    pub log_mode: LogMode,
    pub log_file: PathBuf,
    pub pubkey_b64: Option<String>,
    pub pubkey_file: Option<PathBuf>,
    /// Only ever true in debug builds.
    pub allow_unsigned: bool,
}

impl AppConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let allow_unsigned = cfg!(debug_assertions)
            && non_empty(ALLOW_UNSIGNED_MODELS_ENV).is_some_and(|v| v.trim() == "true");

        Self {
            model_path: non_empty(MODEL_PATH_ENV)
                .map_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH), PathBuf::from),
            log_mode: non_empty(LOG_MODE_ENV).map_or(LogMode::Auto, |v| LogMode::parse(&v)),
            log_file: non_empty(LOG_FILE_ENV)
                .map_or_else(|| PathBuf::from(DEFAULT_LOG_FILE), PathBuf::from),
            pubkey_b64: non_empty(PUBKEY_ENV),
            pubkey_file: non_empty(PUBKEY_FILE_ENV).map(|v| PathBuf::from(v.trim())),
            allow_unsigned,
        }
    }

    /// Resolve how the artifact directory must be verified.
    ///
    /// A key file takes precedence over an inline key. Without either, loading
    /// is refused unless unsigned artifacts were explicitly allowed.
    ///
    /// # Errors
    /// Returns `ArtifactError` if the key cannot be read or decoded, or if no
    /// key is configured and unsigned loading is not allowed.
    pub fn verification(&self) -> Result<Verification, ArtifactError> {
        if let Some(path) = &self.pubkey_file {
            let b64 = read_key_file(path)?;
            return verifying_key_from_b64(&b64).map(Verification::Signed);
        }
        if let Some(b64) = &self.pubkey_b64 {
            return verifying_key_from_b64(b64).map(Verification::Signed);
        }
        if self.allow_unsigned {
            tracing::warn!(
                "No verifying key configured; {ALLOW_UNSIGNED_MODELS_ENV}=true allows unsigned \
                 artifacts. This is only honoured in debug builds."
            );
            return Ok(Verification::Unsigned);
        }
        Err(ArtifactError::Signature(format!(
            "No verifying key configured. Set {PUBKEY_ENV} or {PUBKEY_FILE_ENV}."
        )))
    }
}

fn read_key_file(path: &Path) -> Result<String, ArtifactError> {
    fs::read_to_string(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })
}
