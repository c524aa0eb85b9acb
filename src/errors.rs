use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur in Cask.
#[derive(Debug, Error)]
pub enum CaskError {
    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Authentication failed — ciphertext rejected")]
    AuthenticationFailed,

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("Random source unavailable: {0}")]
    RandomUnavailable(String),

    // --- Vault file errors ---
    #[error("Vault not found at {0}")]
    VaultNotFound(PathBuf),

    #[error("Vault already exists at {0}")]
    VaultAlreadyExists(PathBuf),

    /// Wrong passphrase and tampered data are deliberately reported the same way.
    #[error("Unable to open vault — wrong passphrase or corrupted file")]
    UnableToOpen,

    #[error("Invalid vault format: {0}")]
    CorruptFormat(String),

    #[error("Vault is closed")]
    VaultClosed,

    // --- Lock errors ---
    #[error(
        "{} is open in another session! Exit that session first, or remove {} if you are certain no other session holds it.",
        .0.display(),
        crate::lock::marker_path(.0).display()
    )]
    Locked(PathBuf),

    #[error("Lock on {0} was lost — refusing to overwrite the vault")]
    LockLost(PathBuf),

    // --- Entry errors ---
    #[error("Location '{0}' not found")]
    LocationNotFound(String),

    #[error("Location '{0}' already exists (use `edit` to change it)")]
    DuplicateLocation(String),

    #[error("Invalid location: {0}")]
    InvalidLocation(String),

    #[error("Metadata '{key}' not found on '{location}'")]
    MetadataNotFound { location: String, key: String },

    #[error("Metadata '{key}' already exists on '{location}' (use `editmeta` to change it)")]
    MetadataExists { location: String, key: String },

    #[error("Wrong passphrase")]
    WrongPassphrase,

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- Session / command errors ---
    #[error("Unknown command '{0}' — type `help` for a list of commands")]
    UnknownCommand(String),

    #[error("Usage: {0}")]
    Usage(String),

    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Clipboard error: {0}")]
    Clipboard(String),

    #[error("Interrupted before the session started")]
    Interrupted,

    /// A prompt was dismissed without an answer.
    #[error("User cancelled operation")]
    UserCancelled,
}

/// Convenience type alias for Cask results.
pub type Result<T> = std::result::Result<T, CaskError>;
