#![allow(clippy::missing_errors_doc)]

use std::{error::Error, fmt};

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use overworld_world::persistence::{MemoryStore, SaveError};

const SNAPSHOT_DOMAIN: &str = "overworld";
const SNAPSHOT_VERSION: &str = "v1";

/// Identifier prefix emitted before the encoded save payload.
pub(crate) const SNAPSHOT_HEADER: &str = "overworld:v1";
/// Delimiter used to separate the prefix from the payload.
const FIELD_DELIMITER: char = ':';

/// Encodes a save map into a single line suitable for copying between machines.
pub(crate) fn encode(store: &MemoryStore) -> Result<String, SaveTransferError> {
    let json = store.to_json().map_err(SaveTransferError::InvalidPayload)?;
    let encoded = STANDARD_NO_PAD.encode(json);
    Ok(format!("{SNAPSHOT_HEADER}{FIELD_DELIMITER}{encoded}"))
}

/// Decodes a save map produced by [`encode`].
pub(crate) fn decode(value: &str) -> Result<MemoryStore, SaveTransferError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(SaveTransferError::EmptyPayload);
    }

    let mut parts = trimmed.splitn(3, FIELD_DELIMITER);
    let domain = parts.next().ok_or(SaveTransferError::MissingPrefix)?;
    let version = parts.next().ok_or(SaveTransferError::MissingVersion)?;
    let payload = parts.next().ok_or(SaveTransferError::MissingPayload)?;

    if domain != SNAPSHOT_DOMAIN {
        return Err(SaveTransferError::InvalidPrefix(domain.to_owned()));
    }
    if version != SNAPSHOT_VERSION {
        return Err(SaveTransferError::UnsupportedVersion(version.to_owned()));
    }

    let bytes = STANDARD_NO_PAD
        .decode(payload.as_bytes())
        .map_err(SaveTransferError::InvalidEncoding)?;
    let json = String::from_utf8(bytes).map_err(|_| SaveTransferError::InvalidText)?;
    MemoryStore::from_json(&json).map_err(SaveTransferError::InvalidPayload)
}

/// Errors that can occur while transferring save strings.
#[derive(Debug)]
pub(crate) enum SaveTransferError {
    /// The provided string was empty or contained only whitespace.
    EmptyPayload,
    /// The prefix segment was missing from the encoded save.
    MissingPrefix,
    /// The encoded save did not contain a version segment.
    MissingVersion,
    /// The encoded save did not include the payload segment.
    MissingPayload,
    /// The encoded save used an unexpected prefix segment.
    InvalidPrefix(String),
    /// The encoded save used an unsupported version identifier.
    UnsupportedVersion(String),
    /// The base64 payload could not be decoded.
    InvalidEncoding(base64::DecodeError),
    /// The decoded payload is not UTF-8 text.
    InvalidText,
    /// The payload is not a valid save map.
    InvalidPayload(SaveError),
}

impl fmt::Display for SaveTransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPayload => write!(f, "save string was empty"),
            Self::MissingPrefix => write!(f, "save string is missing the prefix"),
            Self::MissingVersion => write!(f, "save string is missing the version"),
            Self::MissingPayload => write!(f, "save string is missing the payload"),
            Self::InvalidPrefix(prefix) => write!(f, "save prefix '{prefix}' is not supported"),
            Self::UnsupportedVersion(version) => {
                write!(f, "save version '{version}' is not supported")
            }
            Self::InvalidEncoding(error) => write!(f, "could not decode save payload: {error}"),
            Self::InvalidText => write!(f, "save payload is not valid UTF-8"),
            Self::InvalidPayload(error) => write!(f, "could not parse save payload: {error}"),
        }
    }
}

impl Error for SaveTransferError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidEncoding(error) => Some(error),
            Self::InvalidPayload(error) => Some(error),
            _ => None,
        }
    }
}
