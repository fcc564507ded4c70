//! On-disk envelope format
//!
//! An envelope is a single line of four hex fields joined by `:`:
//!
//! ```text
//! <salt:32 bytes>:<nonce:12 bytes>:<tag:16 bytes>:<ciphertext>
//! ```
//!
//! The ciphertext field is empty when the sealed plaintext was empty. The
//! format is free of whitespace and safe to pass unescaped in a POSIX shell.

use crate::error::{ErrorCategory, ErrorKind, Result, VaultError};
use crate::kdf::SALT_LEN;
use std::fmt;
use std::str::FromStr;

/// Length of the AES-GCM nonce in bytes
pub const NONCE_LEN: usize = 12;

/// Length of the AES-GCM authentication tag in bytes
pub const TAG_LEN: usize = 16;

/// Field delimiter; never part of the hex alphabet.
const DELIMITER: &str = ":";

const FIELD_COUNT: usize = 4;

/// A parsed envelope: everything needed, besides the password, to recover
/// the plaintext.
#[derive(Clone, PartialEq, Eq)]
pub struct Envelope {
    pub salt: [u8; SALT_LEN],
    pub nonce: [u8; NONCE_LEN],
    pub tag: [u8; TAG_LEN],
    pub ciphertext: Vec<u8>,
}

impl Envelope {
    /// Serialize to `hex(salt):hex(nonce):hex(tag):hex(ciphertext)`.
    pub fn encode(&self) -> String {
        let fields = [
            hex::encode(self.salt),
            hex::encode(self.nonce),
            hex::encode(self.tag),
            hex::encode(&self.ciphertext),
        ];
        fields.join(DELIMITER)
    }

    /// Parse the serialized form.
    ///
    /// A single trailing line ending is tolerated. Everything else that is
    /// not exactly four hex fields of the right sizes is rejected.
    pub fn decode(serialized: &str) -> Result<Self> {
        let line = strip_line_ending(serialized);
        let fields: Vec<&str> = line.split(DELIMITER).collect();
        if fields.len() != FIELD_COUNT {
            return Err(malformed(format!(
                "expected {} fields separated by '{}', found {}",
                FIELD_COUNT,
                DELIMITER,
                fields.len()
            )));
        }

        let salt = decode_fixed::<SALT_LEN>("salt", fields[0])?;
        let nonce = decode_fixed::<NONCE_LEN>("nonce", fields[1])?;
        let tag = decode_fixed::<TAG_LEN>("tag", fields[2])?;
        let ciphertext = decode_field("ciphertext", fields[3])?;

        Ok(Self {
            salt,
            nonce,
            tag,
            ciphertext,
        })
    }
}

impl FromStr for Envelope {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self> {
        Self::decode(s)
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

// Lengths only; salt and nonce are not secret but there is no reason to
// spray them into logs either.
impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Envelope")
            .field("ciphertext_len", &self.ciphertext.len())
            .finish_non_exhaustive()
    }
}

fn strip_line_ending(s: &str) -> &str {
    s.strip_suffix("\r\n")
        .or_else(|| s.strip_suffix('\n'))
        .unwrap_or(s)
}

fn decode_field(name: &str, field: &str) -> Result<Vec<u8>> {
    hex::decode(field).map_err(|e| {
        VaultError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::MalformedEnvelope,
            format!("{} field is not valid hex", name),
            e,
        )
    })
}

fn decode_fixed<const N: usize>(name: &str, field: &str) -> Result<[u8; N]> {
    let bytes = decode_field(name, field)?;
    let len = bytes.len();
    bytes.try_into().map_err(|_| wrong_length(name, N, len))
}

fn wrong_length(name: &str, expected: usize, found: usize) -> VaultError {
    let msg = format!("{name} must be {expected} bytes, found {found} bytes");
    malformed(msg)
}

fn malformed(msg: String) -> VaultError {
    VaultError::with_kind(ErrorCategory::User, ErrorKind::MalformedEnvelope, msg)
}
