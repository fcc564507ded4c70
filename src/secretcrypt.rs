//! Sealing and opening envelopes using scrypt + AES-256-GCM
//!
//! Every seal draws a fresh 32-byte salt and 12-byte nonce from the OS
//! random source, so the key (and thus the key/nonce pair) is never reused
//! across envelopes even when the password is.
//!
//! The GCM tag is kept detached from the ciphertext; no associated data is
//! authenticated.

use crate::envelope::{Envelope, NONCE_LEN, TAG_LEN};
use crate::error::{ErrorCategory, ErrorKind, Result, VaultError};
use crate::kdf::{self, SALT_LEN};
use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce, Tag};
use rand::RngCore;
use rand::rngs::OsRng;
use tracing::debug;
use zeroize::Zeroizing;

/// The single message for every tag verification failure. Wrong passwords
/// and damaged envelopes must stay indistinguishable.
const AUTH_FAILED_MSG: &str =
    "wrong password, or the envelope is corrupt or has been tampered with";

/// Seal plaintext with a password using a random salt and nonce.
pub fn seal(password: &[u8], plaintext: &[u8]) -> Result<Envelope> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    seal_deterministic(password, plaintext, &salt, &nonce)
}

/// Seal plaintext with a password using the provided salt and nonce.
///
/// This function is ONLY for testing purposes to generate deterministic output.
/// NEVER use this in production - always use `seal()` which generates random salt/nonce.
pub fn seal_deterministic(
    password: &[u8],
    plaintext: &[u8],
    salt: &[u8; SALT_LEN],
    nonce: &[u8; NONCE_LEN],
) -> Result<Envelope> {
    let key = kdf::derive_key(password, salt)?;
    let cipher = new_cipher(&key)?;

    let mut ciphertext = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(Nonce::from_slice(nonce), b"", &mut ciphertext)
        .map_err(|_| cipher_error("encryption failed"))?;
    drop(cipher);
    drop(key);

    let mut tag_bytes = [0u8; TAG_LEN];
    tag_bytes.copy_from_slice(&tag);

    debug!(plaintext_len = plaintext.len(), "sealed envelope");

    Ok(Envelope {
        salt: *salt,
        nonce: *nonce,
        tag: tag_bytes,
        ciphertext,
    })
}

/// Parse a serialized envelope and open it with a password.
///
/// The envelope is fully validated before any key derivation happens.
pub fn open(password: &[u8], serialized: &str) -> Result<Zeroizing<Vec<u8>>> {
    let envelope = Envelope::decode(serialized)?;
    open_envelope(password, &envelope)
}

/// Open an already parsed envelope with a password.
pub fn open_envelope(password: &[u8], envelope: &Envelope) -> Result<Zeroizing<Vec<u8>>> {
    let key = kdf::derive_key(password, &envelope.salt)?;
    let cipher = new_cipher(&key)?;

    let mut plaintext = Zeroizing::new(envelope.ciphertext.clone());
    let verified = cipher.decrypt_in_place_detached(
        Nonce::from_slice(&envelope.nonce),
        b"",
        &mut plaintext[..],
        Tag::from_slice(&envelope.tag),
    );
    drop(cipher);
    drop(key);

    if verified.is_err() {
        return Err(VaultError::with_kind(
            ErrorCategory::User,
            ErrorKind::AuthenticationFailed,
            AUTH_FAILED_MSG,
        ));
    }

    debug!(plaintext_len = plaintext.len(), "opened envelope");

    Ok(plaintext)
}

fn new_cipher(key: &[u8; kdf::KEY_LEN]) -> Result<Aes256Gcm> {
    Aes256Gcm::new_from_slice(key).map_err(|_| cipher_error("failed to create cipher"))
}

fn cipher_error(msg: &str) -> VaultError {
    VaultError::with_kind(ErrorCategory::Internal, ErrorKind::Cipher, msg)
}
