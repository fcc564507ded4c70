//! File encryption/decryption operations
//!
//! This module provides high-level file operations for sealing, opening,
//! and updating files in the envelope format.
//!
//! Every destination is written atomically: the content goes to a temp file
//! in the destination directory, is fsynced, and is then renamed into place.
//! A failed operation leaves the destination untouched.

use crate::envelope::Envelope;
use crate::error::{ErrorCategory, ErrorKind, Result, VaultError};
use crate::passphrase::PasswordReader;
use crate::secretcrypt;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tracing::debug;
use zeroize::Zeroizing;

/// Conventional plaintext path, relative to the working directory.
pub const DEFAULT_PLAIN_PATH: &str = ".env";

/// Conventional envelope path, relative to the working directory.
pub const DEFAULT_ENVELOPE_PATH: &str = ".env.enc";

/// Encrypt a file with a password
///
/// Reads plaintext from `input_path`, seals it using a password from
/// `password_reader`, and writes the envelope to `output_path`.
///
/// The output file is created with mode 0o600 (read/write for owner only) on Unix systems.
pub fn encrypt_file(
    input_path: &Path,
    output_path: &Path,
    password_reader: &mut dyn PasswordReader,
) -> Result<()> {
    let plaintext = read_source(input_path)?;
    let password = read_password(password_reader)?;
    let envelope = secretcrypt::seal(&password, &plaintext)
        .map_err(|e| e.with_context("encryption failed"))?;
    write_file_atomic(output_path, envelope.encode().as_bytes())
        .map_err(|e| e.with_context(format!("failed to write to {}", output_path.display())))?;

    debug!(input = %input_path.display(), output = %output_path.display(), "encrypted file");
    Ok(())
}

/// Decrypt a file with a password
///
/// Reads an envelope from `input_path`, opens it using a password from
/// `password_reader`, and writes the plaintext to `output_path`.
///
/// The envelope is parsed before the password is requested, so a malformed
/// file is reported without prompting.
///
/// The output file is created with mode 0o600 (read/write for owner only) on Unix systems.
pub fn decrypt_file(
    input_path: &Path,
    output_path: &Path,
    password_reader: &mut dyn PasswordReader,
) -> Result<()> {
    let envelope = read_envelope(input_path)?;
    let password = read_password(password_reader)?;
    let plaintext = secretcrypt::open_envelope(&password, &envelope)
        .map_err(|e| e.with_context("failed to decrypt"))?;
    write_file_atomic(output_path, &plaintext)
        .map_err(|e| e.with_context(format!("failed to write to {}", output_path.display())))?;

    debug!(input = %input_path.display(), output = %output_path.display(), "decrypted file");
    Ok(())
}

/// Update an encrypted file with new plaintext using the same password
///
/// This function:
/// 1. Opens the existing envelope at `crypt_path` to validate the password
/// 2. Reads new plaintext from `plain_path`
/// 3. Seals the new plaintext with the validated password (fresh salt and nonce)
/// 4. Atomically replaces `crypt_path`
///
/// The password validation prevents accidental password changes.
pub fn update_file(
    plain_path: &Path,
    crypt_path: &Path,
    password_reader: &mut dyn PasswordReader,
) -> Result<()> {
    let envelope = read_envelope(crypt_path)?;
    let password = read_password(password_reader)?;

    // Validate password by opening the existing envelope (discard plaintext)
    secretcrypt::open_envelope(&password, &envelope)
        .map_err(|e| e.with_context("failed to decrypt existing envelope"))?;

    let new_plaintext = read_source(plain_path)?;
    let new_envelope = secretcrypt::seal(&password, &new_plaintext)
        .map_err(|e| e.with_context("encryption failed"))?;
    write_file_atomic(crypt_path, new_envelope.encode().as_bytes())
        .map_err(|e| e.with_context(format!("failed to write to {}", crypt_path.display())))?;

    debug!(input = %plain_path.display(), output = %crypt_path.display(), "updated envelope");
    Ok(())
}

fn read_source(path: &Path) -> Result<Zeroizing<Vec<u8>>> {
    let bytes = fs::read(path).map_err(|e| read_error(path, e))?;
    Ok(Zeroizing::new(bytes))
}

fn read_envelope(path: &Path) -> Result<Envelope> {
    let bytes = fs::read(path).map_err(|e| read_error(path, e))?;
    let text = String::from_utf8(bytes).map_err(|e| {
        VaultError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::MalformedEnvelope,
            format!("{} is not a valid envelope", path.display()),
            e,
        )
    })?;
    Envelope::decode(&text)
        .map_err(|e| e.with_context(format!("{} is not a valid envelope", path.display())))
}

fn read_password(reader: &mut dyn PasswordReader) -> Result<Zeroizing<Vec<u8>>> {
    let password = reader.read_password()?;
    if password.is_empty() {
        return Err(VaultError::with_kind(
            ErrorCategory::User,
            ErrorKind::MissingCredential,
            "password is empty",
        ));
    }
    Ok(password)
}

/// Write a file atomically (tempfile + fsync + rename), with mode 0o600 on Unix.
fn write_file_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp_file = tempfile::NamedTempFile::new_in(dir).map_err(|e| {
        VaultError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::Io,
            format!("failed to create tempfile in {}", dir.display()),
            e,
        )
    })?;

    temp_file.write_all(contents).map_err(|e| {
        VaultError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to write to tempfile",
            e,
        )
    })?;
    // Flush and fsync() such that the rename later, if it succeeds, will
    // always point to a valid file.
    temp_file.flush().map_err(|e| {
        VaultError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to flush tempfile",
            e,
        )
    })?;
    temp_file.as_file().sync_all().map_err(|e| {
        VaultError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to sync file prior to rename",
            e,
        )
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp_file
            .as_file()
            .set_permissions(fs::Permissions::from_mode(0o600))
            .map_err(|e| {
                VaultError::with_kind_and_source(
                    ErrorCategory::Internal,
                    ErrorKind::Io,
                    "failed to set tempfile permissions",
                    e,
                )
            })?;
    }

    temp_file.persist(path).map_err(|e| {
        VaultError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            format!("failed to rename to target file {}", path.display()),
            e,
        )
    })?;
    Ok(())
}

fn read_error(path: &Path, err: io::Error) -> VaultError {
    if err.kind() == io::ErrorKind::NotFound {
        return VaultError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::SourceNotFound,
            format!("source file {} not found", path.display()),
            err,
        );
    }
    VaultError::with_kind_and_source(
        ErrorCategory::Internal,
        ErrorKind::Io,
        format!("failed to read from {}", path.display()),
        err,
    )
}
