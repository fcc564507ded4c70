//! Password sources
//!
//! A password never arrives on the command line, where it would be visible
//! in the process listing. It comes from an environment variable, from
//! stdin, or from a no-echo terminal prompt.

use crate::error::{ErrorCategory, ErrorKind, Result, VaultError};
use std::ffi::OsString;
use std::io::{self, IsTerminal, Read, Write};
use zeroize::Zeroizing;

/// Environment variable consulted when no other source is selected.
pub const DEFAULT_PASSWORD_ENV: &str = "VAULT_PASS";

/// Trait for reading passwords from various sources
pub trait PasswordReader {
    /// Read a password as arbitrary bytes (not necessarily UTF-8)
    ///
    /// Returns the password wrapped in `Zeroizing` to ensure it is securely
    /// wiped from memory when dropped.
    fn read_password(&mut self) -> Result<Zeroizing<Vec<u8>>>;
}

/// Returns a fixed password (for testing)
pub struct ConstantPasswordReader {
    password: Zeroizing<Vec<u8>>,
}

impl ConstantPasswordReader {
    pub fn new(password: Vec<u8>) -> Self {
        Self {
            password: Zeroizing::new(password),
        }
    }
}

impl PasswordReader for ConstantPasswordReader {
    fn read_password(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        Ok(Zeroizing::new((*self.password).clone()))
    }
}

/// Reads the password from an environment variable
pub struct EnvPasswordReader {
    var: String,
}

impl EnvPasswordReader {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvPasswordReader {
    fn default() -> Self {
        Self::new(DEFAULT_PASSWORD_ENV)
    }
}

impl PasswordReader for EnvPasswordReader {
    fn read_password(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        let var = &self.var;
        let Some(value) = std::env::var_os(var) else {
            let hint = format!("run with {var}=<password> or use --prompt");
            return Err(VaultError::with_kind(
                ErrorCategory::User,
                ErrorKind::MissingCredential,
                format!("environment variable {var} is not set; {hint}"),
            ));
        };
        os_string_into_bytes(var, value)
    }
}

#[cfg(unix)]
fn os_string_into_bytes(_var: &str, value: OsString) -> Result<Zeroizing<Vec<u8>>> {
    use std::os::unix::ffi::OsStringExt;
    Ok(Zeroizing::new(value.into_vec()))
}

#[cfg(not(unix))]
fn os_string_into_bytes(var: &str, value: OsString) -> Result<Zeroizing<Vec<u8>>> {
    let value = value.into_string().map_err(|_| {
        VaultError::with_kind(
            ErrorCategory::User,
            ErrorKind::MissingCredential,
            format!("environment variable {} is not valid unicode", var),
        )
    })?;
    Ok(Zeroizing::new(value.into_bytes()))
}

/// Reads the password from any io::Read source
///
/// A single trailing line ending is stripped, so `echo "$PW" | dotvault ...`
/// seals with the same password the terminal prompt would produce.
pub struct ReaderPasswordReader {
    reader: Box<dyn Read>,
}

impl ReaderPasswordReader {
    pub fn new(reader: Box<dyn Read>) -> Self {
        Self { reader }
    }
}

impl PasswordReader for ReaderPasswordReader {
    fn read_password(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        let mut data = Zeroizing::new(Vec::new());
        self.reader.read_to_end(&mut data).map_err(|e| {
            VaultError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                "error reading password",
                e,
            )
        })?;
        if data.ends_with(b"\n") {
            data.pop();
            if data.ends_with(b"\r") {
                data.pop();
            }
        }
        Ok(data)
    }
}

/// Reads password from terminal with no echo
pub struct TerminalPasswordReader;

impl TerminalPasswordReader {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TerminalPasswordReader {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordReader for TerminalPasswordReader {
    /// Read password from terminal.
    ///
    /// Note: Terminal input is limited to UTF-8 due to rpassword library constraints.
    /// For non-UTF-8 passwords, use --passphrase-stdin instead.
    fn read_password(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        if !io::stdin().is_terminal() {
            return Err(VaultError::with_kind(
                ErrorCategory::User,
                ErrorKind::MissingCredential,
                "cannot prompt for password - stdin is not a terminal",
            ));
        }

        let mut stderr = io::stderr();
        stderr
            .write_all(b"Password (dotvault): ")
            .and_then(|()| stderr.flush())
            .map_err(|e| {
                VaultError::with_kind_and_source(
                    ErrorCategory::Internal,
                    ErrorKind::Io,
                    "failed to write prompt",
                    e,
                )
            })?;

        // Read password *without echo*
        // Note: rpassword returns String (UTF-8 only), not zeroized
        let password = rpassword::read_password().map_err(|e| {
            VaultError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                "failure reading password",
                e,
            )
        })?;

        Ok(Zeroizing::new(password.into_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_reader() {
        let mut reader = ConstantPasswordReader::new(b"test123".to_vec());
        assert_eq!(&*reader.read_password().unwrap(), b"test123");
        assert_eq!(&*reader.read_password().unwrap(), b"test123");
    }

    /// Tests the terminal reader. This is ignored by default and must be run
    /// explicitly and with human input:
    ///
    /// cargo test test_terminal_reader_interactive -- --ignored --nocapture
    #[test]
    #[ignore]
    fn test_terminal_reader_interactive() {
        let mut reader = TerminalPasswordReader::new();
        println!("\nPlease enter a test password:");
        let password = reader.read_password().unwrap();
        println!("You entered: {}", String::from_utf8_lossy(&password));
        assert!(!password.is_empty(), "Expected non-empty password");
    }

    #[test]
    fn test_reader_password_reader() {
        let data = b"mypassword";
        let mut reader = ReaderPasswordReader::new(Box::new(&data[..]));
        assert_eq!(&*reader.read_password().unwrap(), b"mypassword");
    }

    #[test]
    fn test_reader_password_reader_strips_one_line_ending() {
        let mut reader = ReaderPasswordReader::new(Box::new(&b"mypassword\n"[..]));
        assert_eq!(&*reader.read_password().unwrap(), b"mypassword");

        let mut reader = ReaderPasswordReader::new(Box::new(&b"mypassword\r\n"[..]));
        assert_eq!(&*reader.read_password().unwrap(), b"mypassword");

        let mut reader = ReaderPasswordReader::new(Box::new(&b"mypassword\n\n"[..]));
        assert_eq!(&*reader.read_password().unwrap(), b"mypassword\n");
    }

    #[test]
    fn test_reader_password_reader_empty() {
        let data = b"";
        let mut reader = ReaderPasswordReader::new(Box::new(&data[..]));
        assert_eq!(&*reader.read_password().unwrap(), b"");
    }

    /// Verifies that ReaderPasswordReader accepts arbitrary byte sequences,
    /// not just valid UTF-8.
    #[test]
    fn test_reader_password_reader_non_utf8() {
        let data: &[u8] = &[0xff, 0xfe, 0x00, 0x01];
        let mut reader = ReaderPasswordReader::new(Box::new(data));
        assert_eq!(&*reader.read_password().unwrap(), data);
    }

    #[test]
    fn test_env_reader_missing_variable() {
        let mut reader = EnvPasswordReader::new("DOTVAULT_TEST_SURELY_UNSET_VARIABLE");
        let err = reader.read_password().unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::MissingCredential));
        assert_eq!(err.category, ErrorCategory::User);
        assert!(err.message().contains("DOTVAULT_TEST_SURELY_UNSET_VARIABLE"));
    }

    #[test]
    fn test_env_reader_default_name() {
        let reader = EnvPasswordReader::default();
        assert_eq!(reader.var, "VAULT_PASS");
    }
}
