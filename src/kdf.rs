//! Password-based key derivation using scrypt
//!
//! The cost parameters match those of existing vault files (Node's
//! `crypto.scryptSync` defaults) and are not recorded in the envelope, so
//! changing them makes every previously sealed file unreadable.

use crate::error::{ErrorCategory, ErrorKind, Result, VaultError};
use scrypt::{Params, scrypt};
use zeroize::Zeroizing;

/// Length of salt in bytes
pub const SALT_LEN: usize = 32;

/// Length of derived key in bytes
pub const KEY_LEN: usize = 32;

/// scrypt log2(N) parameter (CPU/memory cost), N = 16384
const SCRYPT_LOG_N: u8 = 14;

/// scrypt r parameter (block size)
const SCRYPT_R: u32 = 8;

/// scrypt p parameter (parallelization)
const SCRYPT_P: u32 = 1;

/// Derive a 32-byte key from a password and salt using scrypt.
///
/// The key is wiped from memory when the returned value is dropped.
pub fn derive_key(password: &[u8], salt: &[u8; SALT_LEN]) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    let params = Params::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P, KEY_LEN).map_err(|e| {
        VaultError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::KeyDerivation,
            "invalid scrypt parameters",
            e,
        )
    })?;

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    scrypt(password, salt, &params, &mut key[..]).map_err(|e| {
        VaultError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::KeyDerivation,
            "scrypt key derivation failed",
            e,
        )
    })?;

    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_inputs_same_key() {
        let salt = [7u8; SALT_LEN];
        let k1 = derive_key(b"hunter2", &salt).unwrap();
        let k2 = derive_key(b"hunter2", &salt).unwrap();
        assert_eq!(*k1, *k2);
    }

    #[test]
    fn test_different_password_different_key() {
        let salt = [7u8; SALT_LEN];
        let k1 = derive_key(b"hunter2", &salt).unwrap();
        let k2 = derive_key(b"hunter3", &salt).unwrap();
        assert_ne!(*k1, *k2);
    }

    #[test]
    fn test_different_salt_different_key() {
        let k1 = derive_key(b"hunter2", &[1u8; SALT_LEN]).unwrap();
        let k2 = derive_key(b"hunter2", &[2u8; SALT_LEN]).unwrap();
        assert_ne!(*k1, *k2);
    }

    #[test]
    fn test_empty_password_still_derives() {
        let key = derive_key(b"", &[0u8; SALT_LEN]).unwrap();
        assert_ne!(*key, [0u8; KEY_LEN]);
    }

    #[test]
    fn test_known_vector() {
        // scrypt("test", 0x42 * 32, N=16384, r=8, p=1, dkLen=32), as computed
        // by Node's crypto.scryptSync.
        let key = derive_key(b"test", &[0x42u8; SALT_LEN]).unwrap();
        assert_eq!(
            hex::encode(*key),
            "bb5029b9cfd0aeba20846eb72d9fed799c0888323494f4759f2afb1d380a9152"
        );
    }
}
