//! All encryption operations use XChaCha20-Poly1305.
//!
//! Every file is sealed under its own freshly generated 32-byte key, so a
//! single key leaking from a manifest row exposes exactly one file. Keys are
//! recorded next to the ciphertext path in the manifest and are never reused.
//!
//! An encrypted file is a self-contained container:
//!
//! - magic number (32 bits, little endian) - marks an encrypted container
//! - nonce (192 bits) - the random nonce chosen for this file
//! - ciphertext followed by the Poly1305 authentication tag
//!
//! Decryption authenticates the whole container; any bit flip in the
//! ciphertext, nonce, or tag makes it fail.

mod cipher;

pub use cipher::{InvalidKeyOrCorruptData, decrypt, encrypt};

use {
    anyhow::{Error, ensure},
    base64::{Engine, prelude::BASE64_STANDARD},
    chacha20poly1305::{Key, KeyInit, XChaCha20Poly1305, aead::OsRng},
    std::{
        fmt::{self, Debug},
        str::FromStr,
    },
};

pub const KEY_LENGTH: usize = 32;

/// Symmetric key for a single file.
///
/// Generated fresh for each encrypted file and stored in base64 in the
/// manifest row for that file.
#[derive(Clone, PartialEq, Eq)]
pub struct FileKey(Key);

impl FileKey {
    #[must_use]
    #[inline]
    pub fn generate() -> Self {
        Self(XChaCha20Poly1305::generate_key(&mut OsRng))
    }

    #[must_use]
    #[inline]
    pub fn encode(&self) -> String {
        BASE64_STANDARD.encode(self.0)
    }

    pub(crate) fn get(&self) -> &Key {
        &self.0
    }
}

impl FromStr for FileKey {
    type Err = Error;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = BASE64_STANDARD.decode(s)?;
        ensure!(
            bytes.len() == KEY_LENGTH,
            "invalid key length; got {}, expected {KEY_LENGTH}",
            bytes.len(),
        );
        Ok(Self(Key::clone_from_slice(&bytes)))
    }
}

impl Debug for FileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileKey").finish()
    }
}
