use {
    super::FileKey,
    anyhow::{Result, anyhow},
    chacha20poly1305::{
        XChaCha20Poly1305, XNonce,
        aead::{Aead, AeadCore, KeyInit, OsRng},
    },
    thiserror::Error,
};

/// File type marker stored at the beginning of every encrypted container.
const MAGIC_NUMBER: u32 = 2_760_648_413;

const NONCE_LENGTH: usize = 24;

/// Length of the Poly1305 tag appended to the ciphertext.
const TAG_LENGTH: usize = 16;

/// The authentication tag did not verify, or the container is not a valid
/// encrypted container in the first place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid key or corrupt data")]
pub struct InvalidKeyOrCorruptData;

/// Encrypts a whole buffer under `key` into a self-contained container
/// (see the module documentation for the layout).
pub fn encrypt(plaintext: &[u8], key: &FileKey) -> Result<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new(key.get());
    let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|_| anyhow!("encryption failed"))?;
    let mut container = Vec::with_capacity(4 + NONCE_LENGTH + ciphertext.len());
    container.extend_from_slice(&MAGIC_NUMBER.to_le_bytes());
    container.extend_from_slice(&nonce);
    container.extend_from_slice(&ciphertext);
    Ok(container)
}

/// Reverses [`encrypt`]. Truncation, an unknown magic number, a wrong key and
/// tampered content are indistinguishable by design and all map to
/// [`InvalidKeyOrCorruptData`].
pub fn decrypt(container: &[u8], key: &FileKey) -> Result<Vec<u8>, InvalidKeyOrCorruptData> {
    if container.len() < 4 + NONCE_LENGTH + TAG_LENGTH {
        return Err(InvalidKeyOrCorruptData);
    }
    let Some((magic, rest)) = container.split_first_chunk::<4>() else {
        return Err(InvalidKeyOrCorruptData);
    };
    if u32::from_le_bytes(*magic) != MAGIC_NUMBER {
        return Err(InvalidKeyOrCorruptData);
    }
    let (nonce, ciphertext) = rest.split_at(NONCE_LENGTH);
    let cipher = XChaCha20Poly1305::new(key.get());
    cipher
        .decrypt(XNonce::from_slice(nonce), ciphertext)
        .map_err(|_| InvalidKeyOrCorruptData)
}
