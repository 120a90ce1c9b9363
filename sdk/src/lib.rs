//! Building blocks for per-file directory encryption: the cipher, the key
//! manifest, and the storage providers that hold manifests between an
//! encryption run and the matching decryption run.

pub mod crypto;
pub mod manifest;
pub mod provider;
