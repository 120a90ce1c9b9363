//! Storage backends for manifests.
//!
//! A manifest is uploaded once at the end of an encryption run and fetched
//! again at the start of a decryption run. Backends form a closed set of
//! variants behind one interface; adding a backend means adding a variant
//! here, not string-matching elsewhere.

mod remote;

pub use remote::RemoteProvider;

use {
    fs_err as fs,
    std::{
        collections::BTreeMap,
        io,
        path::{Path, PathBuf},
    },
    thiserror::Error,
    url::Url,
};

/// Failure in manifest storage or retrieval.
///
/// Any of these is a run-level error: per-file work already done is kept,
/// nothing is rolled back.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("unknown provider `{0}`; available providers: pixeldrain, local")]
    UnknownProvider(String),
    #[error("manifest not found: {0}")]
    NotFound(String),
    #[error("manifest upload failed: {0}")]
    UploadFailed(String),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Where a successfully uploaded manifest ended up.
#[derive(Debug, Clone)]
pub struct ProviderResult {
    pub provider: String,
    /// URL (remote) or filesystem path (local) of the manifest.
    pub destination: String,
    pub metadata: BTreeMap<String, String>,
}

/// A manifest storage backend.
#[derive(Debug, Clone)]
pub enum Provider {
    Remote(RemoteProvider),
    Local(LocalProvider),
}

impl Provider {
    /// Selects a provider by its configured name.
    pub fn from_name(
        name: &str,
        upload_url: &Url,
        download_url: &str,
    ) -> Result<Self, ProviderError> {
        match name.to_ascii_lowercase().as_str() {
            "pixeldrain" => Ok(Self::Remote(RemoteProvider::new(
                name,
                upload_url.clone(),
                download_url.to_owned(),
            )?)),
            "local" => Ok(Self::Local(LocalProvider)),
            _ => Err(ProviderError::UnknownProvider(name.to_owned())),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Remote(remote) => remote.name(),
            Self::Local(_) => "local",
        }
    }

    /// Stores the manifest file and reports where it ended up.
    pub async fn upload(&self, manifest_path: &Path) -> Result<ProviderResult, ProviderError> {
        match self {
            Self::Remote(remote) => remote.upload(manifest_path).await,
            Self::Local(local) => local.upload(manifest_path),
        }
    }

    /// Fetches manifest content by identifier: a remote file id, or a
    /// filesystem path for the local provider.
    pub async fn download(&self, id: &str) -> Result<String, ProviderError> {
        match self {
            Self::Remote(remote) => remote.download(id).await,
            Self::Local(local) => local.download(id),
        }
    }
}

/// Filesystem passthrough: the manifest simply stays where it was written.
#[derive(Debug, Clone, Copy)]
pub struct LocalProvider;

impl LocalProvider {
    fn upload(&self, manifest_path: &Path) -> Result<ProviderResult, ProviderError> {
        let metadata = fs::metadata(manifest_path).map_err(not_found_or_io(manifest_path))?;
        Ok(ProviderResult {
            provider: "local".to_owned(),
            destination: manifest_path.display().to_string(),
            metadata: BTreeMap::from([("bytes".to_owned(), metadata.len().to_string())]),
        })
    }

    fn download(&self, path: &str) -> Result<String, ProviderError> {
        let path = PathBuf::from(path);
        fs::read_to_string(&path).map_err(not_found_or_io(&path))
    }
}

fn not_found_or_io(path: &Path) -> impl FnOnce(io::Error) -> ProviderError {
    let path = path.display().to_string();
    move |err| {
        if err.kind() == io::ErrorKind::NotFound {
            ProviderError::NotFound(path)
        } else {
            ProviderError::Io(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use {super::*, tempfile::TempDir};

    fn default_upload_url() -> Url {
        "https://pixeldrain.com/api/file".parse().unwrap()
    }

    #[test]
    fn selects_provider_by_name() {
        let url = default_upload_url();
        let template = "https://pixeldrain.com/api/file/{id}";
        assert!(matches!(
            Provider::from_name("pixeldrain", &url, template).unwrap(),
            Provider::Remote(_)
        ));
        assert!(matches!(
            Provider::from_name("PixelDrain", &url, template).unwrap(),
            Provider::Remote(_)
        ));
        assert!(matches!(
            Provider::from_name("local", &url, template).unwrap(),
            Provider::Local(_)
        ));
        assert!(matches!(
            Provider::from_name("dropbox", &url, template),
            Err(ProviderError::UnknownProvider(_))
        ));
    }

    #[tokio::test]
    async fn local_upload_keeps_the_manifest_in_place() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("manifest.csv");
        fs::write(&path, "a.pazuzu,key\n").unwrap();
        let provider = Provider::Local(LocalProvider);
        let result = provider.upload(&path).await.unwrap();
        assert_eq!(result.provider, "local");
        assert_eq!(result.destination, path.display().to_string());
        assert!(path.exists());
    }

    #[tokio::test]
    async fn local_upload_of_missing_manifest_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.csv");
        let provider = Provider::Local(LocalProvider);
        assert!(matches!(
            provider.upload(&path).await,
            Err(ProviderError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn local_download_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("manifest.csv");
        fs::write(&path, "content").unwrap();
        let provider = Provider::Local(LocalProvider);
        let content = provider.download(&path.display().to_string()).await.unwrap();
        assert_eq!(content, "content");
        assert!(matches!(
            provider.download("/does/not/exist.csv").await,
            Err(ProviderError::NotFound(_))
        ));
    }
}
