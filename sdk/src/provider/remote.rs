use {
    super::{ProviderError, ProviderResult},
    fs_err as fs,
    reqwest::multipart::{Form, Part},
    serde::Deserialize,
    std::{collections::BTreeMap, path::Path, time::Duration},
    tracing::debug,
    url::Url,
};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Pixeldrain-style HTTP file host.
///
/// The manifest is uploaded as a multipart POST. Once the host has confirmed
/// the upload, the local manifest copy is removed: from that point on,
/// decryption must re-fetch the manifest by id.
#[derive(Debug, Clone)]
pub struct RemoteProvider {
    name: String,
    http: reqwest::Client,
    upload_url: Url,
    /// Download endpoint template; `{id}` is replaced with the manifest id.
    download_url: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    success: bool,
    id: Option<String>,
    link: Option<String>,
    message: Option<String>,
}

impl RemoteProvider {
    pub fn new(name: &str, upload_url: Url, download_url: String) -> Result<Self, ProviderError> {
        Ok(Self {
            name: name.to_owned(),
            http: reqwest::Client::builder().timeout(DEFAULT_TIMEOUT).build()?,
            upload_url,
            download_url,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn upload(&self, manifest_path: &Path) -> Result<ProviderResult, ProviderError> {
        let content = fs::read(manifest_path)?;
        let file_name = manifest_path.file_name().map_or_else(
            || "manifest.csv".to_owned(),
            |name| name.to_string_lossy().into_owned(),
        );
        let form = Form::new().part("file", Part::bytes(content).file_name(file_name));
        let response = self
            .http
            .post(self.upload_url.clone())
            .multipart(form)
            .send()
            .await?;
        let status = response.status();
        let payload: UploadResponse = response.json().await.map_err(|err| {
            ProviderError::UploadFailed(format!(
                "response was not valid JSON (status {status}): {err}"
            ))
        })?;
        if !payload.success {
            return Err(ProviderError::UploadFailed(payload.message.unwrap_or_else(
                || format!("server reported failure (status {status})"),
            )));
        }
        let id = payload.id.ok_or_else(|| {
            ProviderError::UploadFailed("response did not contain a file id".to_owned())
        })?;
        let destination = payload
            .link
            .unwrap_or_else(|| self.download_target(&id));
        // The local copy is gone from here on; restoring requires the id.
        fs::remove_file(manifest_path)?;
        debug!(
            "removed local manifest {} after confirmed upload",
            manifest_path.display()
        );
        Ok(ProviderResult {
            provider: self.name.clone(),
            destination,
            metadata: BTreeMap::from([("id".to_owned(), id)]),
        })
    }

    pub async fn download(&self, id: &str) -> Result<String, ProviderError> {
        let response = self.http.get(self.download_target(id)).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::NotFound(format!("{id} (status {status})")));
        }
        Ok(response.text().await?)
    }

    fn download_target(&self, id: &str) -> String {
        self.download_url.replace("{id}", id)
    }
}
