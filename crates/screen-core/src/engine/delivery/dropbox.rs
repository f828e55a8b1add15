use super::{Delivery, DeliveryError};
use crate::engine::config::BINDERS_DIR_NAME;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::info;

const UPLOAD_URL: &str = "https://content.dropboxapi.com/2/files/upload";
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Uploads promoted files to `/<folder>/binders/` of a Dropbox app folder.
pub struct DropboxDelivery {
    client: Client,
    access_token: String,
    folder: String,
}

impl DropboxDelivery {
    pub fn new(access_token: String, folder: String) -> Result<Self, DeliveryError> {
        if access_token.trim().is_empty() {
            return Err(DeliveryError::Setup(
                "Dropbox delivery requires an access token".to_string(),
            ));
        }
        let client = Client::builder()
            .timeout(UPLOAD_TIMEOUT)
            .build()
            .map_err(|e| DeliveryError::Setup(e.to_string()))?;
        Ok(Self {
            client,
            access_token,
            folder,
        })
    }

    fn upload(&self, file: &Path) -> Result<(), DeliveryError> {
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let remote = remote_path(&self.folder, &name);
        let body = fs::read(file).map_err(|source| DeliveryError::Io {
            path: file.to_path_buf(),
            source,
        })?;
        let api_arg = serde_json::json!({
            "path": remote,
            "mode": "overwrite",
            "autorename": false,
            "mute": true,
        });

        let response = self
            .client
            .post(UPLOAD_URL)
            .bearer_auth(&self.access_token)
            .header("Dropbox-API-Arg", api_arg.to_string())
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(body)
            .send()
            .map_err(|e| DeliveryError::Transport {
                path: file.to_path_buf(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(DeliveryError::Rejected {
                path: file.to_path_buf(),
                status: status.as_u16(),
                body,
            });
        }
        info!("Uploaded {:?} to Dropbox at {}.", file, remote);
        Ok(())
    }
}

impl Delivery for DropboxDelivery {
    fn name(&self) -> &'static str {
        "dropbox"
    }

    fn deliver(&self, files: &[&Path]) -> Result<(), DeliveryError> {
        files.iter().try_for_each(|file| self.upload(file))
    }
}

fn remote_path(folder: &str, file_name: &str) -> String {
    let folder = folder.trim_matches('/');
    if folder.is_empty() {
        format!("/{}/{}", BINDERS_DIR_NAME, file_name)
    } else {
        format!("/{}/{}/{}", folder, BINDERS_DIR_NAME, file_name)
    }
}
