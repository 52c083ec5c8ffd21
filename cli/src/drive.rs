use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use medvault_core::archive::BACKUP_FILE_NAME;
use medvault_core::service::RemoteArchiveStore;

/// Client for a drive-style file API. Each account gets its own file
/// namespace; the backup archive is addressed by its fixed name within
/// it.
pub struct DriveClient {
    client: reqwest::Client,
    rt: tokio::runtime::Handle,
    base_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct FileList {
    files: Vec<FileEntry>,
}

#[derive(Debug, Deserialize)]
struct FileEntry {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct CreatedFile {
    id: String,
}

impl DriveClient {
    pub fn new(endpoint: &str, token: &str, account: &str) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(format!("medvault-cli/{}", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(10))
            .connect_timeout(std::time::Duration::from_secs(5))
            .build()
            .expect("Failed to build HTTP client");
        Self {
            client,
            rt: tokio::runtime::Handle::current(),
            base_url: format!("{}/accounts/{account}/files", endpoint.trim_end_matches('/')),
            token: token.to_string(),
        }
    }

    async fn find_async(&self) -> Result<Option<String>> {
        let resp = self
            .client
            .get(&self.base_url)
            .bearer_auth(&self.token)
            .query(&[("name", BACKUP_FILE_NAME)])
            .send()
            .await
            .context("Failed to reach remote storage")?
            .error_for_status()
            .context("Remote storage rejected the listing request")?;

        let data: FileList = resp
            .json()
            .await
            .context("Failed to parse remote file listing")?;

        Ok(data
            .files
            .into_iter()
            .find(|f| f.name == BACKUP_FILE_NAME)
            .map(|f| f.id))
    }

    async fn upload_async(&self, archive: &Path) -> Result<String> {
        let content = tokio::fs::read(archive)
            .await
            .with_context(|| format!("Failed to read archive {}", archive.display()))?;

        // Upsert: overwrite the existing fixed-named entry when present.
        if let Some(id) = self.find_async().await? {
            self.client
                .put(format!("{}/{id}", self.base_url))
                .bearer_auth(&self.token)
                .body(content)
                .send()
                .await
                .context("Failed to reach remote storage")?
                .error_for_status()
                .context("Remote storage rejected the overwrite")?;
            return Ok(id);
        }

        let resp = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.token)
            .query(&[("name", BACKUP_FILE_NAME)])
            .body(content)
            .send()
            .await
            .context("Failed to reach remote storage")?
            .error_for_status()
            .context("Remote storage rejected the upload")?;

        let created: CreatedFile = resp
            .json()
            .await
            .context("Failed to parse remote upload response")?;
        Ok(created.id)
    }

    async fn download_async(&self, id: &str, dest: &Path) -> Result<()> {
        let resp = self
            .client
            .get(format!("{}/{id}/content", self.base_url))
            .bearer_auth(&self.token)
            .send()
            .await
            .context("Failed to reach remote storage")?
            .error_for_status()
            .context("Remote storage rejected the download")?;

        let bytes = resp
            .bytes()
            .await
            .context("Failed to read remote archive content")?;
        tokio::fs::write(dest, &bytes)
            .await
            .with_context(|| format!("Failed to write {}", dest.display()))?;
        Ok(())
    }

    async fn delete_async(&self) -> Result<()> {
        let Some(id) = self.find_async().await? else {
            bail!("No backup found in cloud storage");
        };
        self.client
            .delete(format!("{}/{id}", self.base_url))
            .bearer_auth(&self.token)
            .send()
            .await
            .context("Failed to reach remote storage")?
            .error_for_status()
            .context("Remote storage rejected the delete")?;
        Ok(())
    }
}

// block_in_place keeps the blocking bridge legal when called from a
// runtime worker thread; it requires the multi-thread runtime.
impl RemoteArchiveStore for DriveClient {
    fn find(&self) -> Result<Option<String>> {
        tokio::task::block_in_place(|| self.rt.block_on(self.find_async()))
    }

    fn upload(&self, archive: &Path) -> Result<String> {
        tokio::task::block_in_place(|| self.rt.block_on(self.upload_async(archive)))
    }

    fn download(&self, id: &str, dest: &Path) -> Result<()> {
        tokio::task::block_in_place(|| self.rt.block_on(self.download_async(id, dest)))
    }

    fn delete(&self) -> Result<()> {
        tokio::task::block_in_place(|| self.rt.block_on(self.delete_async()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_list_parses() {
        let raw = r#"{"files":[{"id":"abc","name":"medvault_backup.zip"},{"id":"def","name":"other.bin"}]}"#;
        let list: FileList = serde_json::from_str(raw).unwrap();
        assert_eq!(list.files.len(), 2);
        assert_eq!(list.files[0].id, "abc");
        assert_eq!(list.files[0].name, BACKUP_FILE_NAME);
    }

    #[test]
    fn test_created_file_parses_with_extra_fields() {
        let raw = r#"{"id":"abc","name":"medvault_backup.zip","size":1024}"#;
        let created: CreatedFile = serde_json::from_str(raw).unwrap();
        assert_eq!(created.id, "abc");
    }

    #[tokio::test]
    async fn test_base_url_trims_trailing_slash() {
        let client = DriveClient::new("https://drive.example/api/", "tok", "alice");
        assert_eq!(
            client.base_url,
            "https://drive.example/api/accounts/alice/files"
        );
    }
}
