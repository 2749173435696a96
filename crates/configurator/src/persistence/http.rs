use reqwest::StatusCode;
use shared::{SceneConfig, SceneKey};

use super::{validate_key, PersistenceError, SceneStore};

/// Remote scene-state service: `{base}/api/scene-state/{tenant}/{type}/{id}`
#[derive(Debug, Clone)]
pub struct HttpSceneStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSceneStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn url_for(&self, key: &SceneKey) -> Result<String, PersistenceError> {
        validate_key(key)?;
        Ok(format!(
            "{}/api/scene-state/{}/{}/{}",
            self.base_url, key.tenant_id, key.entity_type, key.entity_id
        ))
    }
}

impl SceneStore for HttpSceneStore {
    async fn load(&self, key: &SceneKey) -> Result<Option<serde_json::Value>, PersistenceError> {
        let url = self.url_for(key)?;
        let response = self.client.get(&url).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.json().await?)),
            status => Err(PersistenceError::Status(status.as_u16())),
        }
    }

    async fn save(&self, key: &SceneKey, config: &SceneConfig) -> Result<(), PersistenceError> {
        let url = self.url_for(key)?;
        let response = self.client.put(&url).json(config).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PersistenceError::Status(status.as_u16()));
        }
        tracing::debug!(%key, "scene saved remotely");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_layout() {
        let store = HttpSceneStore::new("http://localhost:3001/");
        let url = store.url_for(&SceneKey::new("acme", "quote-line", "42")).unwrap();
        assert_eq!(url, "http://localhost:3001/api/scene-state/acme/quote-line/42");
        assert!(store.url_for(&SceneKey::new("acme", "a/b", "1")).is_err());
    }
}
