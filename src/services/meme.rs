//! Meme fetching for the meme loop

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{MemeProvider, ServiceError};

const DEFAULT_ENDPOINT: &str = "https://meme-api.com/gimme";

#[derive(Deserialize)]
struct MemeResponse {
    url: String,
}

/// Meme provider backed by the meme-api.com random endpoint
pub struct MemeApiProvider {
    client: reqwest::Client,
    endpoint: String,
}

impl MemeApiProvider {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }
}

impl Default for MemeApiProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MemeProvider for MemeApiProvider {
    async fn fetch_one(&self) -> Result<String, ServiceError> {
        let response: MemeResponse = self
            .client
            .get(&self.endpoint)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if response.url.is_empty() {
            return Err(ServiceError::UnexpectedResponse(
                "meme response without url".to_string(),
            ));
        }

        debug!(url = %response.url, "meme fetched");
        Ok(response.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_parsing() {
        let response: MemeResponse =
            serde_json::from_str(r#"{"url":"https://i.redd.it/x.jpg","title":"t"}"#).unwrap();
        assert_eq!(response.url, "https://i.redd.it/x.jpg");
    }
}
