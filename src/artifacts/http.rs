use super::{ArtifactOptions, ArtifactService};
use crate::errors::Error;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

/// Backend reached through a JSON HTTP API exposing `generate` and `edit` endpoints
#[derive(Debug, Clone)]
pub struct HttpArtifactService {
    client: Client,
    base: Url,
}

impl HttpArtifactService {
    pub fn new(base_url: &str) -> Result<Self, Error> {
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        Ok(Self {
            client: Client::new(),
            base: Url::parse(&normalized)?,
        })
    }

    async fn call(&self, endpoint: &str, prompt: &str, opts: &ArtifactOptions) -> Result<String, Error> {
        let url = self.base.join(endpoint)?;
        let mut body = json!({
            "prompt": prompt,
            "seed": opts.seed,
        });
        if let Some(model) = &opts.model {
            body["model"] = json!(model);
        }
        if let Some(mask) = &opts.mask {
            body["mask"] = json!(mask.base64);
            if let Some(reference) = &mask.reference_image_url {
                body["referenceImageUrl"] = json!(reference);
            }
        }
        debug!("POST {}", url);

        let res = self.client.post(url).json(&body).send().await?;
        if !res.status().is_success() {
            let text = res.text().await?;
            return Err(Error::Artifact(format!("{} failed: {}", endpoint, text)));
        }
        let json_resp: Value = res.json().await?;
        artifact_ref_from(&json_resp)
            .ok_or_else(|| Error::Artifact("No artifact reference in response".to_string()))
    }
}

fn artifact_ref_from(response: &Value) -> Option<String> {
    ["url", "artifactRef"]
        .iter()
        .find_map(|key| response[*key].as_str())
        .filter(|r| !r.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl ArtifactService for HttpArtifactService {
    async fn generate(&self, prompt: &str, opts: &ArtifactOptions) -> Result<String, Error> {
        self.call("generate", prompt, opts).await
    }

    async fn edit(&self, prompt: &str, opts: &ArtifactOptions) -> Result<String, Error> {
        self.call("edit", prompt, opts).await
    }
}
