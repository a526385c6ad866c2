use super::{ArtifactOptions, ArtifactService};
use crate::errors::Error;
use async_trait::async_trait;
use url::Url;

/// Backend whose artifacts are addressed by URL alone: the prompt becomes the last
/// path segment and the seed a query parameter, so equal prompts give equal references.
#[derive(Debug, Clone)]
pub struct UrlTemplateArtifactService {
    base: Url,
}

impl UrlTemplateArtifactService {
    pub fn new(base_url: &str) -> Result<Self, Error> {
        let base = Url::parse(base_url)?;
        if base.cannot_be_a_base() {
            return Err(Error::Config(format!("'{}' cannot be a base URL", base_url)));
        }
        Ok(Self { base })
    }

    fn build(&self, prompt: &str, opts: &ArtifactOptions, reference_image: Option<&str>) -> Result<String, Error> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Artifact("base URL has no path".to_string()))?
            .pop_if_empty()
            .push(prompt);
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("seed", &opts.seed.to_string());
            if let Some(model) = &opts.model {
                query.append_pair("model", model);
            }
            if let Some(image) = reference_image {
                query.append_pair("image", image);
            }
        }
        Ok(url.to_string())
    }
}

#[async_trait]
impl ArtifactService for UrlTemplateArtifactService {
    async fn generate(&self, prompt: &str, opts: &ArtifactOptions) -> Result<String, Error> {
        self.build(prompt, opts, None)
    }

    async fn edit(&self, prompt: &str, opts: &ArtifactOptions) -> Result<String, Error> {
        let reference = opts
            .mask
            .as_ref()
            .and_then(|m| m.reference_image_url.as_deref());
        self.build(prompt, opts, reference)
    }
}
