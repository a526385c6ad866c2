use crate::config::{load_style_catalog, AppConfig};
use crate::core::styles::seed_styles;
use crate::errors::Error;
use crate::llm::{embedder_from_config, Embedder};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

/// A knowledge-base entry pairing a style label with reference prompt text
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StyleRecord {
    pub id: String,
    pub label: String,
    pub prompt_fragment: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(skip)]
    pub embedding: Vec<f32>,
    pub is_system_protected: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted when adding a style record
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewStyleRecord {
    #[serde(default)]
    pub id: Option<String>,
    pub label: String,
    pub prompt_fragment: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default)]
    pub is_system_protected: bool,
}

/// Partial update of a style record; `None` leaves the field untouched
#[derive(Clone, Debug, Default)]
pub struct StyleUpdate {
    pub label: Option<String>,
    pub prompt_fragment: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub metadata: Option<Map<String, Value>>,
}

/// How raw vectors are turned into a similarity score
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    /// True cosine similarity between the raw vectors
    #[default]
    Cosine,
    /// Euclidean distance mapped through `1 / (1 + distance / scale)`
    Distance,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SearchOptions {
    pub limit: usize,
    pub min_similarity: f64,
}

/// A scored match returned by a similarity search
#[derive(Clone, Debug, PartialEq)]
pub struct SearchResult {
    pub id: String,
    pub label: String,
    pub prompt_fragment: String,
    pub similarity: f64,
    pub metadata: Map<String, Value>,
}

/// Nearest-neighbour search and CRUD over style records
#[async_trait]
pub trait SimilaritySearch: Send + Sync {
    /// Returns at most `limit` results with `similarity >= min_similarity`,
    /// sorted by descending similarity
    async fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchResult>, Error>;

    async fn add(&self, record: NewStyleRecord) -> Result<StyleRecord, Error>;

    /// Updates a record; protected records only accept description, tags and metadata
    async fn update(&self, id: &str, update: StyleUpdate) -> Result<StyleRecord, Error>;

    /// Deletes a record; protected records can never be deleted
    async fn delete(&self, id: &str) -> Result<(), Error>;

    async fn get(&self, id: &str) -> Option<StyleRecord>;

    async fn list(&self) -> Vec<StyleRecord>;
}

/// Calculates cosine similarity between two vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        (dot / (norm_a * norm_b)) as f64
    }
}

pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| ((x - y) as f64).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Monotonic transform from a distance to a similarity in (0, 1]
pub fn similarity_from_distance(distance: f64, scale_factor: f64) -> f64 {
    let scale = if scale_factor > 0.0 { scale_factor } else { 1.0 };
    1.0 / (1.0 + distance.max(0.0) / scale)
}

/// Text that is embedded for a record
pub fn embedding_text(label: &str, prompt_fragment: &str, description: Option<&str>) -> String {
    let mut text = format!("{} {}", label, prompt_fragment);
    if let Some(desc) = description.filter(|d| !d.trim().is_empty()) {
        text.push(' ');
        text.push_str(desc);
    }
    text
}

/// In-memory style index shared by every workflow instance
#[derive(Debug)]
pub struct InMemoryStyleIndex {
    records: RwLock<Vec<StyleRecord>>,
    /// Serializes add/update/delete across the whole table
    writes: Mutex<()>,
    embedder: Arc<dyn Embedder>,
    metric: SimilarityMetric,
    distance_scale: f64,
}

impl InMemoryStyleIndex {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self::with_metric(embedder, SimilarityMetric::Cosine, 1.0)
    }

    pub fn with_metric(
        embedder: Arc<dyn Embedder>,
        metric: SimilarityMetric,
        distance_scale: f64,
    ) -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            writes: Mutex::new(()),
            embedder,
            metric,
            distance_scale,
        }
    }

    /// Seed catalog plus the records of `styles_file`, embedded with the configured embedder.
    ///
    /// Catalog records go through `add`, so an id clashing with a seed style is an error.
    pub async fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let index = Self::with_metric(
            embedder_from_config(&config.embedder)?,
            config.retrieval.metric,
            config.retrieval.distance_scale,
        );
        index.bootstrap(seed_styles()).await?;
        if let Some(path) = &config.styles_file {
            for record in load_style_catalog(path)? {
                index.add(record).await?;
            }
        }
        info!("Style index ready with {} records", index.len().await);
        Ok(index)
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Adds many records with a single batch embedding call
    pub async fn bootstrap(&self, records: Vec<NewStyleRecord>) -> Result<usize, Error> {
        if records.is_empty() {
            return Ok(0);
        }
        let _guard = self.writes.lock().await;
        let texts: Vec<String> = records
            .iter()
            .map(|r| embedding_text(&r.label, &r.prompt_fragment, r.description.as_deref()))
            .collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != records.len() {
            return Err(Error::Embedding(format!(
                "expected {} embeddings, got {}",
                records.len(),
                embeddings.len()
            )));
        }

        let mut table = self.records.write().await;
        let mut added = 0;
        for (record, embedding) in records.into_iter().zip(embeddings) {
            let record = Self::materialize(record, embedding);
            if table.iter().any(|r| r.id == record.id) {
                debug!("Skipping duplicate seed record {}", record.id);
                continue;
            }
            table.push(record);
            added += 1;
        }
        info!("Bootstrapped style index with {} records", added);
        Ok(added)
    }

    fn materialize(record: NewStyleRecord, embedding: Vec<f32>) -> StyleRecord {
        let now = Utc::now();
        StyleRecord {
            id: record
                .id
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            label: record.label,
            prompt_fragment: record.prompt_fragment,
            description: record.description,
            tags: record.tags,
            metadata: record.metadata,
            embedding,
            is_system_protected: record.is_system_protected,
            created_at: now,
            updated_at: now,
        }
    }

    fn score(&self, query: &[f32], record: &StyleRecord) -> f64 {
        match self.metric {
            SimilarityMetric::Cosine => cosine_similarity(query, &record.embedding).clamp(0.0, 1.0),
            SimilarityMetric::Distance => similarity_from_distance(
                euclidean_distance(query, &record.embedding),
                self.distance_scale,
            ),
        }
    }

    fn protection_violation(record: &StyleRecord, update: &StyleUpdate) -> Option<String> {
        if !record.is_system_protected {
            return None;
        }
        if update.label.as_ref().is_some_and(|l| *l != record.label) {
            return Some("label is immutable".to_string());
        }
        if update
            .prompt_fragment
            .as_ref()
            .is_some_and(|p| *p != record.prompt_fragment)
        {
            return Some("prompt fragment is immutable".to_string());
        }
        None
    }
}

#[async_trait]
impl SimilaritySearch for InMemoryStyleIndex {
    async fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchResult>, Error> {
        if query.trim().is_empty() || options.limit == 0 {
            return Ok(Vec::new());
        }
        debug!("Searching styles with query: {}", query);
        let query_embedding = self.embedder.embed_text(query).await?;

        let table = self.records.read().await;
        let mut scored: Vec<(f64, &StyleRecord)> = table
            .iter()
            .map(|record| (self.score(&query_embedding, record), record))
            .filter(|(score, _)| score.is_finite() && *score >= options.min_similarity)
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(options.limit)
            .map(|(similarity, record)| SearchResult {
                id: record.id.clone(),
                label: record.label.clone(),
                prompt_fragment: record.prompt_fragment.clone(),
                similarity,
                metadata: record.metadata.clone(),
            })
            .collect())
    }

    async fn add(&self, record: NewStyleRecord) -> Result<StyleRecord, Error> {
        let _guard = self.writes.lock().await;
        if let Some(id) = &record.id {
            if self.records.read().await.iter().any(|r| &r.id == id) {
                return Err(Error::DuplicateRecord(id.clone()));
            }
        }
        let text = embedding_text(
            &record.label,
            &record.prompt_fragment,
            record.description.as_deref(),
        );
        let embedding = self.embedder.embed_text(&text).await?;
        let record = Self::materialize(record, embedding);
        self.records.write().await.push(record.clone());
        info!("Added style record {} ({})", record.id, record.label);
        Ok(record)
    }

    async fn update(&self, id: &str, update: StyleUpdate) -> Result<StyleRecord, Error> {
        let _guard = self.writes.lock().await;
        let mut record = self
            .get(id)
            .await
            .ok_or_else(|| Error::RecordNotFound(id.to_string()))?;

        if let Some(reason) = Self::protection_violation(&record, &update) {
            return Err(Error::ProtectedRecord {
                id: id.to_string(),
                reason,
            });
        }

        let before = embedding_text(
            &record.label,
            &record.prompt_fragment,
            record.description.as_deref(),
        );
        if let Some(label) = update.label {
            record.label = label;
        }
        if let Some(fragment) = update.prompt_fragment {
            record.prompt_fragment = fragment;
        }
        if let Some(description) = update.description {
            record.description = Some(description);
        }
        if let Some(tags) = update.tags {
            record.tags = tags;
        }
        if let Some(metadata) = update.metadata {
            record.metadata = metadata;
        }

        let after = embedding_text(
            &record.label,
            &record.prompt_fragment,
            record.description.as_deref(),
        );
        if after != before {
            debug!("Re-embedding style record {}", id);
            record.embedding = self.embedder.embed_text(&after).await?;
        }
        record.updated_at = Utc::now();

        let mut table = self.records.write().await;
        match table.iter_mut().find(|r| r.id == id) {
            Some(slot) => *slot = record.clone(),
            None => return Err(Error::RecordNotFound(id.to_string())),
        }
        Ok(record)
    }

    async fn delete(&self, id: &str) -> Result<(), Error> {
        let _guard = self.writes.lock().await;
        let mut table = self.records.write().await;
        let pos = table
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| Error::RecordNotFound(id.to_string()))?;
        if table[pos].is_system_protected {
            return Err(Error::ProtectedRecord {
                id: id.to_string(),
                reason: "protected records cannot be deleted".to_string(),
            });
        }
        table.remove(pos);
        info!("Deleted style record {}", id);
        Ok(())
    }

    async fn get(&self, id: &str) -> Option<StyleRecord> {
        self.records.read().await.iter().find(|r| r.id == id).cloned()
    }

    async fn list(&self) -> Vec<StyleRecord> {
        self.records.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::KeywordEmbedder;

    fn style(id: &str, label: &str, fragment: &str, protected: bool) -> NewStyleRecord {
        NewStyleRecord {
            id: Some(id.to_string()),
            label: label.to_string(),
            prompt_fragment: fragment.to_string(),
            is_system_protected: protected,
            ..Default::default()
        }
    }

    async fn index() -> (InMemoryStyleIndex, Arc<KeywordEmbedder>) {
        let embedder = Arc::new(KeywordEmbedder::new());
        let index = InMemoryStyleIndex::new(embedder.clone());
        index
            .bootstrap(vec![
                style("cyberpunk", "Cyberpunk", "neon cyberpunk city", true),
                style("watercolor", "Watercolor", "soft watercolor paint", true),
                style("anime", "Anime", "anime cel shading", false),
            ])
            .await
            .unwrap();
        (index, embedder)
    }

    fn options(limit: usize, min_similarity: f64) -> SearchOptions {
        SearchOptions {
            limit,
            min_similarity,
        }
    }

    #[test]
    fn cosine_of_parallel_and_orthogonal_vectors() {
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn distance_transform_is_monotonic() {
        assert_eq!(similarity_from_distance(0.0, 2.0), 1.0);
        assert!((similarity_from_distance(2.0, 2.0) - 0.5).abs() < 1e-9);
        assert!(similarity_from_distance(1.0, 2.0) > similarity_from_distance(3.0, 2.0));
    }

    #[tokio::test]
    async fn search_respects_limit_threshold_and_order() {
        let (index, _) = index().await;
        let results = index
            .search("neon cyberpunk watercolor", &options(2, 0.1))
            .await
            .unwrap();
        assert!(results.len() <= 2);
        assert_eq!(results[0].label, "Cyberpunk");
        assert!(results.iter().all(|r| r.similarity >= 0.1));
        assert!(results.windows(2).all(|w| w[0].similarity >= w[1].similarity));

        let none = index.search("pixel", &options(5, 0.1)).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn empty_query_skips_embedding() {
        let (index, embedder) = index().await;
        let calls = embedder.calls();
        assert!(index.search("   ", &options(3, 0.0)).await.unwrap().is_empty());
        assert_eq!(embedder.calls(), calls);
    }

    #[tokio::test]
    async fn distance_metric_scores_identical_text_as_one() {
        let embedder = Arc::new(KeywordEmbedder::new());
        let index = InMemoryStyleIndex::with_metric(embedder, SimilarityMetric::Distance, 1.0);
        index
            .add(style("cat", "Cat", "cat", false))
            .await
            .unwrap();
        let results = index.search("Cat cat", &options(1, 0.0)).await.unwrap();
        assert!((results[0].similarity - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn protected_records_cannot_be_deleted() {
        let (index, _) = index().await;
        let err = index.delete("cyberpunk").await.unwrap_err();
        assert!(matches!(err, Error::ProtectedRecord { .. }));
        assert!(index.get("cyberpunk").await.is_some());

        index.delete("anime").await.unwrap();
        assert!(index.get("anime").await.is_none());
        assert!(matches!(
            index.delete("anime").await,
            Err(Error::RecordNotFound(_))
        ));
    }

    #[tokio::test]
    async fn protected_records_only_accept_annotations() {
        let (index, embedder) = index().await;
        let err = index
            .update(
                "cyberpunk",
                StyleUpdate {
                    prompt_fragment: Some("something else".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ProtectedRecord { .. }));

        let calls = embedder.calls();
        let updated = index
            .update(
                "cyberpunk",
                StyleUpdate {
                    label: Some("Cyberpunk".to_string()),
                    tags: Some(vec!["scifi".to_string()]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.tags, vec!["scifi".to_string()]);
        assert_eq!(embedder.calls(), calls);
    }

    #[tokio::test]
    async fn protected_labels_are_immutable() {
        let (index, embedder) = index().await;
        let calls = embedder.calls();
        let err = index
            .update(
                "watercolor",
                StyleUpdate {
                    label: Some("Gouache".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        match err {
            Error::ProtectedRecord { id, reason } => {
                assert_eq!(id, "watercolor");
                assert!(reason.contains("label"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(index.get("watercolor").await.unwrap().label, "Watercolor");
        assert_eq!(embedder.calls(), calls);
    }

    #[tokio::test]
    async fn changing_the_fragment_re_embeds() {
        let (index, embedder) = index().await;
        let calls = embedder.calls();
        let updated = index
            .update(
                "anime",
                StyleUpdate {
                    prompt_fragment: Some("pixel art".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(embedder.calls(), calls + 1);
        let results = index.search("pixel", &options(1, 0.1)).await.unwrap();
        assert_eq!(results[0].id, updated.id);
    }

    #[tokio::test]
    async fn duplicate_ids_are_rejected() {
        let (index, _) = index().await;
        let err = index
            .add(style("anime", "Anime 2", "anime", false))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateRecord(_)));
    }

    fn catalog_file(yaml: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("styles-{}.yaml", uuid::Uuid::new_v4()));
        std::fs::write(&path, yaml).unwrap();
        path
    }

    #[tokio::test]
    async fn default_config_builds_the_seed_catalog_offline() {
        let index = InMemoryStyleIndex::from_config(&AppConfig::default())
            .await
            .unwrap();
        let records = index.list().await;
        assert_eq!(records.len(), seed_styles().len());
        assert!(records.iter().all(|r| r.is_system_protected));
    }

    #[tokio::test]
    async fn catalog_records_are_added_unprotected() {
        let path = catalog_file(
            "- id: vaporwave\n  label: Vaporwave\n  promptFragment: pastel retro grid\n  isSystemProtected: true\n",
        );
        let config = AppConfig {
            styles_file: Some(path.to_string_lossy().into_owned()),
            ..Default::default()
        };
        let index = InMemoryStyleIndex::from_config(&config).await.unwrap();
        std::fs::remove_file(&path).unwrap();

        let record = index.get("vaporwave").await.unwrap();
        assert!(!record.is_system_protected);
        assert_eq!(index.len().await, seed_styles().len() + 1);
        index.delete("vaporwave").await.unwrap();
    }

    #[tokio::test]
    async fn catalog_ids_may_not_shadow_seed_styles() {
        let seed_id = seed_styles()[0].id.clone().unwrap();
        let path = catalog_file(&format!(
            "- id: {seed_id}\n  label: Impostor\n  promptFragment: anything\n"
        ));
        let config = AppConfig {
            styles_file: Some(path.to_string_lossy().into_owned()),
            ..Default::default()
        };
        let result = InMemoryStyleIndex::from_config(&config).await;
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(Error::DuplicateRecord(id)) if id == seed_id));
    }
}
