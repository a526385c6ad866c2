use super::StageNode;
use crate::constants::{COMPETITIVE_SIMILARITY_RATIO, RELAXED_SIMILARITY_RATIO};
use crate::core::rag::{SearchOptions, SearchResult, SimilaritySearch};
use crate::core::styles::translate_style;
use crate::core::{EnhancedPrompt, RetrievedStyle, Stage, StateUpdate, WorkflowState};
use crate::errors::Error;
use crate::utils::join_non_empty;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Query derived from the intent, with the style labels used for ranking
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalPlan {
    pub query: String,
    /// Label a result must carry to be promoted to the top
    pub canonical_style: Option<String>,
    /// Lexicon translation of the requested style
    pub translated_style: Option<&'static str>,
}

impl RetrievalPlan {
    /// With a style, the translated label is repeated to weigh it above the native wording.
    /// Without one, the subject and the raw text are used.
    pub fn build(style: Option<&str>, subject: Option<&str>, raw_text: &str) -> Self {
        let style = style.map(str::trim).filter(|s| !s.is_empty());
        match style {
            Some(native) => {
                let translated = translate_style(native);
                RetrievalPlan {
                    query: join_non_empty([Some(native), translated, translated, subject]),
                    canonical_style: Some(translated.unwrap_or(native).to_string()),
                    translated_style: translated,
                }
            }
            None => RetrievalPlan {
                query: join_non_empty([subject, Some(raw_text)]),
                canonical_style: None,
                translated_style: None,
            },
        }
    }
}

/// Moves the result labelled `label` to the front and keeps only alternatives whose
/// similarity is competitive with it. Results are untouched when no label matches.
pub fn prefer_style(mut results: Vec<SearchResult>, label: &str) -> Vec<SearchResult> {
    let wanted = label.to_lowercase();
    let Some(pos) = results.iter().position(|r| r.label.to_lowercase() == wanted) else {
        return results;
    };
    let matched = results.remove(pos);
    let floor = matched.similarity * COMPETITIVE_SIMILARITY_RATIO;
    results.retain(|r| r.similarity >= floor);
    results.insert(0, matched);
    results
}

/// Augments the prompt with fragments of the closest style records.
///
/// Retrieval problems never abort the workflow: the stage falls back to the
/// original prompt.
pub struct AugmenterAgent {
    index: Arc<dyn SimilaritySearch>,
    options: SearchOptions,
}

impl AugmenterAgent {
    pub fn new(index: Arc<dyn SimilaritySearch>, options: SearchOptions) -> Self {
        Self { index, options }
    }

    async fn retrieve(&self, plan: &RetrievalPlan) -> Result<Vec<SearchResult>, Error> {
        let mut results = self.index.search(&plan.query, &self.options).await?;

        if results.is_empty() {
            if let Some(translated) = plan.translated_style {
                let relaxed = SearchOptions {
                    limit: self.options.limit,
                    min_similarity: self.options.min_similarity * RELAXED_SIMILARITY_RATIO,
                };
                debug!(
                    "No styles above {:.2}, retrying with '{}' at {:.2}",
                    self.options.min_similarity, translated, relaxed.min_similarity
                );
                results = self.index.search(translated, &relaxed).await?;
            }
        }

        if let Some(label) = &plan.canonical_style {
            results = prefer_style(results, label);
        }
        Ok(results)
    }
}

fn compose(original: &str, results: Vec<SearchResult>) -> EnhancedPrompt {
    let retrieved: Vec<RetrievedStyle> = results
        .into_iter()
        .map(|r| RetrievedStyle {
            style: r.label,
            prompt_fragment: r.prompt_fragment,
            similarity: r.similarity,
        })
        .collect();
    let final_prompt = if retrieved.is_empty() {
        original.to_string()
    } else {
        let fragments: Vec<&str> = retrieved.iter().map(|r| r.prompt_fragment.as_str()).collect();
        format!("{}, {}", original, fragments.join(", "))
    };
    EnhancedPrompt {
        original: original.to_string(),
        retrieved,
        final_prompt,
    }
}

#[async_trait]
impl StageNode for AugmenterAgent {
    fn stage(&self) -> Stage {
        Stage::Augmenting
    }

    async fn execute(&self, state: &WorkflowState) -> Result<StateUpdate, Error> {
        let raw_text = state.user_input.text.as_str();
        let intent = state.intent.as_ref();
        let original = intent
            .map(|i| i.prompt.trim())
            .filter(|p| !p.is_empty())
            .unwrap_or(raw_text);
        let plan = RetrievalPlan::build(
            intent.and_then(|i| i.style.as_deref()),
            intent.and_then(|i| i.subject.as_deref()),
            raw_text,
        );

        let mut update = StateUpdate::new();
        let enhanced = if plan.query.is_empty() {
            update.log(Stage::Augmenting, "Nothing to look up, keeping the original prompt");
            EnhancedPrompt::unaugmented(original)
        } else {
            match self.retrieve(&plan).await {
                Ok(results) => {
                    let enhanced = compose(original, results);
                    let summary: Vec<String> = enhanced
                        .retrieved
                        .iter()
                        .map(|r| format!("{} ({:.2})", r.style, r.similarity))
                        .collect();
                    info!("Retrieved {} styles for '{}'", summary.len(), plan.query);
                    let message = if summary.is_empty() {
                        "No matching styles found, keeping the original prompt".to_string()
                    } else {
                        format!("Applied styles: {}", summary.join(", "))
                    };
                    let entry = update.log(Stage::Augmenting, message);
                    entry.progress = Some(100);
                    entry.metadata = Some(json!({
                        "query": plan.query,
                        "retrieved": enhanced.retrieved.len(),
                        "retryCount": state.retry_count(),
                    }));
                    enhanced
                }
                Err(e) => {
                    warn!("Style retrieval failed, continuing unaugmented: {}", e);
                    update.log(
                        Stage::Augmenting,
                        "Style lookup unavailable, keeping the original prompt",
                    );
                    EnhancedPrompt::unaugmented(original)
                }
            }
        };
        update.enhanced_prompt = Some(enhanced);
        Ok(update)
    }
}
