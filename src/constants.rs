/// System prompt for the intent classifier
pub const CLASSIFIER_SYSTEM_PROMPT: &str = "You classify requests sent to an image creation assistant. \
Read the user's message and answer with a single JSON object with the keys: \
action (one of \"generate\", \"edit_region\", \"adjust_parameters\", \"unknown\"), \
subject (the main subject, optional), style (the artistic style exactly as the user wrote it, optional), \
prompt (a concise English image prompt describing the request), \
confidence (a number between 0 and 1) and reasoning (one short sentence). \
Use \"unknown\" when the message is not a request to create or modify an image.";

/// Format reminder for the classifier
pub const CLASSIFIER_FORMAT_REMINDER: &str = "Answer with one JSON object only, with the keys action, subject, style, prompt, confidence and reasoning. \
No markdown, no explanations outside the JSON.";

/// JSON schema of the classifier answer
pub const INTENT_SCHEMA: &str = r#"{
  "type": "object",
  "required": ["action", "prompt", "confidence"],
  "properties": {
    "action": { "enum": ["generate", "edit_region", "adjust_parameters", "unknown"] },
    "subject": { "type": ["string", "null"] },
    "style": { "type": ["string", "null"] },
    "prompt": { "type": "string" },
    "confidence": { "type": "number" },
    "reasoning": { "type": ["string", "null"] }
  }
}"#;

/// System prompt for the external quality assessor
pub const ASSESSOR_SYSTEM_PROMPT: &str = "You are a strict art director. You receive the intent of a request and a reference to the produced image. \
Judge whether the image satisfies the intent and answer with a single JSON object with the keys: \
passed (boolean), score (a number between 0 and 1), feedback (one sentence) and suggestions (a list of short prompt improvements).";

/// Format reminder for the quality assessor
pub const ASSESSOR_FORMAT_REMINDER: &str = "Answer with one JSON object only, with the keys passed, score, feedback and suggestions.";

/// JSON schema of the assessor answer
pub const ASSESSMENT_SCHEMA: &str = r#"{
  "type": "object",
  "required": ["score"],
  "properties": {
    "passed": { "type": "boolean" },
    "score": { "type": "number" },
    "feedback": { "type": "string" },
    "suggestions": { "type": "array", "items": { "type": "string" } }
  }
}"#;

/// Stable error codes surfaced in `error` events
pub const INTENT_CLASSIFICATION_FAILED: &str = "INTENT_CLASSIFICATION_FAILED";
pub const INTENT_UNKNOWN: &str = "INTENT_UNKNOWN";
pub const EXECUTION_FAILED: &str = "EXECUTION_FAILED";
pub const ARTIFACT_MISSING: &str = "ARTIFACT_MISSING";
pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";

/// Confidence assigned to requests that carry a mask
pub const MASK_FORCED_CONFIDENCE: f64 = 0.9;

/// Share of the matched style's similarity an alternative must reach to be kept
pub const COMPETITIVE_SIMILARITY_RATIO: f64 = 0.8;

/// Threshold multiplier of the one-shot relaxed search
pub const RELAXED_SIMILARITY_RATIO: f64 = 0.8;

/// Score used when an assessment produced no usable number
pub const DEFAULT_QUALITY_SCORE: f64 = 0.5;
