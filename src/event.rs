use crate::core::{EnhancedPrompt, Stage, ThoughtLogEntry, UiDescriptor, UpdateMode, WorkflowError};
use crate::errors::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::WorkflowOutcome;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionData {
    pub status: String,
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThoughtLogData {
    pub stage: Stage,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedData {
    pub style: String,
    pub prompt: String,
    pub similarity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnhancedPromptData {
    pub original: String,
    pub retrieved: Vec<RetrievedData>,
    #[serde(rename = "final")]
    pub final_prompt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UiComponentData {
    pub widget_type: String,
    pub props: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_mode: Option<UpdateMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorData {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StreamEndData {
    pub session_id: String,
    pub summary: Value,
}

/// Events exposed to the caller while a workflow runs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Event {
    Connection(ConnectionData),
    ThoughtLog(ThoughtLogData),
    EnhancedPrompt(EnhancedPromptData),
    GenUiComponent(UiComponentData),
    Error(ErrorData),
    StreamEnd(StreamEndData),
}

impl From<&ThoughtLogEntry> for Event {
    fn from(entry: &ThoughtLogEntry) -> Self {
        Event::ThoughtLog(ThoughtLogData {
            stage: entry.stage,
            message: entry.message.clone(),
            progress: entry.progress,
            metadata: entry.metadata.clone(),
        })
    }
}

impl From<&EnhancedPrompt> for Event {
    fn from(prompt: &EnhancedPrompt) -> Self {
        Event::EnhancedPrompt(EnhancedPromptData {
            original: prompt.original.clone(),
            retrieved: prompt
                .retrieved
                .iter()
                .map(|r| RetrievedData {
                    style: r.style.clone(),
                    prompt: r.prompt_fragment.clone(),
                    similarity: r.similarity,
                })
                .collect(),
            final_prompt: prompt.final_prompt.clone(),
        })
    }
}

impl From<&UiDescriptor> for Event {
    fn from(descriptor: &UiDescriptor) -> Self {
        Event::GenUiComponent(UiComponentData {
            widget_type: descriptor.widget_type.clone(),
            props: descriptor.props.clone(),
            update_mode: descriptor.update_mode,
            target_id: descriptor.target_id.clone(),
        })
    }
}

impl From<&WorkflowError> for Event {
    fn from(error: &WorkflowError) -> Self {
        Event::Error(ErrorData {
            code: error.code.clone(),
            message: error.message.clone(),
            details: error.details.clone(),
        })
    }
}

impl Event {
    pub fn type_name(&self) -> &'static str {
        match self {
            Event::Connection(_) => "connection",
            Event::ThoughtLog(_) => "thought_log",
            Event::EnhancedPrompt(_) => "enhanced_prompt",
            Event::GenUiComponent(_) => "gen_ui_component",
            Event::Error(_) => "error",
            Event::StreamEnd(_) => "stream_end",
        }
    }
}

/// Timestamped wire form of an event: `{type, timestamp, data}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventEnvelope {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: Event,
}

/// Sending half of one workflow instance's event stream
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: UnboundedSender<EventEnvelope>,
    cancel: CancellationToken,
}

impl EventSink {
    pub fn new(tx: UnboundedSender<EventEnvelope>, cancel: CancellationToken) -> Self {
        Self { tx, cancel }
    }

    /// Publishes an event; a closed receiver cancels the workflow
    pub fn emit(&self, event: Event) {
        let envelope = EventEnvelope {
            timestamp: Utc::now(),
            event,
        };
        if self.tx.send(envelope).is_err() && !self.cancel.is_cancelled() {
            debug!("Event consumer disconnected, cancelling workflow");
            self.cancel.cancel();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled() || self.tx.is_closed()
    }
}

/// Receiving half of a running workflow instance
#[derive(Debug)]
pub struct EventStream {
    pub rx: UnboundedReceiver<EventEnvelope>,
    pub handle: JoinHandle<Result<WorkflowOutcome, Error>>,
}

impl EventStream {
    pub async fn recv(&mut self) -> Option<EventEnvelope> {
        self.rx.recv().await
    }

    /// Drains every remaining event, then waits for the workflow result
    pub async fn collect(mut self) -> (Vec<EventEnvelope>, Result<WorkflowOutcome, Error>) {
        let mut events = Vec::new();
        while let Some(envelope) = self.rx.recv().await {
            events.push(envelope);
        }
        let outcome = match self.handle.await {
            Ok(result) => result,
            Err(e) => Err(Error::Invariant(format!("workflow task panicked: {}", e))),
        };
        (events, outcome)
    }
}
