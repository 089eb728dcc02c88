use tokio::sync::mpsc;

/// Events emitted during a pipeline run.
///
/// Purely informational: consumers may ignore them, and emitting never affects
/// control flow or fails the run.
#[derive(Debug, Clone)]
pub enum Event {
    /// A pipeline run started
    PipelineStarted {
        pipeline: String,
        strategy: String,
        task_preview: String,
    },
    /// The sequential strategy is about to call the next agent
    SequentialStep {
        agent_name: String,
        input_preview: String,
    },
    /// The group fallback path is broadcasting the task to an agent
    BroadcastStep { agent_name: String },
    /// An agent started working on a message
    AgentStarted { agent_name: String },
    /// An agent returned its reply
    AgentCompleted {
        agent_name: String,
        output_preview: String,
    },
    /// The supervisor chose a specialist
    SupervisorRouting { chosen: String },
    /// The supervisor named an unknown specialist; the pipeline fell back
    SupervisorFallback { chosen: String, fallback: String },
    /// The pipeline run completed
    PipelineCompleted { pipeline: String },
}

/// Sender for pipeline events.
///
/// Wraps a `tokio::sync::mpsc::Sender<Event>` with best-effort semantics. When
/// constructed with `noop()`, all sends are silently dropped.
#[derive(Clone)]
pub struct EventSender {
    inner: Option<mpsc::Sender<Event>>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self {
            inner: Some(sender),
        }
    }

    /// Create a no-op sender that silently drops all events.
    pub fn noop() -> Self {
        Self { inner: None }
    }

    /// Emit an event (best-effort, drops on backpressure or a closed channel).
    pub fn emit(&self, event: Event) {
        if let Some(ref sender) = self.inner {
            let _ = sender.try_send(event);
        }
    }

    /// Returns true if this sender is connected (not noop).
    pub fn is_active(&self) -> bool {
        self.inner.is_some()
    }
}

/// Truncate `text` for event payloads, respecting char boundaries.
pub(crate) fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect()
    }
}
