use serde::Serialize;

pub const LOAD_FAILED: &str = "Failed to load website.";
pub const VECTORSTORE_FAILED: &str = "Failed to setup vectorstore.";
pub const RETRIEVAL_FAILED: &str = "Failed to retrieve documents.";
pub const GENERATION_FAILED: &str = "Unable to generate a response at this time.";

/// Stages of one pipeline run. `Done` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Loading,
    Chunking,
    Indexing,
    Retrieving,
    Generating,
    Done,
    Failed,
}

impl PipelineStage {
    pub fn next(self) -> Option<Self> {
        match self {
            PipelineStage::Loading => Some(PipelineStage::Chunking),
            PipelineStage::Chunking => Some(PipelineStage::Indexing),
            PipelineStage::Indexing => Some(PipelineStage::Retrieving),
            PipelineStage::Retrieving => Some(PipelineStage::Generating),
            PipelineStage::Generating => Some(PipelineStage::Done),
            PipelineStage::Done | PipelineStage::Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.next().is_none()
    }

    /// User-facing text returned when a run fails in this stage.
    pub fn failure_message(self) -> Option<&'static str> {
        match self {
            PipelineStage::Loading => Some(LOAD_FAILED),
            PipelineStage::Chunking | PipelineStage::Indexing => Some(VECTORSTORE_FAILED),
            PipelineStage::Retrieving => Some(RETRIEVAL_FAILED),
            PipelineStage::Generating => Some(GENERATION_FAILED),
            PipelineStage::Done | PipelineStage::Failed => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStage::Loading => "loading",
            PipelineStage::Chunking => "chunking",
            PipelineStage::Indexing => "indexing",
            PipelineStage::Retrieving => "retrieving",
            PipelineStage::Generating => "generating",
            PipelineStage::Done => "done",
            PipelineStage::Failed => "failed",
        }
    }
}

/// Records the path of a run through the stages.
#[derive(Debug, Clone)]
pub struct StageTracker {
    current: PipelineStage,
    failed_at: Option<PipelineStage>,
    history: Vec<PipelineStage>,
}

impl StageTracker {
    pub fn new() -> Self {
        Self {
            current: PipelineStage::Loading,
            failed_at: None,
            history: vec![PipelineStage::Loading],
        }
    }

    pub fn current(&self) -> PipelineStage {
        self.current
    }

    /// Moves to the next stage. Terminal stages stay put.
    pub fn advance(&mut self) -> PipelineStage {
        if let Some(next) = self.current.next() {
            self.current = next;
            self.history.push(next);
        }
        self.current
    }

    /// Enters `Failed` and returns the stage that failed. A run that already
    /// finished is left unchanged.
    pub fn fail(&mut self) -> PipelineStage {
        if !self.current.is_terminal() {
            self.failed_at = Some(self.current);
            self.current = PipelineStage::Failed;
            self.history.push(PipelineStage::Failed);
        }
        self.failed_at.unwrap_or(self.current)
    }

    pub fn into_history(self) -> Vec<PipelineStage> {
        self.history
    }
}

impl Default for StageTracker {
    fn default() -> Self {
        Self::new()
    }
}
