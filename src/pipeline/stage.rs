use async_trait::async_trait;
use std::fmt::Display;
use thiserror::Error;
use url::Url;

/// A pipeline stage failed
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Stage '{stage}' failed: {message}")]
    Stage { stage: String, message: String },

    #[error("Stage '{stage}' panicked: {message}")]
    Panicked { stage: String, message: String },

    #[error("IO error in pipeline: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn stage(stage: &str, message: impl Display) -> Self {
        Self::Stage {
            stage: stage.to_string(),
            message: message.to_string(),
        }
    }
}

/// Where an item came from
#[derive(Debug, Clone)]
pub struct ItemContext {
    /// Final URL of the response the item was extracted from
    pub source_url: Url,

    /// Depth of the request that produced the response
    pub depth: u32,

    /// Position of the item within its response's item sequence
    pub index: usize,
}

/// One step of post-extraction processing
///
/// Returning `Ok(None)` drops the item: later stages never see it and nothing
/// is counted as a failure. Returning `Err` fails the item only; other items
/// keep flowing.
#[async_trait]
pub trait PipelineStage<I>: Send + Sync {
    /// Name used in log lines and error messages
    fn name(&self) -> &str;

    /// Called once before the first item of a run
    async fn open(&self) -> Result<(), PipelineError> {
        Ok(())
    }

    async fn process(&self, item: I, context: &ItemContext) -> Result<Option<I>, PipelineError>;

    /// Called once after the last item of a run
    async fn close(&self) -> Result<(), PipelineError> {
        Ok(())
    }
}
