//! Item pipeline
//!
//! Every item a spider extracts is offered exactly once to an ordered chain of
//! [`PipelineStage`]s. The chain is fixed when the crawl starts. A stage may
//! transform the item, drop it, or fail on it; a failure is isolated to that one
//! item.

mod stage;
mod stages;

pub use stage::{ItemContext, PipelineError, PipelineStage};
pub use stages::{FnStage, ItemCollector, LogItems};

use futures::FutureExt;
use std::panic::AssertUnwindSafe;

/// What happened to one item
#[derive(Debug)]
pub enum ItemOutcome<I> {
    /// Passed every stage; carries the final value
    Completed(I),

    /// A stage returned `None`
    Dropped { stage: String },

    /// A stage returned an error or panicked
    Failed(PipelineError),
}

/// An ordered chain of stages
pub struct Pipeline<I> {
    stages: Vec<Box<dyn PipelineStage<I>>>,
}

impl<I: Send + 'static> Pipeline<I> {
    /// Creates an empty pipeline; items pass through unchanged
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Creates a pipeline from stages in processing order
    pub fn from_stages(stages: Vec<Box<dyn PipelineStage<I>>>) -> Self {
        Self { stages }
    }

    /// Appends a stage
    pub fn with_stage(mut self, stage: impl PipelineStage<I> + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stage names in processing order
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Opens every stage, returning the failures
    pub async fn open(&self) -> Vec<PipelineError> {
        let mut errors = Vec::new();
        for stage in &self.stages {
            if let Err(e) = stage.open().await {
                tracing::warn!("Failed to open pipeline stage '{}': {}", stage.name(), e);
                errors.push(e);
            }
        }
        errors
    }

    /// Runs one item through every stage in order
    pub async fn process(&self, item: I, context: &ItemContext) -> ItemOutcome<I> {
        let mut current = item;

        for stage in &self.stages {
            let result = AssertUnwindSafe(stage.process(current, context))
                .catch_unwind()
                .await;

            current = match result {
                Ok(Ok(Some(next))) => next,
                Ok(Ok(None)) => {
                    tracing::trace!(
                        "Item {} from {} dropped by stage '{}'",
                        context.index,
                        context.source_url,
                        stage.name()
                    );
                    return ItemOutcome::Dropped {
                        stage: stage.name().to_string(),
                    };
                }
                Ok(Err(e)) => return ItemOutcome::Failed(e),
                Err(panic) => {
                    return ItemOutcome::Failed(PipelineError::Panicked {
                        stage: stage.name().to_string(),
                        message: panic_message(panic.as_ref()),
                    })
                }
            };
        }

        ItemOutcome::Completed(current)
    }

    /// Closes every stage, returning the failures
    pub async fn close(&self) -> Vec<PipelineError> {
        let mut errors = Vec::new();
        for stage in &self.stages {
            if let Err(e) = stage.close().await {
                tracing::warn!("Failed to close pipeline stage '{}': {}", stage.name(), e);
                errors.push(e);
            }
        }
        errors
    }
}

impl<I: Send + 'static> Default for Pipeline<I> {
    fn default() -> Self {
        Self::new()
    }
}

/// Extracts the message from a caught panic payload
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
