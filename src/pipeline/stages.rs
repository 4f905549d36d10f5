use super::stage::{ItemContext, PipelineError, PipelineStage};
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::{Arc, Mutex, PoisonError};

/// Keeps a copy of every item that reaches it
///
/// Clones share the same storage, so a caller can keep one handle and give the
/// other to the pipeline.
#[derive(Debug)]
pub struct ItemCollector<I> {
    items: Arc<Mutex<Vec<I>>>,
}

impl<I> ItemCollector<I> {
    pub fn new() -> Self {
        Self {
            items: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn len(&self) -> usize {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<I: Clone> ItemCollector<I> {
    /// Snapshot of the collected items, in arrival order
    pub fn items(&self) -> Vec<I> {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl<I> Clone for ItemCollector<I> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
        }
    }
}

impl<I> Default for ItemCollector<I> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<I: Clone + Send + 'static> PipelineStage<I> for ItemCollector<I> {
    fn name(&self) -> &str {
        "collector"
    }

    async fn process(&self, item: I, _context: &ItemContext) -> Result<Option<I>, PipelineError> {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(item.clone());
        Ok(Some(item))
    }
}

/// Logs every item at info level and passes it on
#[derive(Debug, Clone, Default)]
pub struct LogItems;

#[async_trait]
impl<I: Debug + Send + 'static> PipelineStage<I> for LogItems {
    fn name(&self) -> &str {
        "log"
    }

    async fn process(&self, item: I, context: &ItemContext) -> Result<Option<I>, PipelineError> {
        tracing::info!(
            "Item {} from {} (depth {}): {:?}",
            context.index,
            context.source_url,
            context.depth,
            item
        );
        Ok(Some(item))
    }
}

type StageFn<I> = dyn Fn(I, &ItemContext) -> Result<Option<I>, PipelineError> + Send + Sync;

/// Wraps a synchronous closure as a stage
pub struct FnStage<I> {
    name: String,
    f: Box<StageFn<I>>,
}

impl<I> FnStage<I> {
    pub fn new<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(I, &ItemContext) -> Result<Option<I>, PipelineError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            f: Box::new(f),
        }
    }
}

impl<I> Debug for FnStage<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnStage").field("name", &self.name).finish()
    }
}

#[async_trait]
impl<I: Send + 'static> PipelineStage<I> for FnStage<I> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn process(&self, item: I, context: &ItemContext) -> Result<Option<I>, PipelineError> {
        (self.f)(item, context)
    }
}
