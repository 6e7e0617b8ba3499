//! Deferred, typed pipeline builder
//!
//! A [`Pipeline`] records stages; nothing runs until [`Pipeline::run`].
//! Builder calls that preserve the element type consume and return the same
//! pipeline; calls that change it (READ, MAP, SERIES, REDUCE, FETCH, FROM,
//! COMPOSE) return a new `Pipeline<O>` carrying the copied stage list and a
//! copy of the metadata context. Pipelines are `Clone`, so callers that want
//! to run a program twice, or branch a sub-pipeline off a common prefix,
//! keep a clone of the builder value.

use std::cmp::Ordering;
use std::future::Future;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use millrace_core::{Context, Element, ElementType, FileRecord, PipelineError, Result};
use serde_json::Value;

use crate::collection::Collection;
use crate::executor;
use crate::fetch::Fetched;
use crate::stage::{
    CompareFn, ComposeSource, Destination, DestFn, FetchFn, FoldFn, PredicateFn, ProduceFn,
    RenderFn, SinkFn, Stage, TransformFn, ValueFn,
};

/// A deferred pipeline program over elements of type `T`.
pub struct Pipeline<T> {
    context: Context,
    stages: Vec<Stage>,
    _element: PhantomData<fn() -> T>,
}

impl<T> Clone for Pipeline<T> {
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
            stages: self.stages.clone(),
            _element: PhantomData,
        }
    }
}

impl Pipeline<Element> {
    /// Create an empty pipeline rooted at `root`.
    ///
    /// The root anchors READ pattern expansion and WRITE destinations. The
    /// starting collection is empty and dynamically typed; a READ, FETCH or
    /// FROM stage usually populates it.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            context: Context::new(root),
            stages: Vec::new(),
            _element: PhantomData,
        }
    }
}

impl<T: ElementType> Pipeline<T> {
    /// The pipeline's working root path.
    pub fn root(&self) -> &Path {
        self.context.root()
    }

    /// Number of recorded stages.
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    fn push(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    fn fork<O: ElementType>(mut self, stage: Stage) -> Pipeline<O> {
        self.stages.push(stage);
        Pipeline {
            context: self.context,
            stages: self.stages,
            _element: PhantomData,
        }
    }

    pub(crate) fn erase(self) -> Pipeline<Element> {
        Pipeline {
            context: self.context,
            stages: self.stages,
            _element: PhantomData,
        }
    }

    /// Store `value` in the metadata context under `key` when the stage
    /// executes. The collection passes through unchanged.
    pub fn set(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let value = value.into();
        let f: ValueFn = Arc::new(move || {
            let value = value.clone();
            Box::pin(async move { Ok(value) })
        });
        self.push(Stage::Set {
            key: key.into(),
            value: f,
        })
    }

    /// Like [`set`](Self::set), but the value is produced asynchronously at
    /// execution time.
    pub fn set_with<F, Fut>(self, key: impl Into<String>, value: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        let f: ValueFn = Arc::new(move || {
            let fut = value();
            Box::pin(async move { fut.await.map_err(PipelineError::from) })
        });
        self.push(Stage::Set {
            key: key.into(),
            value: f,
        })
    }

    /// Transform every element concurrently. Output order matches input
    /// order regardless of completion order, and file elements produced by
    /// the transform get a history entry recording the changed fields.
    pub fn map<O, F, Fut>(self, transform: F) -> Pipeline<O>
    where
        O: ElementType,
        F: Fn(T, Collection, Arc<Context>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<O>> + Send + 'static,
    {
        self.fork(Stage::Map {
            transform: erase_transform(transform),
        })
    }

    /// Transform elements one at a time, each fully awaited before the next
    /// starts, results assembled in input order.
    pub fn series<O, F, Fut>(self, transform: F) -> Pipeline<O>
    where
        O: ElementType,
        F: Fn(T, Collection, Arc<Context>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<O>> + Send + 'static,
    {
        self.fork(Stage::Series {
            transform: erase_transform(transform),
        })
    }

    /// Keep the elements for which the predicate resolves true, preserving
    /// their relative order. Predicates run strictly in order.
    pub fn filter<F, Fut>(self, predicate: F) -> Self
    where
        F: Fn(T, Collection, Arc<Context>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<bool>> + Send + 'static,
    {
        let f: PredicateFn = Arc::new(move |element, all, ctx| {
            let fut = T::from_element(element).map(|t| predicate(t, all, ctx));
            Box::pin(async move { fut?.await.map_err(PipelineError::from) })
        });
        self.push(Stage::Filter { predicate: f })
    }

    /// Left-fold the collection into an accumulator, which becomes the next
    /// collection: a `Vec<O>` accumulator contributes its elements, any
    /// other accumulator becomes a single element.
    pub fn reduce<A, O, F, Fut>(self, fold: F, initial: A) -> Pipeline<O>
    where
        O: ElementType,
        A: Accumulator<O>,
        F: Fn(A, T, Collection, Arc<Context>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<A>> + Send + 'static,
    {
        let fold = Arc::new(fold);
        let f: FoldFn = Arc::new(move |all: Collection, ctx: Arc<Context>| {
            let fold = fold.clone();
            let initial = initial.clone();
            Box::pin(async move {
                let mut acc = initial;
                let items = all.elements().to_vec();
                for element in items {
                    let t = T::from_element(element)?;
                    acc = fold(acc, t, all.clone(), ctx.clone())
                        .await
                        .map_err(PipelineError::from)?;
                }
                Ok(acc.into_elements())
            })
        });
        self.fork(Stage::Reduce { fold: f })
    }

    /// Stable sort by an asynchronous comparator. Equal-ranked elements
    /// retain their original relative order.
    pub fn sort_by<F, Fut>(self, compare: F) -> Self
    where
        F: Fn(T, T, Collection, Arc<Context>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Ordering>> + Send + 'static,
    {
        let f: CompareFn = Arc::new(move |a, b, all, ctx| {
            let fut =
                T::from_element(a).and_then(|a| T::from_element(b).map(|b| compare(a, b, all, ctx)));
            Box::pin(async move { fut?.await.map_err(PipelineError::from) })
        });
        self.push(Stage::Sort { compare: f })
    }

    /// Populate the collection from a response-like producer. The body is
    /// parsed as JSON; an array yields one element per entry, anything else
    /// a single element. The current collection is discarded.
    pub fn fetch<R, F, Fut>(self, produce: F) -> Pipeline<Value>
    where
        R: Fetched + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    {
        let f: FetchFn = Arc::new(move || {
            let fut = produce();
            Box::pin(async move {
                let response = fut.await.map_err(PipelineError::from)?;
                response.into_body().await.map_err(PipelineError::from)
            })
        });
        self.fork(Stage::Fetch { produce: f })
    }

    /// Replace the collection with whatever the producer returns.
    pub fn from_fn<O, F, Fut>(self, produce: F) -> Pipeline<O>
    where
        O: ElementType,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Vec<O>>> + Send + 'static,
    {
        let f: ProduceFn = Arc::new(move || {
            let fut = produce();
            Box::pin(async move {
                let items = fut.await.map_err(PipelineError::from)?;
                Ok(items.into_iter().map(ElementType::into_element).collect())
            })
        });
        self.fork(Stage::From { produce: f })
    }

    /// Invoke a side-effecting callback once per element, sequentially,
    /// awaiting each. The collection passes through unmodified.
    pub fn to<F, Fut>(self, sink: F) -> Self
    where
        F: Fn(T, Collection, Arc<Context>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let f: SinkFn = Arc::new(move |element, all, ctx| {
            let fut = T::from_element(element).map(|t| sink(t, all, ctx));
            Box::pin(async move { fut?.await.map_err(PipelineError::from) })
        });
        self.push(Stage::To { sink: f })
    }

    /// Read files matching one or more root-relative glob patterns into
    /// file elements, replacing the current collection. Markdown documents
    /// have their front matter parsed and merged onto the element.
    pub fn read(self, patterns: impl IntoPatterns) -> Pipeline<FileRecord> {
        self.fork(Stage::Read {
            patterns: patterns.into_patterns(),
        })
    }

    /// Write every element's contents under `<root>/<dir>/<relative path>`,
    /// creating directories as needed. Fails before any write if an element
    /// is not file-like.
    pub fn write(self, dir: impl Into<PathBuf>) -> Self {
        self.push(Stage::Write {
            dest: Destination::Literal(dir.into()),
        })
    }

    /// Like [`write`](Self::write), with the output directory computed per
    /// element.
    pub fn write_with<F, Fut>(self, dest: F) -> Self
    where
        F: Fn(T, Collection, Arc<Context>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<PathBuf>> + Send + 'static,
    {
        let f: DestFn = Arc::new(move |element, all, ctx| {
            let fut = T::from_element(element).map(|t| dest(t, all, ctx));
            Box::pin(async move { fut?.await.map_err(PipelineError::from) })
        });
        self.push(Stage::Write {
            dest: Destination::Callback(f),
        })
    }

    /// Run a nested pipeline to completion in isolation and concatenate its
    /// elements onto the current collection. The child keeps its own copy
    /// of the metadata context; nothing merges back.
    pub fn compose<O: ElementType>(self, child: Pipeline<O>) -> Pipeline<Element> {
        self.fork(Stage::Compose {
            source: ComposeSource::Pipeline(child.erase()),
        })
    }

    /// Like [`compose`](Self::compose), building the nested pipeline from
    /// the parent's root path when the stage executes.
    pub fn compose_with<O, F>(self, factory: F) -> Pipeline<Element>
    where
        O: ElementType,
        F: Fn(PathBuf) -> Pipeline<O> + Send + Sync + 'static,
    {
        self.fork(Stage::Compose {
            source: ComposeSource::Factory(Arc::new(move |root| factory(root).erase())),
        })
    }

    /// Emit each element to the informational log, pretty-printed.
    pub fn log(self) -> Self {
        self.push(Stage::Log { render: None })
    }

    /// Emit each element to the informational log through a custom renderer.
    pub fn log_with<F, Fut>(self, render: F) -> Self
    where
        F: Fn(T, Collection, Arc<Context>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<String>> + Send + 'static,
    {
        let f: RenderFn = Arc::new(move |element, all, ctx| {
            let fut = T::from_element(element).map(|t| render(t, all, ctx));
            Box::pin(async move { fut?.await.map_err(PipelineError::from) })
        });
        self.push(Stage::Log { render: Some(f) })
    }

    /// Execute the recorded stages, one at a time in append order, starting
    /// from an empty collection. The first stage failure aborts the run and
    /// is returned unmodified.
    pub async fn run(self) -> Result<Vec<T>> {
        let elements = executor::execute(self.context, self.stages).await?;
        elements.into_iter().map(T::from_element).collect()
    }
}

fn erase_transform<T, O, F, Fut>(transform: F) -> TransformFn
where
    T: ElementType,
    O: ElementType,
    F: Fn(T, Collection, Arc<Context>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<O>> + Send + 'static,
{
    Arc::new(move |element, all, ctx| {
        let fut = T::from_element(element).map(|t| transform(t, all, ctx));
        Box::pin(async move {
            let out = fut?.await.map_err(PipelineError::from)?;
            Ok(out.into_element())
        })
    })
}

/// Accumulator shapes a REDUCE stage can turn into the next collection.
///
/// A `Vec<O>` contributes one element per entry; any single element type
/// becomes a one-element collection.
pub trait Accumulator<O: ElementType>: Clone + Send + Sync + 'static {
    /// Convert the final accumulator into collection elements.
    fn into_elements(self) -> Vec<Element>;
}

impl<O: ElementType> Accumulator<O> for O {
    fn into_elements(self) -> Vec<Element> {
        vec![self.into_element()]
    }
}

impl<O: ElementType> Accumulator<O> for Vec<O> {
    fn into_elements(self) -> Vec<Element> {
        self.into_iter().map(ElementType::into_element).collect()
    }
}

/// One glob pattern or a list of them, for [`Pipeline::read`].
pub trait IntoPatterns {
    /// The root-relative patterns to expand.
    fn into_patterns(self) -> Vec<String>;
}

impl IntoPatterns for &str {
    fn into_patterns(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl IntoPatterns for String {
    fn into_patterns(self) -> Vec<String> {
        vec![self]
    }
}

impl IntoPatterns for Vec<String> {
    fn into_patterns(self) -> Vec<String> {
        self
    }
}

impl IntoPatterns for Vec<&str> {
    fn into_patterns(self) -> Vec<String> {
        self.into_iter().map(str::to_string).collect()
    }
}

impl IntoPatterns for &[&str] {
    fn into_patterns(self) -> Vec<String> {
        self.iter().map(|s| s.to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_changing_calls_copy_the_stage_list() {
        let base = Pipeline::new("/work").set("site", "millrace");
        assert_eq!(base.stage_count(), 1);

        let forked = base.clone().read("**/*.md");
        assert_eq!(forked.stage_count(), 2);

        // The retained builder value is untouched by the fork.
        assert_eq!(base.stage_count(), 1);
    }

    #[test]
    fn test_building_is_pure_bookkeeping() {
        // Appending a stage whose callback would fail must not run anything.
        let pipeline = Pipeline::new("/nonexistent")
            .read("missing/**/*.md")
            .map(|file: FileRecord, _, _| async move {
                if file.hash.is_empty() {
                    anyhow::bail!("missing hash");
                }
                Ok(file)
            });
        assert_eq!(pipeline.stage_count(), 2);
    }

    #[test]
    fn test_pattern_forms() {
        assert_eq!("a/*.md".into_patterns(), vec!["a/*.md".to_string()]);
        assert_eq!(
            vec!["a/*.md", "b/*.md"].into_patterns(),
            vec!["a/*.md".to_string(), "b/*.md".to_string()]
        );
    }
}
