//! Stage records for the deferred pipeline program
//!
//! Builder calls append one [`Stage`] each; nothing here executes anything.
//! Callbacks are stored as `Arc`'d type-erased callables so that forked
//! pipelines share the recorded program cheaply. The typed builder surface
//! wraps user closures into these erased forms; the executor only ever sees
//! [`Element`] values.

use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use futures::future::BoxFuture;
use millrace_core::{Context, Element, Result};
use serde_json::Value;

use crate::builder::Pipeline;
use crate::collection::Collection;

pub(crate) type ValueFn =
    Arc<dyn Fn() -> BoxFuture<'static, Result<Value>> + Send + Sync>;
pub(crate) type TransformFn = Arc<
    dyn Fn(Element, Collection, Arc<Context>) -> BoxFuture<'static, Result<Element>>
        + Send
        + Sync,
>;
pub(crate) type PredicateFn = Arc<
    dyn Fn(Element, Collection, Arc<Context>) -> BoxFuture<'static, Result<bool>>
        + Send
        + Sync,
>;
pub(crate) type FoldFn = Arc<
    dyn Fn(Collection, Arc<Context>) -> BoxFuture<'static, Result<Vec<Element>>>
        + Send
        + Sync,
>;
pub(crate) type CompareFn = Arc<
    dyn Fn(Element, Element, Collection, Arc<Context>) -> BoxFuture<'static, Result<Ordering>>
        + Send
        + Sync,
>;
pub(crate) type ProduceFn =
    Arc<dyn Fn() -> BoxFuture<'static, Result<Vec<Element>>> + Send + Sync>;
pub(crate) type FetchFn =
    Arc<dyn Fn() -> BoxFuture<'static, Result<Value>> + Send + Sync>;
pub(crate) type SinkFn = Arc<
    dyn Fn(Element, Collection, Arc<Context>) -> BoxFuture<'static, Result<()>>
        + Send
        + Sync,
>;
pub(crate) type RenderFn = Arc<
    dyn Fn(Element, Collection, Arc<Context>) -> BoxFuture<'static, Result<String>>
        + Send
        + Sync,
>;
pub(crate) type DestFn = Arc<
    dyn Fn(Element, Collection, Arc<Context>) -> BoxFuture<'static, Result<PathBuf>>
        + Send
        + Sync,
>;

/// One recorded operation. Append order is execution order.
#[derive(Clone)]
pub(crate) enum Stage {
    Set { key: String, value: ValueFn },
    Map { transform: TransformFn },
    Series { transform: TransformFn },
    Filter { predicate: PredicateFn },
    Reduce { fold: FoldFn },
    Sort { compare: CompareFn },
    Fetch { produce: FetchFn },
    From { produce: ProduceFn },
    To { sink: SinkFn },
    Read { patterns: Vec<String> },
    Write { dest: Destination },
    Compose { source: ComposeSource },
    Log { render: Option<RenderFn> },
}

/// WRITE destination: a literal directory or a per-element callback.
#[derive(Clone)]
pub(crate) enum Destination {
    Literal(PathBuf),
    Callback(DestFn),
}

/// COMPOSE input: a finished pipeline or a factory fed the parent's root.
#[derive(Clone)]
pub(crate) enum ComposeSource {
    Pipeline(Pipeline<Element>),
    Factory(Arc<dyn Fn(PathBuf) -> Pipeline<Element> + Send + Sync>),
}

impl Stage {
    /// Stage kind name for traces and errors.
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Stage::Set { .. } => "set",
            Stage::Map { .. } => "map",
            Stage::Series { .. } => "series",
            Stage::Filter { .. } => "filter",
            Stage::Reduce { .. } => "reduce",
            Stage::Sort { .. } => "sort",
            Stage::Fetch { .. } => "fetch",
            Stage::From { .. } => "from",
            Stage::To { .. } => "to",
            Stage::Read { .. } => "read",
            Stage::Write { .. } => "write",
            Stage::Compose { .. } => "compose",
            Stage::Log { .. } => "log",
        }
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}
