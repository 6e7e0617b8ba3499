//! Single-pass stage dispatcher
//!
//! Threads exactly one collection through the recorded stages in append
//! order, starting from an empty collection. One stage runs at a time; MAP
//! and WRITE fan their per-element work out concurrently and await it all,
//! every other stage processes elements strictly in order. The first stage
//! failure aborts the run.

use std::sync::Arc;
use std::time::Instant;

use futures::future::{try_join_all, BoxFuture};
use millrace_core::{history, Context, Element, PipelineError, Result};
use serde_json::Value;
use tracing::{debug, info};

use crate::collection::Collection;
use crate::fs;
use crate::sort;
use crate::stage::{
    ComposeSource, Destination, PredicateFn, RenderFn, SinkFn, Stage, TransformFn,
};

pub(crate) fn execute(
    mut context: Context,
    stages: Vec<Stage>,
) -> BoxFuture<'static, Result<Vec<Element>>> {
    Box::pin(async move {
    let mut items: Vec<Element> = Vec::new();
    for stage in &stages {
        let count = items.len();
        let started = Instant::now();
        items = dispatch(stage, items, &mut context).await?;
        debug!(
            "{} stage over {} elements took {}ms",
            stage.kind(),
            count,
            started.elapsed().as_millis()
        );
    }
    Ok(items)
    })
}

async fn dispatch(
    stage: &Stage,
    items: Vec<Element>,
    context: &mut Context,
) -> Result<Vec<Element>> {
    match stage {
        Stage::Set { key, value } => {
            let value = value().await?;
            context.set(key.clone(), value);
            Ok(items)
        }
        Stage::Map { transform } => map(items, transform, &snapshot(context)).await,
        Stage::Series { transform } => series(items, transform, &snapshot(context)).await,
        Stage::Filter { predicate } => filter(items, predicate, &snapshot(context)).await,
        Stage::Reduce { fold } => {
            let all = Collection::new(Arc::new(items));
            fold(all, snapshot(context)).await
        }
        Stage::Sort { compare } => {
            let all = Collection::new(Arc::new(items.clone()));
            sort::merge_sort(items, compare, &all, &snapshot(context)).await
        }
        Stage::Fetch { produce } => {
            let body = produce().await?;
            Ok(match body {
                Value::Array(values) => values.into_iter().map(Element::Data).collect(),
                other => vec![Element::Data(other)],
            })
        }
        Stage::From { produce } => produce().await,
        Stage::To { sink } => to(items, sink, &snapshot(context)).await,
        Stage::Read { patterns } => read(patterns, context).await,
        Stage::Write { dest } => write(items, dest, &snapshot(context)).await,
        Stage::Compose { source } => {
            let child = match source {
                ComposeSource::Pipeline(pipeline) => pipeline.clone(),
                ComposeSource::Factory(factory) => factory(context.root().to_path_buf()),
            };
            // Boxed to break the execute -> compose -> execute future cycle.
            let nested: BoxFuture<'static, Result<Vec<Element>>> = Box::pin(child.run());
            let mut items = items;
            items.extend(nested.await?);
            Ok(items)
        }
        Stage::Log { render } => log(items, render.as_ref(), &snapshot(context)).await,
    }
}

/// Context view handed to stage callbacks; SET is the only mutator and runs
/// exclusively, so a per-stage snapshot is all the synchronization needed.
fn snapshot(context: &Context) -> Arc<Context> {
    Arc::new(context.clone())
}

/// Reclaim the input collection after its shared snapshot is done with.
fn unshare(input: Arc<Vec<Element>>) -> Vec<Element> {
    Arc::try_unwrap(input).unwrap_or_else(|shared| (*shared).clone())
}

async fn map(
    items: Vec<Element>,
    transform: &TransformFn,
    ctx: &Arc<Context>,
) -> Result<Vec<Element>> {
    let input = Arc::new(items);
    let all = Collection::new(input.clone());
    let tasks = input.iter().map(|element| {
        let before = element.clone();
        let fut = transform(element.clone(), all.clone(), ctx.clone());
        async move { history::record(&before, fut.await?) }
    });
    try_join_all(tasks).await
}

async fn series(
    items: Vec<Element>,
    transform: &TransformFn,
    ctx: &Arc<Context>,
) -> Result<Vec<Element>> {
    let input = Arc::new(items);
    let all = Collection::new(input.clone());
    let mut out = Vec::with_capacity(input.len());
    for element in input.iter() {
        out.push(transform(element.clone(), all.clone(), ctx.clone()).await?);
    }
    Ok(out)
}

async fn filter(
    items: Vec<Element>,
    predicate: &PredicateFn,
    ctx: &Arc<Context>,
) -> Result<Vec<Element>> {
    let input = Arc::new(items);
    let all = Collection::new(input.clone());
    let mut out = Vec::new();
    for element in input.iter() {
        if predicate(element.clone(), all.clone(), ctx.clone()).await? {
            out.push(element.clone());
        }
    }
    Ok(out)
}

async fn to(items: Vec<Element>, sink: &SinkFn, ctx: &Arc<Context>) -> Result<Vec<Element>> {
    let input = Arc::new(items);
    let all = Collection::new(input.clone());
    for element in input.iter() {
        sink(element.clone(), all.clone(), ctx.clone()).await?;
    }
    drop(all);
    Ok(unshare(input))
}

async fn read(patterns: &[String], context: &Context) -> Result<Vec<Element>> {
    let mut out = Vec::new();
    for pattern in patterns {
        let paths = fs::expand(context.root(), pattern)?;
        debug!("pattern {} expanded to {} files", pattern, paths.len());
        for path in paths {
            let file = fs::read_file(context.root(), &path).await?;
            out.push(Element::File(Box::new(file)));
        }
    }
    Ok(out)
}

async fn write(
    items: Vec<Element>,
    dest: &Destination,
    ctx: &Arc<Context>,
) -> Result<Vec<Element>> {
    let input = Arc::new(items);
    let all = Collection::new(input.clone());

    // Validate the whole collection before any write happens.
    let mut files = Vec::with_capacity(input.len());
    for element in input.iter() {
        let file = element.as_file().ok_or(PipelineError::NotWritable)?;
        if file.relative_path.as_os_str().is_empty() || file.contents.is_empty() {
            return Err(PipelineError::NotWritable);
        }
        files.push((element, file));
    }

    let writes = files.into_iter().map(|(element, file)| {
        let all = all.clone();
        let ctx = ctx.clone();
        let dest = dest.clone();
        async move {
            let dir = match &dest {
                Destination::Literal(dir) => dir.clone(),
                Destination::Callback(f) => f(element.clone(), all, ctx.clone()).await?,
            };
            let path = ctx.root().join(dir).join(&file.relative_path);
            fs::write_file(&path, &file.contents).await
        }
    });
    try_join_all(writes).await?;

    drop(all);
    Ok(unshare(input))
}

async fn log(
    items: Vec<Element>,
    render: Option<&RenderFn>,
    ctx: &Arc<Context>,
) -> Result<Vec<Element>> {
    let input = Arc::new(items);
    let all = Collection::new(input.clone());
    for element in input.iter() {
        let line = match render {
            Some(render) => render(element.clone(), all.clone(), ctx.clone()).await?,
            None => serde_json::to_string_pretty(element)?,
        };
        info!("{line}");
    }
    drop(all);
    Ok(unshare(input))
}
