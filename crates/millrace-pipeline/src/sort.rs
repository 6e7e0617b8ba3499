//! Stable merge sort over an asynchronous comparator
//!
//! Comparators may themselves await further work, which rules out the
//! standard library's synchronous sorts. Merge sort keeps the comparator
//! count at O(n log n) and stays stable: when the comparator reports the
//! operands equal, the left operand is taken first.

use std::cmp::Ordering;
use std::sync::Arc;

use futures::future::BoxFuture;
use millrace_core::{Context, Element, Result};

use crate::collection::Collection;
use crate::stage::CompareFn;

pub(crate) async fn merge_sort(
    items: Vec<Element>,
    compare: &CompareFn,
    all: &Collection,
    ctx: &Arc<Context>,
) -> Result<Vec<Element>> {
    sort(items, compare, all, ctx).await
}

fn sort<'a>(
    items: Vec<Element>,
    compare: &'a CompareFn,
    all: &'a Collection,
    ctx: &'a Arc<Context>,
) -> BoxFuture<'a, Result<Vec<Element>>> {
    Box::pin(async move {
        if items.len() <= 1 {
            return Ok(items);
        }
        let mut left = items;
        let right = left.split_off(left.len() / 2);
        let left = sort(left, compare, all, ctx).await?;
        let right = sort(right, compare, all, ctx).await?;
        merge(left, right, compare, all, ctx).await
    })
}

async fn merge(
    left: Vec<Element>,
    right: Vec<Element>,
    compare: &CompareFn,
    all: &Collection,
    ctx: &Arc<Context>,
) -> Result<Vec<Element>> {
    let mut out = Vec::with_capacity(left.len() + right.len());
    let mut lhs = left.into_iter();
    let mut rhs = right.into_iter();
    let mut l = lhs.next();
    let mut r = rhs.next();

    loop {
        match (l.take(), r.take()) {
            (Some(a), Some(b)) => {
                let ordering =
                    compare(a.clone(), b.clone(), all.clone(), ctx.clone()).await?;
                if ordering == Ordering::Greater {
                    out.push(b);
                    l = Some(a);
                    r = rhs.next();
                } else {
                    out.push(a);
                    l = lhs.next();
                    r = Some(b);
                }
            }
            (Some(a), None) => {
                out.push(a);
                out.extend(lhs);
                break;
            }
            (None, Some(b)) => {
                out.push(b);
                out.extend(rhs);
                break;
            }
            (None, None) => break,
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    fn comparator(counter: Arc<AtomicUsize>) -> CompareFn {
        Arc::new(move |a, b, _all, _ctx| {
            counter.fetch_add(1, AtomicOrdering::SeqCst);
            Box::pin(async move {
                let a = a.to_json()?["rank"].as_i64().unwrap_or(0);
                let b = b.to_json()?["rank"].as_i64().unwrap_or(0);
                Ok(a.cmp(&b))
            })
        })
    }

    fn records(ranks: &[(i64, &str)]) -> Vec<Element> {
        ranks
            .iter()
            .map(|(rank, label)| Element::Data(json!({ "rank": rank, "label": label })))
            .collect()
    }

    async fn run_sort(items: Vec<Element>, counter: Arc<AtomicUsize>) -> Vec<Element> {
        let all = Collection::new(Arc::new(items.clone()));
        let ctx = Arc::new(Context::new("/work"));
        merge_sort(items, &comparator(counter), &all, &ctx)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_output_is_a_sorted_permutation() {
        let items = records(&[(3, "c"), (1, "a"), (2, "b"), (0, "z")]);
        let sorted = run_sort(items.clone(), Arc::new(AtomicUsize::new(0))).await;

        assert_eq!(sorted.len(), items.len());
        let ranks: Vec<i64> = sorted
            .iter()
            .map(|e| e.to_json().unwrap()["rank"].as_i64().unwrap())
            .collect();
        assert_eq!(ranks, vec![0, 1, 2, 3]);
        for element in &items {
            assert!(sorted.contains(element));
        }
    }

    #[tokio::test]
    async fn test_equal_ranks_keep_original_order() {
        let items = records(&[(1, "first"), (0, "x"), (1, "second"), (1, "third")]);
        let sorted = run_sort(items, Arc::new(AtomicUsize::new(0))).await;

        let labels: Vec<String> = sorted
            .iter()
            .map(|e| e.to_json().unwrap()["label"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(labels, vec!["x", "first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_comparator_count_is_n_log_n() {
        let n = 64;
        let items: Vec<Element> = (0..n)
            .rev()
            .map(|rank| Element::Data(json!({ "rank": rank })))
            .collect();

        let counter = Arc::new(AtomicUsize::new(0));
        run_sort(items, counter.clone()).await;

        // Merge sort needs at most n * log2(n) comparisons; reversed input
        // is its worst case.
        let bound = n as usize * (n as f64).log2().ceil() as usize;
        assert!(counter.load(AtomicOrdering::SeqCst) <= bound);
    }

    #[tokio::test]
    async fn test_empty_and_single_collections() {
        assert!(run_sort(Vec::new(), Arc::new(AtomicUsize::new(0)))
            .await
            .is_empty());

        let one = records(&[(5, "only")]);
        let counter = Arc::new(AtomicUsize::new(0));
        assert_eq!(run_sort(one.clone(), counter.clone()).await, one);
        assert_eq!(counter.load(AtomicOrdering::SeqCst), 0);
    }
}
