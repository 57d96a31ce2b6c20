use std::collections::VecDeque;

use futures::stream::{FuturesUnordered, StreamExt};
use mopper_common::{Node, ProviderResult};

use crate::provider::ContentProvider;

/// Discovers every node under a root that passes a filter
///
/// Traversal runs off an explicit work list rather than recursion. Each
/// discovered node costs one `list_children` call, and at most
/// `fetch_concurrency` of those are outstanding at once. Siblings complete in
/// whatever order the provider answers, so the output order is unspecified,
/// but every reachable node has been visited by the time `collect` returns.
pub struct TreeCollector<'a> {
    provider: &'a dyn ContentProvider,
    fetch_concurrency: usize,
}

impl<'a> TreeCollector<'a> {
    /// Collector over `provider` with at most `fetch_concurrency` fetches in flight
    pub fn new(provider: &'a dyn ContentProvider, fetch_concurrency: usize) -> Self {
        Self {
            provider,
            fetch_concurrency: fetch_concurrency.max(1),
        }
    }

    /// Collect all nodes reachable from `root` for which `keep` holds
    ///
    /// A comment root is itself a candidate; a post root never is. Nodes that
    /// fail `keep` are left out of the result but their replies are still
    /// visited. The first fetch error aborts the walk and drops any fetches
    /// still in flight.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip(self, root, keep), fields(root = %root.id)))]
    pub async fn collect<F>(&self, root: &Node, keep: F) -> ProviderResult<Vec<Node>>
    where
        F: Fn(&Node) -> bool,
    {
        let mut collected = Vec::new();
        if !root.is_post() && keep(root) {
            collected.push(root.clone());
        }

        let mut pending: VecDeque<(Node, usize)> = VecDeque::from([(root.clone(), 0)]);
        let mut in_flight = FuturesUnordered::new();
        let mut deepest = 0;

        loop {
            while in_flight.len() < self.fetch_concurrency {
                let Some((node, depth)) = pending.pop_front() else {
                    break;
                };
                let provider = self.provider;
                in_flight.push(async move {
                    let children = provider.list_children(&node).await;
                    (node, depth, children)
                });
            }

            let Some((node, depth, children)) = in_flight.next().await else {
                break;
            };
            let children = children.inspect_err(|_error| {
                #[cfg(feature = "tracing")]
                tracing::warn!(node = %node.id, depth, error = %_error, "failed to list children");
            })?;

            deepest = deepest.max(depth);
            for child in children {
                if keep(&child) {
                    collected.push(child.clone());
                }
                pending.push_back((child, depth + 1));
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(collected = collected.len(), deepest, "collection finished");
        Ok(collected)
    }
}
