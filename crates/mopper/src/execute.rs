use std::fmt;

use futures::future::join_all;
use mopper_common::{ActionConfig, Node, ProviderResult};

use crate::error::ActionError;
use crate::provider::ContentProvider;

/// A mutating call the executor can issue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// `ContentProvider::remove`
    Remove,
    /// `ContentProvider::lock`
    Lock,
}

impl Action {
    async fn apply(self, provider: &dyn ContentProvider, id: &str) -> ProviderResult<()> {
        match self {
            Self::Remove => provider.remove(id).await,
            Self::Lock => provider.lock(id).await,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Remove => "remove",
            Self::Lock => "lock",
        })
    }
}

/// Tally of a successful execution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    /// Nodes handed to the executor
    pub nodes: usize,
    /// Chunks processed
    pub chunks: usize,
    /// Remove calls issued
    pub removed: usize,
    /// Lock calls issued
    pub locked: usize,
}

/// Applies remove/lock to a flat node list in bounded waves
///
/// Nodes are split into chunks of `chunk_size`. Chunks run strictly one after
/// another. Inside a chunk every qualifying remove is issued at once and
/// awaited, then every qualifying lock. So no more than `chunk_size` mutating
/// calls are ever outstanding.
///
/// A wave always runs to completion: one failed call never cancels its
/// siblings. If any call in a wave failed, the executor stops there. The lock
/// wave of the same chunk and every later chunk are not issued.
pub struct BatchExecutor<'a> {
    provider: &'a dyn ContentProvider,
    chunk_size: usize,
}

impl<'a> BatchExecutor<'a> {
    /// Executor over `provider` with the given chunk size (clamped to at least 1)
    pub fn new(provider: &'a dyn ContentProvider, chunk_size: usize) -> Self {
        Self {
            provider,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Apply `config` to every node, chunk by chunk
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all, fields(nodes = nodes.len())))]
    pub async fn execute(
        &self,
        nodes: &[Node],
        config: &ActionConfig,
    ) -> Result<ExecutionReport, ActionError> {
        let mut report = ExecutionReport {
            nodes: nodes.len(),
            ..Default::default()
        };

        for (chunk, batch) in nodes.chunks(self.chunk_size).enumerate() {
            let removals: Vec<&Node> = batch.iter().filter(|n| config.should_remove(n)).collect();
            report.removed += self.wave(chunk, Action::Remove, &removals).await?;

            let locks: Vec<&Node> = batch.iter().filter(|n| config.should_lock(n)).collect();
            report.locked += self.wave(chunk, Action::Lock, &locks).await?;

            report.chunks += 1;
        }

        Ok(report)
    }

    async fn wave(
        &self,
        chunk: usize,
        action: Action,
        targets: &[&Node],
    ) -> Result<usize, ActionError> {
        if targets.is_empty() {
            return Ok(0);
        }

        let results = join_all(
            targets
                .iter()
                .map(|node| action.apply(self.provider, &node.id)),
        )
        .await;

        let mut failures = targets
            .iter()
            .zip(results)
            .filter_map(|(node, result)| result.err().map(|e| (node.id.clone(), e)));

        let Some((first_id, first_error)) = failures.next() else {
            return Ok(targets.len());
        };
        let failed = 1 + failures.count();

        #[cfg(feature = "tracing")]
        tracing::warn!(
            chunk,
            %action,
            failed,
            attempted = targets.len(),
            first = %first_id,
            error = %first_error,
            "action wave failed"
        );

        Err(ActionError {
            chunk,
            action,
            failed,
            attempted: targets.len(),
            first_id,
            source: first_error,
        })
    }
}
