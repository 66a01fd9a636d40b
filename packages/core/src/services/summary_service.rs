//! Tree Summaries for the List View
//!
//! Summaries are computed by explicit in-memory grouping: one query for the
//! nodes, one for the author names, then a single pass that buckets nodes by
//! `tree_id`. There is no per-tree round trip.
//!
//! Recent replies are the last [`RECENT_REPLY_LIMIT`] `OP` nodes of a tree in
//! storage order (`created_at`, then insertion), reported newest first. On a
//! `created_at` tie the later insertion counts as more recent.

use crate::db::{NodeStore, MAX_BOUND_IDS};
use crate::models::{Node, TreeSummary, RECENT_REPLY_LIMIT};
use crate::services::error::NodeServiceError;
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Default and maximum number of trees per summary page
pub const DEFAULT_MAX_PAGE_SIZE: u64 = 50;

/// Upper bound for any configured page size, so one page's tree ids fit a
/// single store query
pub const PAGE_SIZE_LIMIT: u64 = MAX_BOUND_IDS as u64;

/// Builds [`TreeSummary`] lists
#[derive(Clone)]
pub struct SummaryService {
    store: Arc<dyn NodeStore>,
    max_page_size: u64,
}

#[derive(Default)]
struct TreeAccumulator {
    /// Root and its position in storage order
    root: Option<(usize, Node)>,
    reply_count: usize,
    recent: VecDeque<Node>,
}

impl TreeAccumulator {
    fn push(&mut self, seq: usize, node: Node) {
        if node.is_root() {
            self.root = Some((seq, node));
            return;
        }

        self.reply_count += 1;
        if self.recent.len() == RECENT_REPLY_LIMIT {
            self.recent.pop_front();
        }
        self.recent.push_back(node);
    }
}

impl SummaryService {
    pub fn new(store: Arc<dyn NodeStore>) -> Self {
        Self {
            store,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }

    /// Override the page size cap used by [`summarize_page`](Self::summarize_page)
    ///
    /// Clamped to `1..=PAGE_SIZE_LIMIT`.
    pub fn with_max_page_size(mut self, max_page_size: u64) -> Self {
        self.max_page_size = max_page_size.clamp(1, PAGE_SIZE_LIMIT);
        self
    }

    pub fn max_page_size(&self) -> u64 {
        self.max_page_size
    }

    /// Summaries of every tree, newest root first
    #[instrument(skip(self))]
    pub async fn summarize(&self) -> Result<Vec<TreeSummary>, NodeServiceError> {
        let nodes = self.store.list_nodes().await?;
        let summaries = self.build(nodes, None).await?;
        debug!(trees = summaries.len(), "summarized all trees");
        Ok(summaries)
    }

    /// Summaries of one page of trees, newest root first
    ///
    /// `limit` is clamped to `1..=max_page_size`.
    #[instrument(skip(self))]
    pub async fn summarize_page(
        &self,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<TreeSummary>, NodeServiceError> {
        let limit = limit.clamp(1, self.max_page_size);
        let roots = self.store.list_roots_page(offset, limit).await?;
        if roots.is_empty() {
            return Ok(Vec::new());
        }

        let tree_ids: Vec<String> = roots.iter().map(|root| root.tree_id.clone()).collect();
        let nodes = self.store.list_nodes_in_trees(&tree_ids).await?;
        let summaries = self.build(nodes, Some(&tree_ids)).await?;
        debug!(trees = summaries.len(), offset, limit, "summarized page");
        Ok(summaries)
    }

    /// Group `nodes` (storage order) into summaries
    ///
    /// With `order = None` summaries are sorted newest root first; otherwise
    /// they follow the given tree id order.
    async fn build(
        &self,
        nodes: Vec<Node>,
        order: Option<&[String]>,
    ) -> Result<Vec<TreeSummary>, NodeServiceError> {
        let mut trees: HashMap<String, TreeAccumulator> = HashMap::new();
        for (seq, node) in nodes.into_iter().enumerate() {
            trees
                .entry(node.tree_id.clone())
                .or_default()
                .push(seq, node);
        }

        let mut complete = Vec::with_capacity(trees.len());
        for (tree_id, acc) in trees {
            match acc.root {
                Some((seq, root)) => complete.push((
                    seq,
                    root,
                    acc.reply_count,
                    acc.recent.into_iter().rev().collect::<Vec<_>>(),
                )),
                None => warn!(%tree_id, "skipping tree without root"),
            }
        }

        match order {
            Some(order) => {
                let rank: HashMap<&str, usize> = order
                    .iter()
                    .enumerate()
                    .map(|(i, id)| (id.as_str(), i))
                    .collect();
                complete.sort_by_key(|(_, root, _, _)| {
                    rank.get(root.tree_id.as_str()).copied().unwrap_or(usize::MAX)
                });
            }
            // Storage order is (created_at, insertion) ascending
            None => complete.sort_by_key(|(seq, _, _, _)| Reverse(*seq)),
        }

        let author_ids: Vec<String> = complete
            .iter()
            .map(|(_, root, _, _)| root.author_id.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let usernames = self.store.get_usernames(&author_ids).await?;

        Ok(complete
            .into_iter()
            .map(|(_, root, reply_count, recent_replies)| TreeSummary {
                author_username: usernames.get(&root.author_id).cloned(),
                root,
                reply_count,
                recent_replies,
            })
            .collect())
    }
}

// Comprehensive tests in separate module
#[cfg(test)]
#[path = "summary_service_test.rs"]
mod summary_service_test;
