use crate::error::{Result, WikipyError};
use crate::source::ArticleSource;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_DEPTH: usize = 1;
pub const DEFAULT_MAX_LINKS_PER_NODE: usize = 10;

/// Called with `(title, depth)` each time a node is expanded.
pub type BuildProgressCallback = Arc<dyn Fn(&str, usize) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct GraphNode {
    pub title: String,
    pub depth: usize,
}

/// `source` links to `target`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedArticle {
    pub title: String,
    pub depth: usize,
    pub reason: String,
}

/// Directed link graph produced by one [`GraphBuilder::build`] run.
///
/// Nodes and edges iterate in discovery order. Every edge joins two nodes of
/// the same graph.
#[derive(Debug, Clone)]
pub struct Graph {
    seeds: Vec<String>,
    max_depth: usize,
    max_links_per_node: usize,
    inner: StableDiGraph<GraphNode, ()>,
    index: HashMap<String, NodeIndex>,
    skipped: Vec<SkippedArticle>,
}

impl Graph {
    fn new(seeds: Vec<String>, max_depth: usize, max_links_per_node: usize) -> Self {
        Self {
            seeds,
            max_depth,
            max_links_per_node,
            inner: StableDiGraph::new(),
            index: HashMap::new(),
            skipped: Vec::new(),
        }
    }

    pub fn seeds(&self) -> &[String] {
        &self.seeds
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn max_links_per_node(&self) -> usize {
        self.max_links_per_node
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> + '_ {
        self.inner.node_indices().map(move |idx| &self.inner[idx])
    }

    pub fn edges(&self) -> impl Iterator<Item = GraphEdge> + '_ {
        self.inner.edge_indices().filter_map(move |edge| {
            let (source, target) = self.inner.edge_endpoints(edge)?;
            Some(GraphEdge {
                source: self.inner[source].title.clone(),
                target: self.inner[target].title.clone(),
            })
        })
    }

    pub fn node(&self, title: &str) -> Option<&GraphNode> {
        self.index.get(title).map(|idx| &self.inner[*idx])
    }

    pub fn contains_node(&self, title: &str) -> bool {
        self.index.contains_key(title)
    }

    pub fn contains_edge(&self, source: &str, target: &str) -> bool {
        match (self.index.get(source), self.index.get(target)) {
            (Some(a), Some(b)) => self.inner.contains_edge(*a, *b),
            _ => false,
        }
    }

    pub fn is_seed(&self, title: &str) -> bool {
        self.seeds.iter().any(|s| s == title)
    }

    /// Articles dropped from the graph because their links could not be fetched.
    pub fn skipped(&self) -> &[SkippedArticle] {
        &self.skipped
    }

    /// Outbound neighbours of `title` in edge insertion order.
    pub fn successors(&self, title: &str) -> Vec<&str> {
        let Some(idx) = self.index.get(title) else {
            return Vec::new();
        };
        let mut targets: Vec<(usize, &str)> = self
            .inner
            .edges(*idx)
            .map(|e| (e.id().index(), self.inner[e.target()].title.as_str()))
            .collect();
        targets.sort_by_key(|(id, _)| *id);
        targets.into_iter().map(|(_, t)| t).collect()
    }

    pub fn as_petgraph(&self) -> &StableDiGraph<GraphNode, ()> {
        &self.inner
    }

    /// Returns the node index and whether the node was newly created.
    fn ensure_node(&mut self, title: &str, depth: usize) -> (NodeIndex, bool) {
        if let Some(idx) = self.index.get(title) {
            return (*idx, false);
        }
        let idx = self.inner.add_node(GraphNode {
            title: title.to_string(),
            depth,
        });
        self.index.insert(title.to_string(), idx);
        (idx, true)
    }

    fn add_edge(&mut self, source: NodeIndex, target: NodeIndex) {
        if !self.inner.contains_edge(source, target) {
            self.inner.add_edge(source, target, ());
        }
    }

    /// Drop every skipped node and the edges touching it. Runs once, after the
    /// traversal, so no index slot is reused and discovery order is kept.
    fn prune_skipped(&mut self) {
        for skipped in &self.skipped {
            if let Some(idx) = self.index.remove(&skipped.title) {
                self.inner.remove_node(idx);
            }
        }
    }
}

/// Trim blanks and drop duplicate seeds, keeping first occurrence order.
pub fn normalize_seeds(seeds: &[String]) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let normalized: Vec<String> = seeds
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.to_string()))
        .map(str::to_string)
        .collect();

    if normalized.is_empty() {
        return Err(WikipyError::Validation(
            "at least one seed title is required".to_string(),
        ));
    }
    Ok(normalized)
}

/// Breadth-first traversal of the "links to" relation.
pub struct GraphBuilder<'a, S: ArticleSource> {
    source: &'a mut S,
    max_depth: usize,
    max_links_per_node: usize,
    progress_callback: Option<BuildProgressCallback>,
}

impl<'a, S: ArticleSource> GraphBuilder<'a, S> {
    pub fn new(source: &'a mut S) -> Self {
        Self {
            source,
            max_depth: DEFAULT_MAX_DEPTH,
            max_links_per_node: DEFAULT_MAX_LINKS_PER_NODE,
            progress_callback: None,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_max_links_per_node(mut self, max_links: usize) -> Self {
        self.max_links_per_node = max_links;
        self
    }

    pub fn with_progress_callback(mut self, callback: BuildProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Traverse from `seeds`. An article whose links cannot be fetched, seeds
    /// included, is listed in [`Graph::skipped`] and removed from the graph
    /// together with every edge touching it.
    pub async fn build(&mut self, seeds: &[String]) -> Result<Graph> {
        let seeds = normalize_seeds(seeds)?;
        info!(
            "Building graph from {} seed(s), max depth {}, max {} links per node",
            seeds.len(),
            self.max_depth,
            self.max_links_per_node
        );

        let mut graph = Graph::new(seeds.clone(), self.max_depth, self.max_links_per_node);
        let mut skipped_titles: HashSet<String> = HashSet::new();
        let mut frontier: VecDeque<(String, usize)> = VecDeque::new();

        for seed in seeds {
            graph.ensure_node(&seed, 0);
            frontier.push_back((seed, 0));
        }

        while let Some((title, depth)) = frontier.pop_front() {
            if depth >= self.max_depth || self.max_links_per_node == 0 {
                continue;
            }

            if let Some(ref callback) = self.progress_callback {
                callback(&title, depth);
            }

            let links = match self.source.get_links(&title).await {
                Ok(links) => links,
                Err(e) if e.is_recoverable() => {
                    warn!("Skipping {} at depth {}: {}", title, depth, e);
                    skipped_titles.insert(title.clone());
                    graph.skipped.push(SkippedArticle {
                        title,
                        depth,
                        reason: e.to_string(),
                    });
                    continue;
                }
                Err(e) => return Err(e),
            };

            let source_idx = graph.ensure_node(&title, depth).0;
            let mut seen = HashSet::new();
            let targets = links
                .into_iter()
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty() && seen.insert(l.clone()))
                .take(self.max_links_per_node);

            for target in targets {
                if skipped_titles.contains(&target) {
                    debug!("Not linking {} -> {} (skipped)", title, target);
                    continue;
                }
                let (target_idx, is_new) = graph.ensure_node(&target, depth + 1);
                graph.add_edge(source_idx, target_idx);
                if is_new {
                    frontier.push_back((target, depth + 1));
                }
            }
        }

        graph.prune_skipped();
        info!(
            "Graph complete: {} nodes, {} edges, {} skipped",
            graph.node_count(),
            graph.edge_count(),
            graph.skipped.len()
        );
        Ok(graph)
    }
}
