// Build summaries printed after `build graph` and `build dataset`

use crate::dataset::Dataset;
use crate::graph::Graph;
use serde::Serialize;
use std::collections::BTreeMap;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n";

#[derive(Debug, Clone, Serialize)]
pub struct BuildSummary {
    pub seeds: Vec<String>,
    pub max_depth: usize,
    pub max_links_per_node: usize,
    pub nodes: usize,
    pub edges: usize,
    pub nodes_per_depth: BTreeMap<usize, usize>,
    pub skipped: Vec<SkippedEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedEntry {
    pub title: String,
    pub reason: String,
}

impl BuildSummary {
    pub fn from_graph(graph: &Graph) -> Self {
        let mut nodes_per_depth = BTreeMap::new();
        for node in graph.nodes() {
            *nodes_per_depth.entry(node.depth).or_insert(0) += 1;
        }
        Self {
            seeds: graph.seeds().to_vec(),
            max_depth: graph.max_depth(),
            max_links_per_node: graph.max_links_per_node(),
            nodes: graph.node_count(),
            edges: graph.edge_count(),
            nodes_per_depth,
            skipped: graph
                .skipped()
                .iter()
                .map(|s| SkippedEntry {
                    title: s.title.clone(),
                    reason: s.reason.clone(),
                })
                .collect(),
        }
    }
}

pub fn generate_build_report(graph: &Graph) -> String {
    let summary = BuildSummary::from_graph(graph);
    let mut report = String::new();

    report.push_str(RULE);
    report.push_str("                             WIKIPY GRAPH BUILD\n");
    report.push_str(RULE);
    report.push('\n');

    report.push_str(&format!("Seeds:        {}\n", format_seeds(&summary.seeds)));
    report.push_str(&format!("Max Depth:    {}\n", summary.max_depth));
    report.push_str(&format!("Max Links:    {} per article\n", summary.max_links_per_node));
    report.push_str(&format!("Nodes:        {}\n", summary.nodes));
    report.push_str(&format!("Edges:        {}\n", summary.edges));
    report.push('\n');

    if !summary.nodes_per_depth.is_empty() {
        report.push_str("# Nodes per depth:\n");
        for (depth, count) in &summary.nodes_per_depth {
            report.push_str(&format!("  depth {}: {}\n", depth, count));
        }
        report.push('\n');
    }

    push_skipped(&mut report, &summary.skipped);
    report
}

pub fn generate_dataset_report(dataset: &Dataset) -> String {
    let mut report = String::new();

    report.push_str(RULE);
    report.push_str("                            WIKIPY DATASET BUILD\n");
    report.push_str(RULE);
    report.push('\n');

    report.push_str(&format!("Domain:       {}\n", dataset.domain.as_str()));
    report.push_str(&format!("Columns:      {}\n", dataset.columns().join(", ")));
    report.push_str(&format!("Rows:         {}\n", dataset.rows.len()));
    report.push_str(&format!("Skipped:      {}\n", dataset.skipped_count()));
    report.push('\n');

    let skipped: Vec<SkippedEntry> = dataset
        .skipped
        .iter()
        .map(|s| SkippedEntry {
            title: s.title.clone(),
            reason: s.reason.clone(),
        })
        .collect();
    push_skipped(&mut report, &skipped);
    report
}

fn push_skipped(report: &mut String, skipped: &[SkippedEntry]) {
    if skipped.is_empty() {
        report.push_str("# Summary: nothing skipped\n");
        return;
    }
    report.push_str(&format!("# Summary: {} skipped\n\n", skipped.len()));
    for (idx, entry) in skipped.iter().enumerate() {
        report.push_str(&format!("[{}] {}\n", idx + 1, entry.title));
        report.push_str(&wrap_text(&entry.reason, 80, "    "));
        report.push('\n');
    }
}

fn format_seeds(seeds: &[String]) -> String {
    match seeds.len() {
        0 => "none".to_string(),
        1..=3 => seeds.join(", "),
        n => format!("{}, {} and {} more", seeds[0], seeds[1], n - 2),
    }
}

fn wrap_text(text: &str, width: usize, indent: &str) -> String {
    let mut result = String::new();
    let mut current_line = String::new();
    let budget = width.saturating_sub(indent.len()).max(1);

    for word in text.split_whitespace() {
        if !current_line.is_empty() && current_line.len() + word.len() + 1 > budget {
            result.push_str(indent);
            result.push_str(&current_line);
            result.push('\n');
            current_line.clear();
        }
        if !current_line.is_empty() {
            current_line.push(' ');
        }
        current_line.push_str(word);
    }

    if !current_line.is_empty() {
        result.push_str(indent);
        result.push_str(&current_line);
        result.push('\n');
    }
    result
}
