use crate::error::{Result, WikipyError};
use crate::graph::Graph;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::Path;
use std::process::{Command, Stdio};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderFormat {
    /// Graphviz DOT, input for a layout tool.
    Image,
    /// Mermaid flowchart, for embedding in Markdown.
    DiagramText,
}

impl RenderFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "image" | "dot" => Some(RenderFormat::Image),
            "diagram_text" | "diagram-text" | "mermaid" => Some(RenderFormat::DiagramText),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RenderFormat::Image => "image",
            RenderFormat::DiagramText => "diagram_text",
        }
    }
}

pub fn render(graph: &Graph, format: RenderFormat) -> String {
    match format {
        RenderFormat::Image => render_dot(graph),
        RenderFormat::DiagramText => render_mermaid(graph),
    }
}

pub fn render_dot(graph: &Graph) -> String {
    let mut s = String::new();
    s.push_str("digraph Wikipy {\n");
    s.push_str("  rankdir=LR;\n");
    s.push_str("  graph [fontname=Helvetica, splines=curved];\n");
    s.push_str("  node [shape=box, fontsize=10, style=\"filled,rounded\", fillcolor=\"#eeeeee\"];\n");
    s.push_str("  edge [fontname=Helvetica, fontsize=9];\n");

    for node in graph.nodes() {
        let id = escape_dot(&node.title);
        let label = escape_dot(&format!("{}\n(depth {})", node.title, node.depth));
        if graph.is_seed(&node.title) {
            let _ = writeln!(
                s,
                "  \"{id}\" [label=\"{label}\", fillcolor=\"#ffd966\", penwidth=2];"
            );
        } else {
            let _ = writeln!(s, "  \"{id}\" [label=\"{label}\"];");
        }
    }

    for edge in graph.edges() {
        let _ = writeln!(
            s,
            "  \"{}\" -> \"{}\";",
            escape_dot(&edge.source),
            escape_dot(&edge.target)
        );
    }

    s.push_str("}\n");
    s
}

pub fn render_mermaid(graph: &Graph) -> String {
    let mut s = String::from("flowchart LR\n");
    let mut ids: HashMap<&str, String> = HashMap::new();
    let mut seeds = Vec::new();

    for (k, node) in graph.nodes().enumerate() {
        let id = format!("n{k}");
        let _ = writeln!(s, "    {id}[\"{}\"]", escape_mermaid(&node.title));
        if graph.is_seed(&node.title) {
            seeds.push(id.clone());
        }
        ids.insert(node.title.as_str(), id);
    }

    for edge in graph.edges() {
        if let (Some(a), Some(b)) = (ids.get(edge.source.as_str()), ids.get(edge.target.as_str())) {
            let _ = writeln!(s, "    {a} --> {b}");
        }
    }

    if !seeds.is_empty() {
        s.push_str("    classDef seed fill:#ffd966,stroke:#333,stroke-width:2px\n");
        let _ = writeln!(s, "    class {} seed", seeds.join(","));
    }
    s
}

pub fn escape_dot(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            _ => out.push(c),
        }
    }
    out
}

pub fn escape_mermaid(s: &str) -> String {
    s.replace('"', "#quot;").replace(['\n', '\r'], " ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Svg,
    Png,
}

impl ImageKind {
    /// Raster target implied by the output file extension, if any.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "svg" => Some(ImageKind::Svg),
            "png" => Some(ImageKind::Png),
            _ => None,
        }
    }

    fn dot_flag(&self) -> &'static str {
        match self {
            ImageKind::Svg => "-Tsvg",
            ImageKind::Png => "-Tpng",
        }
    }
}

/// Lay out `dot` source with the Graphviz `dot` executable.
pub fn rasterize(dot: &str, kind: ImageKind) -> Result<Vec<u8>> {
    let mut child = Command::new("dot")
        .arg(kind.dot_flag())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| WikipyError::Render(format!("failed to run graphviz 'dot': {e}")))?;

    // Closing stdin before waiting lets `dot` see EOF. A failed write usually
    // means it exited early, and its stderr says why.
    let written = match child.stdin.take() {
        Some(mut stdin) => stdin.write_all(dot.as_bytes()),
        None => Ok(()),
    };
    let output = child
        .wait_with_output()
        .map_err(|e| WikipyError::Render(format!("failed to wait for graphviz 'dot': {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(WikipyError::Render(format!(
            "graphviz 'dot' failed with code {:?}: {}",
            output.status.code(),
            stderr.trim()
        )));
    }
    if let Err(e) = written {
        return Err(WikipyError::Render(format!(
            "failed to write to graphviz 'dot': {e}"
        )));
    }
    Ok(output.stdout)
}
