pub mod convert;
pub mod data;
pub mod dataset;
pub mod error;
pub mod graph;
pub mod model;
pub mod render;
pub mod report;
pub mod source;

use colored::Colorize;

pub use data::Database;
pub use dataset::{Dataset, DatasetBuilder, DatasetDomain};
pub use error::{Result, WikipyError};
pub use graph::{Graph, GraphBuilder, GraphEdge, GraphNode};
pub use model::Article;
pub use render::{ImageKind, RenderFormat};
pub use source::{ArticleSource, CacheMode, CachedSource};

pub fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        "{} {}",
        "wikipy".bright_cyan().bold(),
        format!("v{}", version).dimmed()
    );
    println!("{}", "Wikipedia from the terminal".dimmed());
}
