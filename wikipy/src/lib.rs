// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    load_seeds_from_file, load_seeds_from_source, parse_seed_line, validate_depth,
};
