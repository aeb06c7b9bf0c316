use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;
use wikipy::handlers::*;

#[test]
fn test_parse_seed_line_trims() {
    assert_eq!(parse_seed_line("  Dog  "), Some("Dog".to_string()));
}

#[test]
fn test_parse_seed_line_skips_blank_and_comments() {
    assert_eq!(parse_seed_line(""), None);
    assert_eq!(parse_seed_line("   "), None);
    assert_eq!(parse_seed_line("# heist films"), None);
    assert_eq!(parse_seed_line("  #indented comment"), None);
}

#[test]
fn test_parse_seed_line_keeps_inner_hash() {
    assert_eq!(parse_seed_line("C# (programming language)"), Some("C# (programming language)".to_string()));
}

#[test]
fn test_load_seeds_from_file() -> Result<(), Box<dyn std::error::Error>> {
    let mut temp_file = NamedTempFile::new()?;
    writeln!(temp_file, "# seeds for the heist dataset")?;
    writeln!(temp_file, "Inception")?;
    writeln!(temp_file)?; // Empty line
    writeln!(temp_file, "  Heat (1995 film)  ")?;
    writeln!(temp_file, "Star Wars: Episode IV – A New Hope")?;

    let path = PathBuf::from(temp_file.path());
    let seeds = load_seeds_from_file(&path)?;

    assert_eq!(
        seeds,
        vec![
            "Inception",
            "Heat (1995 film)",
            "Star Wars: Episode IV – A New Hope"
        ]
    );
    Ok(())
}

#[test]
fn test_load_seeds_from_file_empty() {
    let mut temp_file = NamedTempFile::new().unwrap();
    writeln!(temp_file).unwrap();
    writeln!(temp_file, "   ").unwrap();
    writeln!(temp_file, "# only a comment").unwrap();

    let path = PathBuf::from(temp_file.path());
    let result = load_seeds_from_file(&path);

    assert!(result.is_err());
    assert!(result.unwrap_err().contains("No seed titles"));
}

#[test]
fn test_load_seeds_from_missing_file() {
    let result = load_seeds_from_file(&PathBuf::from("/nonexistent/seeds.txt"));
    assert!(result.unwrap_err().contains("Failed to read seeds file"));
}

#[test]
fn test_load_seeds_from_source_args() {
    let seeds = load_seeds_from_source(Some(vec!["Dog".to_string(), " Cat ".to_string()]), None).unwrap();
    assert_eq!(seeds, vec!["Dog", "Cat"]);
}

#[test]
fn test_load_seeds_from_source_blank_args() {
    let result = load_seeds_from_source(Some(vec!["  ".to_string()]), None);
    assert!(result.is_err());
}

#[test]
fn test_load_seeds_from_source_prefers_file() {
    let mut temp_file = NamedTempFile::new().unwrap();
    writeln!(temp_file, "Paris").unwrap();
    let path = PathBuf::from(temp_file.path());

    let seeds = load_seeds_from_source(Some(vec!["Dog".to_string()]), Some(&path)).unwrap();
    assert_eq!(seeds, vec!["Paris"]);
}

#[test]
fn test_load_seeds_from_source_no_input() {
    let result = load_seeds_from_source(None, None);
    assert!(result.is_err());
    assert!(result.unwrap_err().contains("--seed"));
}

#[test]
fn test_validate_depth() {
    assert_eq!(validate_depth(0), Ok(0));
    assert_eq!(validate_depth(3), Ok(3));
    assert!(validate_depth(-1).unwrap_err().contains("zero or greater"));
}

#[test]
fn test_resolve_db_path_expands_tilde() {
    let resolved = resolve_db_path("~/.config/wikipy/wikipy.db");
    assert!(!resolved.to_string_lossy().starts_with('~'));
    assert!(resolved.ends_with(".config/wikipy/wikipy.db"));

    assert_eq!(resolve_db_path("/tmp/w.db"), PathBuf::from("/tmp/w.db"));
}

#[test]
fn test_debug_enabled() {
    assert!(debug_enabled(Some("True")));
    assert!(debug_enabled(Some("1")));
    assert!(!debug_enabled(Some("False")));
    assert!(!debug_enabled(Some("")));
    assert!(!debug_enabled(None));
}

#[test]
fn test_log_filter() {
    assert_eq!(log_filter(false, false), "warn");
    assert_eq!(log_filter(true, false), "debug");
    assert_eq!(log_filter(false, true), "debug");
}
