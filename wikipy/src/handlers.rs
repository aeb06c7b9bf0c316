use anyhow::{Context, Result, anyhow, bail};
use clap::ArgMatches;
use colored::{ColoredString, Colorize};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use wikipy_core::convert::{extract_sections, html_to_markdown, html_to_text, strip_tags};
use wikipy_core::data::{Database, current_timestamp};
use wikipy_core::dataset::{DatasetBuilder, DatasetDomain};
use wikipy_core::graph::{BuildProgressCallback, DEFAULT_MAX_LINKS_PER_NODE, GraphBuilder};
use wikipy_core::render::{ImageKind, RenderFormat, rasterize, render};
use wikipy_core::report::{generate_build_report, generate_dataset_report};
use wikipy_core::source::{ArticleSource, CacheMode, CachedSource};
use wikipy_provider::{ClientConfig, ClientCredentials, WikipediaClient};

pub const DB_FILE_NAME: &str = "wikipy.db";
pub const DEBUG_VAR: &str = "DEBUG";

// Helper functions for build handlers

/// Seed titles from either a seeds file or repeated `--seed` arguments
pub fn load_seeds_from_source(
    seeds: Option<Vec<String>>,
    seeds_file: Option<&PathBuf>,
) -> Result<Vec<String>, String> {
    if let Some(path) = seeds_file {
        load_seeds_from_file(path)
    } else if let Some(seeds) = seeds {
        let seeds: Vec<String> = seeds.iter().filter_map(|s| parse_seed_line(s)).collect();
        if seeds.is_empty() {
            return Err("Seed titles must not be blank".to_string());
        }
        Ok(seeds)
    } else {
        Err("Either --seed or --seeds-file must be provided".to_string())
    }
}

/// Load seed titles from a newline-delimited file
pub fn load_seeds_from_file(path: &Path) -> Result<Vec<String>, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read seeds file {}: {}", path.display(), e))?;

    let seeds: Vec<String> = content.lines().filter_map(parse_seed_line).collect();
    if seeds.is_empty() {
        return Err(format!("No seed titles found in {}", path.display()));
    }
    Ok(seeds)
}

/// A trimmed title, or `None` for blank lines and `#` comments
pub fn parse_seed_line(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    Some(line.to_string())
}

pub fn validate_depth(depth: i64) -> Result<usize, String> {
    usize::try_from(depth).map_err(|_| format!("Depth must be zero or greater, got {}", depth))
}

pub fn resolve_db_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}

/// `DEBUG=True` (any casing) or `DEBUG=1`
pub fn debug_enabled(value: Option<&str>) -> bool {
    value.is_some_and(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
}

pub fn debug_flag() -> bool {
    debug_enabled(std::env::var(DEBUG_VAR).ok().as_deref())
}

pub fn log_filter(verbose: bool, debug: bool) -> &'static str {
    if verbose || debug { "debug" } else { "warn" }
}

pub fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_filter(verbose, debug_flag())));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn print_prompt(msg: &str) -> io::Result<String> {
    print!("{} ", msg.bright_cyan().bold());
    io::stdout().flush()?;
    let mut response = String::new();
    io::stdin().read_line(&mut response)?;
    Ok(response.trim().to_lowercase())
}

fn tag(label: &str) -> ColoredString {
    format!(" {} ", label.to_uppercase()).bold()
}

fn spinner(message: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(message.to_string());
    Ok(pb)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Database, API client and output flags shared by every command but `init`.
pub struct AppContext {
    pub db: Database,
    pub client: WikipediaClient,
    pub quiet: bool,
    pub debug: bool,
}

impl AppContext {
    pub fn open(matches: &ArgMatches) -> Result<Self> {
        let db_arg = matches
            .get_one::<String>("db")
            .ok_or_else(|| anyhow!("--db is required"))?;
        let language = matches
            .get_one::<String>("lang")
            .map(String::as_str)
            .unwrap_or("en");

        let db_path = resolve_db_path(db_arg);
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let db = Database::new(&db_path)
            .with_context(|| format!("Failed to open database {}", db_path.display()))?;

        let mut client = WikipediaClient::new(ClientConfig::for_language(language))?;
        if let Some(token) = db.latest_valid_token(current_timestamp())? {
            debug!("Using stored access token {}", token.id);
            client = client.with_token(token.access_token);
        }

        Ok(Self {
            db,
            client,
            quiet: matches.get_flag("quiet"),
            debug: debug_flag(),
        })
    }

    fn source(&self) -> CachedSource<'_> {
        CachedSource::new(&self.client, &self.db)
    }
}

fn required_title(args: &ArgMatches) -> Result<&str> {
    let title = args
        .get_one::<String>("TITLE")
        .map(|t| t.trim())
        .unwrap_or_default();
    if title.is_empty() {
        bail!("Article title must not be blank");
    }
    Ok(title)
}

pub fn handle_init(args: &ArgMatches) -> Result<()> {
    print_divider();
    println!("{}", "  WIKIPY INITIALIZATION".bright_white().bold());
    print_divider();
    println!();

    let config_arg = args
        .get_one::<String>("PATH")
        .ok_or_else(|| anyhow!("PATH is required"))?;
    let force = args.get_flag("force");
    let config_dir = resolve_db_path(config_arg);
    let db_path = config_dir.join(DB_FILE_NAME);

    println!(
        "{} Target: {}",
        "→".blue(),
        config_dir.display().to_string().bright_white()
    );
    println!();

    if Database::exists(&db_path) && !force {
        println!("{}", "⚠ WARNING".yellow().bold());
        println!("Database already exists at:");
        println!(
            "  {} {}",
            "•".yellow(),
            db_path.display().to_string().bright_white()
        );
        println!();

        let response = print_prompt("Would you like to overwrite it? [y/N]:")?;
        println!();

        if response != "y" && response != "yes" {
            println!("{} Keeping existing database", "→".blue());
            return Ok(());
        }
    }

    if Database::exists(&db_path) {
        Database::drop(&db_path)
            .with_context(|| format!("Failed to remove {}", db_path.display()))?;
        println!("{} Existing database removed", "✓".green().bold());
    }

    println!("{} Creating directory structure...", "→".blue());
    fs::create_dir_all(&config_dir)
        .with_context(|| format!("Failed to create {}", config_dir.display()))?;

    println!("{} Creating database...", "→".blue());
    Database::new(&db_path)
        .with_context(|| format!("Failed to create database {}", db_path.display()))?;

    println!();
    print_divider();
    println!("{}", "  INITIALIZATION COMPLETE".green().bold());
    print_divider();
    println!();
    println!(
        "{} Config directory: {}",
        "✓".green().bold(),
        config_dir.display().to_string().bright_white()
    );
    println!(
        "{} Database: {}",
        "✓".green().bold(),
        db_path.display().to_string().bright_white()
    );
    println!();
    Ok(())
}

pub async fn handle_search(ctx: &AppContext, args: &ArgMatches) -> Result<()> {
    let terms: Vec<String> = args
        .get_many::<String>("TERMS")
        .map(|v| v.cloned().collect())
        .unwrap_or_default();
    let search_type = args
        .get_one::<String>("type")
        .map(String::as_str)
        .unwrap_or("articles");
    let limit = args.get_one::<u32>("limit").copied().unwrap_or(5);

    if wikipy_provider::search_query(&terms).is_empty() {
        bail!("At least one search term is required");
    }

    if !ctx.quiet {
        let what = if search_type == "titles" { "article titles" } else { "articles" };
        println!(
            "{} Searching for {} containing: '{}' and a limit of {}.",
            tag("search").on_blue(),
            what,
            terms.join(" "),
            limit
        );
    }

    let pages = if search_type == "titles" {
        ctx.client.search_titles(&terms, limit).await?
    } else {
        ctx.client.search_pages(&terms, limit).await?
    };

    if ctx.debug {
        return print_json(&pages);
    }
    if pages.is_empty() {
        println!("{} No results", "✗".red());
        return Ok(());
    }

    for (idx, page) in pages.iter().enumerate() {
        println!("{}. {}", idx + 1, page.title.bright_white().bold());
        if let Some(ref description) = page.description {
            println!("   {}", description.dimmed());
        }
        if let Some(ref excerpt) = page.excerpt {
            let excerpt = strip_tags(excerpt);
            if !excerpt.is_empty() {
                println!("   {}", excerpt);
            }
        }
    }
    Ok(())
}

pub async fn handle_read(ctx: &AppContext, args: &ArgMatches) -> Result<()> {
    let title = required_title(args)?;
    if !ctx.quiet {
        println!("{} Reading article: {}.", tag("read").on_magenta(), title);
    }

    let html = ctx.source().get_html(title).await?;
    let sections = extract_sections(&html)?;
    if ctx.debug {
        return print_json(&sections);
    }

    println!();
    println!("{}", title.bright_white().bold().underline());
    for section in sections {
        println!();
        if section.level > 0 {
            let marker = "#".repeat(section.level as usize);
            println!("{} {}", marker.bright_blue(), section.heading.bright_blue().bold());
        }
        if !section.text.is_empty() {
            println!("{}", section.text);
        }
    }
    Ok(())
}

pub async fn handle_export(ctx: &AppContext, args: &ArgMatches) -> Result<()> {
    let title = required_title(args)?;
    let format = args
        .get_one::<String>("format")
        .map(String::as_str)
        .unwrap_or("text");
    let output = args.get_one::<PathBuf>("output");

    if !ctx.quiet {
        println!("{} Exporting article: {} to {}.", tag("export").on_yellow(), title, format);
    }

    let html = ctx.source().get_html(title).await?;
    let content = match format {
        "html" => html,
        "markdown" => html_to_markdown(&html)?,
        "text" => html_to_text(&html)?,
        other => bail!("Unknown export format: {}", other),
    };

    match output {
        Some(path) => {
            fs::write(path, &content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!(
                "{} Saved {} ({} bytes)",
                "✓".green().bold(),
                path.display().to_string().bright_white(),
                content.len()
            );
        }
        None => println!("{}", content),
    }
    Ok(())
}

pub async fn handle_random(ctx: &AppContext) -> Result<()> {
    if !ctx.quiet {
        println!("{} Getting a random article.", tag("random").on_cyan());
    }
    let title = ctx.client.random_title().await?;
    let summary = ctx.client.summary(&title).await?;
    if ctx.debug {
        return print_json(&summary);
    }

    println!("{}", summary.title.bright_white().bold());
    if let Some(ref description) = summary.description {
        println!("{}", description.dimmed());
    }
    println!();
    println!("{}", summary.extract);
    Ok(())
}

pub async fn handle_summary(ctx: &AppContext, args: &ArgMatches) -> Result<()> {
    let title = required_title(args)?;
    if !ctx.quiet {
        println!("{} Getting summary for article: {}.", tag("summary").on_green(), title);
    }

    let summary = ctx.client.summary(title).await?;
    if ctx.debug {
        return print_json(&summary);
    }

    println!("{}", summary.title.bright_white().bold());
    if let Some(ref description) = summary.description {
        println!("{}", description.dimmed());
    }
    if summary.is_disambiguation() {
        println!("{} This is a disambiguation page", "ℹ".blue());
    }
    println!();
    println!("{}", summary.extract);
    Ok(())
}

pub async fn handle_download(ctx: &AppContext, args: &ArgMatches) -> Result<()> {
    let title = required_title(args)?;
    let dir = args
        .get_one::<PathBuf>("dir")
        .cloned()
        .unwrap_or_else(|| PathBuf::from("."));
    let limit = args.get_one::<usize>("limit").copied();

    let files = ctx.client.page_files(title).await?;
    let mut files: Vec<_> = files
        .into_iter()
        .filter_map(|f| f.download_url().map(|url| (f.file_name().to_string(), url)))
        .collect();
    if let Some(limit) = limit {
        files.truncate(limit);
    }
    if files.is_empty() {
        println!("{} No images found for {}", "✗".red(), title);
        return Ok(());
    }

    fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let pb = spinner(&format!("Downloading {} image(s)", files.len()))?;
    let mut saved = 0;

    for (name, url) in &files {
        pb.set_message(format!("Downloading {}", name));
        match ctx.client.download(url).await {
            Ok(bytes) => {
                let path = dir.join(name);
                fs::write(&path, &bytes)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                pb.println(format!("  {} {}", "✓".green(), path.display()));
                saved += 1;
            }
            Err(e) => pb.println(format!("  {} {}: {}", "✗".red(), name, e)),
        }
    }

    pb.finish_and_clear();
    println!("{} Downloaded {}/{} image(s)", "✓".green().bold(), saved, files.len());
    Ok(())
}

pub async fn handle_categories(ctx: &AppContext, args: &ArgMatches) -> Result<()> {
    let title = required_title(args)?;
    let categories = ctx.source().get_categories(title).await?;
    if ctx.debug {
        return print_json(&categories);
    }
    for category in &categories {
        println!("  {} {}", "•".yellow(), category);
    }
    Ok(())
}

pub async fn handle_links(ctx: &AppContext, args: &ArgMatches) -> Result<()> {
    let title = required_title(args)?;
    let limit = args.get_one::<usize>("limit").copied();
    if !ctx.quiet {
        println!("{} Getting links for article: {}.", tag("links").on_purple(), title);
    }

    let mut links = ctx.source().get_links(title).await?;
    if let Some(limit) = limit {
        links.truncate(limit);
    }
    if ctx.debug {
        return print_json(&links);
    }
    for link in &links {
        println!("  {} {}", "→".blue(), link);
    }
    println!("{} {} link(s)", "✓".green().bold(), links.len());
    Ok(())
}

pub async fn handle_auth_login(ctx: &AppContext) -> Result<()> {
    let credentials = ClientCredentials::from_env()?;
    let token = ctx.client.request_token(&credentials).await?;
    let expires_at = token.expires_at(current_timestamp());
    let stored = ctx
        .db
        .create_token(&token.access_token, &token.refresh_token, expires_at)?;
    println!(
        "{} Access token {} stored, valid for {}s",
        "✓".green().bold(),
        stored.id,
        token.expires_in
    );
    Ok(())
}

pub fn handle_auth_logout(ctx: &AppContext) -> Result<()> {
    let count = ctx.db.delete_all_tokens()?;
    println!("{} Deleted {} token(s)", "✓".green().bold(), count);
    Ok(())
}

/// Everything `build graph` and `build dataset` read from their arguments,
/// checked before any request is made or file is created.
pub struct BuildArgs {
    pub seeds: Vec<String>,
    pub depth: usize,
    pub max_links: Option<usize>,
    pub output: PathBuf,
    pub mode: CacheMode,
}

impl BuildArgs {
    pub fn from_matches(args: &ArgMatches) -> Result<Self> {
        let seeds = load_seeds_from_source(
            args.get_many::<String>("seed").map(|v| v.cloned().collect()),
            args.get_one::<PathBuf>("seeds-file"),
        )
        .map_err(|e| anyhow!(e))?;
        let depth = validate_depth(args.get_one::<i64>("depth").copied().unwrap_or(1))
            .map_err(|e| anyhow!(e))?;
        let output = args
            .get_one::<PathBuf>("output")
            .cloned()
            .ok_or_else(|| anyhow!("An output path (-o) is required"))?;
        if let Some(parent) = output.parent()
            && !parent.as_os_str().is_empty()
            && !parent.is_dir()
        {
            bail!("Output directory {} does not exist", parent.display());
        }

        let mode = if args.get_flag("offline") {
            CacheMode::Offline
        } else if args.get_flag("refresh") {
            CacheMode::Refresh
        } else {
            CacheMode::ReadWrite
        };

        Ok(Self {
            seeds,
            depth,
            max_links: args.get_one::<usize>("max-links").copied(),
            output,
            mode,
        })
    }
}

fn progress_callback(pb: &ProgressBar) -> BuildProgressCallback {
    let pb = pb.clone();
    Arc::new(move |title: &str, depth: usize| {
        pb.set_message(format!("[depth {}] {}", depth, title));
    })
}

pub async fn handle_build_graph(ctx: &AppContext, args: &ArgMatches) -> Result<()> {
    let build = BuildArgs::from_matches(args)?;
    let format_arg = args
        .get_one::<String>("format")
        .map(String::as_str)
        .unwrap_or("image");
    let format = RenderFormat::from_str(format_arg)
        .ok_or_else(|| anyhow!("Unknown graph format: {}", format_arg))?;
    let image_kind = match format {
        RenderFormat::Image => ImageKind::from_path(&build.output),
        RenderFormat::DiagramText => None,
    };

    let pb = spinner(&format!("Building graph from {} seed(s)", build.seeds.len()))?;
    let mut source = ctx.source().with_mode(build.mode);
    let graph = GraphBuilder::new(&mut source)
        .with_max_depth(build.depth)
        .with_max_links_per_node(build.max_links.unwrap_or(DEFAULT_MAX_LINKS_PER_NODE))
        .with_progress_callback(progress_callback(&pb))
        .build(&build.seeds)
        .await;
    pb.finish_and_clear();
    let graph = graph?;
    info!(
        "{} cache hits, {} fetches",
        source.cache_hits(),
        source.fetches()
    );

    let text = render(&graph, format);
    let written = match image_kind {
        Some(kind) => fs::write(&build.output, rasterize(&text, kind)?),
        None => fs::write(&build.output, &text),
    };
    written.with_context(|| format!("Failed to write {}", build.output.display()))?;

    if ctx.debug {
        print_json(&wikipy_core::report::BuildSummary::from_graph(&graph))?;
    } else if !ctx.quiet {
        print!("{}", generate_build_report(&graph));
    }
    println!(
        "{} Graph written to {} ({} nodes, {} edges)",
        "✓".green().bold(),
        build.output.display().to_string().bright_white(),
        graph.node_count(),
        graph.edge_count()
    );
    Ok(())
}

pub async fn handle_build_dataset(ctx: &AppContext, args: &ArgMatches) -> Result<()> {
    let build = BuildArgs::from_matches(args)?;
    let domain_arg = args
        .get_one::<String>("domain")
        .map(String::as_str)
        .unwrap_or_default();
    let domain = DatasetDomain::from_str(domain_arg)
        .ok_or_else(|| anyhow!("Unknown dataset domain '{}' (expected movies or cities)", domain_arg))?;

    let pb = spinner(&format!("Building {} dataset", domain.as_str()))?;
    let mut source = ctx.source().with_mode(build.mode);
    let mut builder = DatasetBuilder::new(&mut source, domain)
        .with_max_depth(build.depth)
        .with_progress_callback(progress_callback(&pb));
    if let Some(max_links) = build.max_links {
        builder = builder.with_max_links_per_node(max_links);
    }
    let dataset = builder.build(&build.seeds).await;
    pb.finish_and_clear();
    let dataset = dataset?;

    let file = fs::File::create(&build.output)
        .with_context(|| format!("Failed to create {}", build.output.display()))?;
    dataset.write_csv(io::BufWriter::new(file))?;

    if ctx.debug {
        print_json(&dataset)?;
    } else if !ctx.quiet {
        print!("{}", generate_dataset_report(&dataset));
    }
    println!(
        "{} Dataset written to {} ({} rows, {} skipped)",
        "✓".green().bold(),
        build.output.display().to_string().bright_white(),
        dataset.rows.len(),
        dataset.skipped_count()
    );
    Ok(())
}
