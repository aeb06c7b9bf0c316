//! Tabular datasets derived from a link traversal.
//!
//! The traversal discovers candidate articles; a per-domain extractor maps
//! each article's categories and summary onto a fixed set of columns. Rows
//! missing a required column are dropped and counted.

use crate::error::Result;
use crate::graph::{BuildProgressCallback, DEFAULT_MAX_DEPTH, GraphBuilder};
use crate::model::Article;
use crate::source::ArticleSource;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use tracing::{debug, info, warn};

pub const DEFAULT_DATASET_MAX_LINKS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DatasetDomain {
    Movies,
    Cities,
}

impl DatasetDomain {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "movies" | "movie" | "films" => Some(DatasetDomain::Movies),
            "cities" | "city" => Some(DatasetDomain::Cities),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetDomain::Movies => "movies",
            DatasetDomain::Cities => "cities",
        }
    }

    /// Column names in output order.
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            DatasetDomain::Movies => &[
                "title",
                "release_year",
                "country",
                "language",
                "director",
                "genres",
                "description",
            ],
            DatasetDomain::Cities => &["title", "country", "population", "description"],
        }
    }

    pub fn required_columns(&self) -> &'static [&'static str] {
        match self {
            DatasetDomain::Movies => &["title", "release_year"],
            DatasetDomain::Cities => &["title", "country"],
        }
    }

    pub fn extract(&self, article: &Article) -> DatasetRow {
        match self {
            DatasetDomain::Movies => extract_movie(article),
            DatasetDomain::Cities => extract_city(article),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    Integer(i64),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{}", s),
            Value::Integer(n) => write!(f, "{}", n),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DatasetRow {
    values: BTreeMap<String, Value>,
}

impl DatasetRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty text is treated as absent.
    pub fn set(&mut self, column: &str, value: Value) {
        if let Value::Text(ref s) = value
            && s.trim().is_empty()
        {
            return;
        }
        self.values.insert(column.to_string(), value);
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    pub fn missing<'c>(&self, required: &[&'c str]) -> Vec<&'c str> {
        required
            .iter()
            .copied()
            .filter(|c| !self.values.contains_key(*c))
            .collect()
    }

    /// Cells in `columns` order; absent values become empty cells.
    pub fn record(&self, columns: &[&str]) -> Vec<String> {
        columns
            .iter()
            .map(|c| self.values.get(*c).map(|v| v.to_string()).unwrap_or_default())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRow {
    pub title: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dataset {
    pub domain: DatasetDomain,
    pub rows: Vec<DatasetRow>,
    pub skipped: Vec<SkippedRow>,
}

impl Dataset {
    pub fn columns(&self) -> &'static [&'static str] {
        self.domain.columns()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<()> {
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record(self.columns())?;
        for row in &self.rows {
            csv.write_record(row.record(self.columns()))?;
        }
        csv.flush()?;
        Ok(())
    }

    pub fn to_csv_string(&self) -> Result<String> {
        let mut buf = Vec::new();
        self.write_csv(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

pub struct DatasetBuilder<'a, S: ArticleSource> {
    source: &'a mut S,
    domain: DatasetDomain,
    max_depth: usize,
    max_links_per_node: usize,
    progress_callback: Option<BuildProgressCallback>,
}

impl<'a, S: ArticleSource> DatasetBuilder<'a, S> {
    pub fn new(source: &'a mut S, domain: DatasetDomain) -> Self {
        Self {
            source,
            domain,
            max_depth: DEFAULT_MAX_DEPTH,
            max_links_per_node: DEFAULT_DATASET_MAX_LINKS,
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

    pub async fn build(&mut self, seeds: &[String]) -> Result<Dataset> {
        let mut graph_builder = GraphBuilder::new(&mut *self.source)
            .with_max_depth(self.max_depth)
            .with_max_links_per_node(self.max_links_per_node);
        if let Some(ref callback) = self.progress_callback {
            graph_builder = graph_builder.with_progress_callback(callback.clone());
        }
        let graph = graph_builder.build(seeds).await?;

        let mut skipped: Vec<SkippedRow> = graph
            .skipped()
            .iter()
            .map(|s| SkippedRow {
                title: s.title.clone(),
                reason: s.reason.clone(),
            })
            .collect();
        let mut rows = Vec::new();
        let required = self.domain.required_columns();

        for node in graph.nodes() {
            if let Some(ref callback) = self.progress_callback {
                callback(&node.title, node.depth);
            }

            let article = match self.source.get_article(&node.title).await {
                Ok(article) => article,
                Err(e) if e.is_recoverable() => {
                    warn!("Skipping dataset row for {}: {}", node.title, e);
                    skipped.push(SkippedRow {
                        title: node.title.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
                Err(e) => return Err(e),
            };

            let row = self.domain.extract(&article);
            let missing = row.missing(required);
            if missing.is_empty() {
                rows.push(row);
            } else {
                debug!("Dropping {}: missing {}", node.title, missing.join(", "));
                skipped.push(SkippedRow {
                    title: node.title.clone(),
                    reason: format!("missing {}", missing.join(", ")),
                });
            }
        }

        info!(
            "{} dataset complete: {} rows, {} skipped",
            self.domain.as_str(),
            rows.len(),
            skipped.len()
        );
        Ok(Dataset {
            domain: self.domain,
            rows,
            skipped,
        })
    }
}

// Movies

/// Demonyms that open Wikipedia's "<Nationality> <genre> films" categories.
const NATIONALITIES: &[&str] = &[
    "Afghan", "Albanian", "Algerian", "American", "Argentine", "Armenian", "Australian",
    "Austrian", "Bangladeshi", "Belgian", "Bolivian", "Bosnian", "Brazilian", "British",
    "Bulgarian", "Cambodian", "Cameroonian", "Canadian", "Chilean", "Chinese", "Colombian",
    "Croatian", "Cuban", "Czech", "Czechoslovak", "Danish", "Dutch", "Ecuadorian", "Egyptian",
    "English", "Estonian", "Ethiopian", "Filipino", "Finnish", "French", "Georgian", "German",
    "Ghanaian", "Greek", "Hong Kong", "Hungarian", "Icelandic", "Indian", "Indonesian",
    "Iranian", "Iraqi", "Irish", "Israeli", "Italian", "Jamaican", "Japanese", "Jordanian",
    "Kazakh", "Kenyan", "Korean", "Latvian", "Lebanese", "Lithuanian", "Malaysian",
    "Mexican", "Moroccan", "Nepalese", "New Zealand", "Nigerian", "North Korean",
    "Norwegian", "Pakistani", "Palestinian", "Peruvian", "Polish", "Portuguese", "Romanian",
    "Russian", "Saudi", "Scottish", "Senegalese", "Serbian", "Singaporean", "Slovak",
    "Slovenian", "South African", "South Korean", "Soviet", "Spanish", "Sri Lankan",
    "Swedish", "Swiss", "Syrian", "Taiwanese", "Thai", "Tunisian", "Turkish", "Ukrainian",
    "Uruguayan", "Venezuelan", "Vietnamese", "Welsh", "West German", "Yugoslav",
];

fn extract_movie(article: &Article) -> DatasetRow {
    let mut row = DatasetRow::new();
    row.set("title", Value::Text(article.title.clone()));

    let mut genres: Vec<String> = Vec::new();
    for category in &article.categories {
        let category = category.trim();

        if let Some(year) = film_year(category) {
            if row.get("release_year").is_none() {
                row.set("release_year", Value::Integer(year));
            }
            continue;
        }
        if let Some(director) = category.strip_prefix("Films directed by ") {
            if row.get("director").is_none() {
                row.set("director", Value::Text(director.to_string()));
            }
            continue;
        }
        if let Some(language) = category.strip_suffix("-language films") {
            let language = language.rsplit(' ').next().unwrap_or(language);
            if row.get("language").is_none() {
                row.set("language", Value::Text(language.to_string()));
            }
            continue;
        }
        if let Some((nationality, genre)) = nationality_and_genre(category) {
            if row.get("country").is_none() {
                row.set("country", Value::Text(nationality.to_string()));
            }
            if let Some(genre) = genre
                && !genres.iter().any(|g| g == genre)
            {
                genres.push(genre.to_string());
            }
        }
    }

    if !genres.is_empty() {
        row.set("genres", Value::Text(genres.join(";")));
    }
    if let Some(ref description) = article.description {
        row.set("description", Value::Text(description.clone()));
    }
    row
}

/// `"2010 films"` or `"2010 science fiction films"` -> 2010. Decades
/// (`"2010s films"`) do not count.
fn film_year(category: &str) -> Option<i64> {
    let (first, rest) = category.split_once(' ')?;
    if first.len() != 4 || !first.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if rest != "films" && !rest.ends_with(" films") {
        return None;
    }
    first.parse().ok()
}

/// `"American heist films"` -> `("American", Some("heist"))`. Only known
/// demonyms count, so genre-only categories such as `"Dystopian films"` do not.
fn nationality_and_genre(category: &str) -> Option<(&str, Option<&str>)> {
    let body = category.strip_suffix(" films")?;
    // Longest match first so "South Korean" wins over "Korean".
    let nationality = NATIONALITIES
        .iter()
        .filter(|n| {
            body.strip_prefix(**n)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with(' '))
        })
        .max_by_key(|n| n.len())?;
    let (first, rest) = body.split_at(nationality.len());
    let rest = rest.trim();
    Some((first, (!rest.is_empty()).then_some(rest)))
}

// Cities

const COUNTRY_CATEGORY_PREFIXES: &[&str] = &[
    "Cities in ",
    "Cities and towns in ",
    "Port cities and towns in ",
    "Towns in ",
    "Municipalities of ",
    "Populated places in ",
    "Capitals in ",
];

fn extract_city(article: &Article) -> DatasetRow {
    let mut row = DatasetRow::new();
    row.set("title", Value::Text(article.title.clone()));

    let country = COUNTRY_CATEGORY_PREFIXES.iter().find_map(|prefix| {
        article
            .categories
            .iter()
            .find_map(|c| c.trim().strip_prefix(prefix))
    });
    if let Some(country) = country {
        row.set("country", Value::Text(strip_qualifier(country).to_string()));
    }

    if let Some(population) = parse_population(&article.summary) {
        row.set("population", Value::Integer(population));
    }
    if let Some(ref description) = article.description {
        row.set("description", Value::Text(description.clone()));
    }
    row
}

/// `"France (19th century)"` -> `"France"`
fn strip_qualifier(s: &str) -> &str {
    s.split(" (").next().unwrap_or(s).trim()
}

const POPULATION_FILLERS: &[&str] = &[
    "about",
    "approximately",
    "around",
    "nearly",
    "over",
    "roughly",
    "some",
    "almost",
    "more",
    "than",
    "an",
    "estimated",
];

/// Population figure from summary prose: "a population of 2,102,650",
/// "a population of over 8.3 million" or "3,520,031 inhabitants".
pub fn parse_population(text: &str) -> Option<i64> {
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower.split_whitespace().collect();

    for (i, word) in words.iter().enumerate() {
        if word.trim_end_matches(',') == "population"
            && let Some(next) = words.get(i + 1)
            && *next == "of"
        {
            let mut j = i + 2;
            while words.get(j).is_some_and(|w| POPULATION_FILLERS.contains(w)) {
                j += 1;
            }
            if let Some(n) = number_at(&words, j) {
                return Some(n);
            }
        }

        let trimmed = word.trim_end_matches(|c: char| c.is_ascii_punctuation());
        if (trimmed == "inhabitants" || trimmed == "residents" || trimmed == "people") && i > 0 {
            if i >= 2
                && let Some(n) = number_at(&words, i - 2)
                && matches!(words[i - 1], "million" | "billion")
            {
                return Some(n);
            }
            if let Some(n) = number_at(&words, i - 1) {
                return Some(n);
            }
        }
    }
    None
}

fn number_at(words: &[&str], idx: usize) -> Option<i64> {
    let raw = words.get(idx)?;
    let digits: String = raw
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .filter(|c| *c != ',')
        .collect();
    let digits = digits.trim_end_matches('.');
    if digits.is_empty() {
        return None;
    }
    let value: f64 = digits.parse().ok()?;

    let scale = match words.get(idx + 1).map(|w| w.trim_end_matches(|c: char| c.is_ascii_punctuation())) {
        Some("million") => 1_000_000.0,
        Some("billion") => 1_000_000_000.0,
        _ => 1.0,
    };
    Some((value * scale).round() as i64)
}
