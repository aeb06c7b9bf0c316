use crate::CLAP_STYLING;
use clap::{arg, command};
use std::path::PathBuf;

fn seed_args(cmd: clap::Command) -> clap::Command {
    cmd.arg(
        arg!(-s --"seed" <TITLE>)
            .required(false)
            .help("Seed article title (repeatable)")
            .action(clap::ArgAction::Append)
            .conflicts_with("seeds-file"),
    )
    .arg(
        arg!(-S --"seeds-file" <PATH>)
            .required(false)
            .help("Path to a newline-delimited file of seed titles")
            .value_parser(clap::value_parser!(PathBuf))
            .conflicts_with("seed"),
    )
    // Parsed as i64 so a negative depth is reported as a validation error.
    .arg(
        arg!(-d --"depth" <N>)
            .required(false)
            .help("Maximum link distance from a seed")
            .value_parser(clap::value_parser!(i64))
            .allow_negative_numbers(true)
            .default_value("1"),
    )
    .arg(
        arg!(-m --"max-links" <N>)
            .required(false)
            .help("Maximum links followed per article")
            .value_parser(clap::value_parser!(usize)),
    )
    .arg(
        arg!(-o --"output" <PATH>)
            .required(true)
            .help("File to write the result to")
            .value_parser(clap::value_parser!(PathBuf)),
    )
    .arg(
        arg!(--"offline")
            .required(false)
            .help("Only use articles already in the local cache")
            .action(clap::ArgAction::SetTrue)
            .conflicts_with("refresh"),
    )
    .arg(
        arg!(--"refresh")
            .required(false)
            .help("Re-fetch every article and overwrite the cache")
            .action(clap::ArgAction::SetTrue),
    )
}

fn title_arg() -> clap::Arg {
    arg!(<TITLE>).help("Article title").required(true)
}

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("wikipy")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A Wikipedia search CLI, reader and link-graph builder")
        .bin_name("wikipy")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-q --"quiet" "Suppress banner and non-essential output")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(-v --"verbose" "Show debug logging")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(--"db" <PATH>)
                .required(false)
                .help("Location of the wikipy database")
                .env("WIKIPY_DB")
                .default_value("~/.config/wikipy/wikipy.db")
                .global(true),
        )
        .arg(
            arg!(--"lang" <CODE>)
                .required(false)
                .help("Wikipedia language edition")
                .env("WIKIPY_LANG")
                .default_value("en")
                .global(true),
        )
        .subcommand_required(false)
        .subcommand(
            command!("init")
                .about("Initializes the wikipy database on your filesystem")
                .arg(
                    arg!([PATH])
                        .required(false)
                        .help("Directory to store the wikipy database")
                        .default_value("~/.config/wikipy/"),
                )
                .arg(
                    arg!(-f --"force")
                        .help("Overwrite any existing database at the specified location")
                        .required(false),
                ),
        )
        .subcommand(
            command!("search")
                .about("Search Wikipedia for articles")
                .arg(
                    arg!(<TERMS>)
                        .help("Search terms")
                        .num_args(1..)
                        .required(true),
                )
                .arg(
                    arg!(-t --"type" <TYPE>)
                        .required(false)
                        .help("Search full text (articles) or titles only")
                        .value_parser(["articles", "titles"])
                        .default_value("articles"),
                )
                .arg(
                    arg!(-l --"limit" <N>)
                        .required(false)
                        .help("Maximum number of results (1-100)")
                        .value_parser(clap::value_parser!(u32).range(1..=100))
                        .default_value("5"),
                ),
        )
        .subcommand(
            command!("read")
                .about("Read an article in the terminal")
                .arg(title_arg()),
        )
        .subcommand(
            command!("export")
                .about("Export an article as HTML, Markdown or plain text")
                .arg(title_arg())
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Export format")
                        .value_parser(["html", "markdown", "text"])
                        .default_value("text"),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save to file (default: print to screen)")
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
        .subcommand(command!("random").about("Get a random article"))
        .subcommand(
            command!("summary")
                .about("Get the summary of an article")
                .arg(title_arg()),
        )
        .subcommand(
            command!("download")
                .about("Download the images of an article")
                .arg(title_arg())
                .arg(
                    arg!(--"dir" <PATH>)
                        .required(false)
                        .help("Directory to save images into")
                        .value_parser(clap::value_parser!(PathBuf))
                        .default_value("."),
                )
                .arg(
                    arg!(-l --"limit" <N>)
                        .required(false)
                        .help("Maximum number of images to download")
                        .value_parser(clap::value_parser!(usize)),
                ),
        )
        .subcommand(
            command!("categories")
                .about("List the visible categories of an article")
                .arg(title_arg()),
        )
        .subcommand(
            command!("links")
                .about("List the articles an article links to")
                .arg(title_arg())
                .arg(
                    arg!(-l --"limit" <N>)
                        .required(false)
                        .help("Maximum number of links to show")
                        .value_parser(clap::value_parser!(usize)),
                ),
        )
        .subcommand(
            command!("auth")
                .about("Manage Wikimedia API access tokens")
                .subcommand_required(true)
                .subcommand(
                    command!("login")
                        .about("Request an access token with WM_CLIENT_ID and WM_CLIENT_SECRET"),
                )
                .subcommand(command!("logout").about("Delete all stored access tokens")),
        )
        .subcommand(
            command!("build")
                .about("Build a link graph or a dataset from seed articles")
                .subcommand_required(true)
                .subcommand(
                    seed_args(command!("graph").about("Build a link graph and render it")).arg(
                        arg!(-f --"format" <FORMAT>)
                            .required(false)
                            .help("image (Graphviz DOT, rasterized for .svg/.png) or diagram_text (Mermaid)")
                            .value_parser(["image", "diagram_text"])
                            .default_value("image"),
                    ),
                )
                .subcommand(
                    seed_args(command!("dataset").about("Build a CSV dataset for a domain")).arg(
                        arg!(--"domain" <DOMAIN>)
                            .required(true)
                            .help("Dataset domain: movies or cities"),
                    ),
                ),
        )
}
