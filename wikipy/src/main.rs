use clap::ArgMatches;
use colored::Colorize;
use commands::command_argument_builder;
use wikipy::handlers::*;
use wikipy_core::print_banner;

mod commands;

#[tokio::main]
async fn main() {
    // A missing .env is fine; credentials may come from the environment.
    let _ = dotenvy::dotenv();

    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");
    init_logging(chosen_command.get_flag("verbose"));

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    if chosen_command.subcommand().is_none() {
        // No subcommand provided, just show the banner
        return;
    }

    if let Err(e) = dispatch(&chosen_command).await {
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}

async fn dispatch(matches: &ArgMatches) -> anyhow::Result<()> {
    if let Some(("init", primary_command)) = matches.subcommand() {
        return handle_init(primary_command);
    }

    let ctx = AppContext::open(matches)?;
    match matches.subcommand() {
        Some(("search", primary_command)) => handle_search(&ctx, primary_command).await,
        Some(("read", primary_command)) => handle_read(&ctx, primary_command).await,
        Some(("export", primary_command)) => handle_export(&ctx, primary_command).await,
        Some(("random", _)) => handle_random(&ctx).await,
        Some(("summary", primary_command)) => handle_summary(&ctx, primary_command).await,
        Some(("download", primary_command)) => handle_download(&ctx, primary_command).await,
        Some(("categories", primary_command)) => handle_categories(&ctx, primary_command).await,
        Some(("links", primary_command)) => handle_links(&ctx, primary_command).await,
        Some(("auth", primary_command)) => match primary_command.subcommand() {
            Some(("login", _)) => handle_auth_login(&ctx).await,
            Some(("logout", _)) => handle_auth_logout(&ctx),
            _ => unreachable!("clap should ensure we don't get here"),
        },
        Some(("build", primary_command)) => match primary_command.subcommand() {
            Some(("graph", secondary_command)) => handle_build_graph(&ctx, secondary_command).await,
            Some(("dataset", secondary_command)) => {
                handle_build_dataset(&ctx, secondary_command).await
            }
            _ => unreachable!("clap should ensure we don't get here"),
        },
        _ => unreachable!("clap should ensure we don't get here"),
    }
}

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);
