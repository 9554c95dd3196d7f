use anyhow::Result;
use clap::Parser;
use console::style;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use transcript_scraper::cli::{Cli, Commands, ProjectAction, SubprojectAction};
use transcript_scraper::config::Config;
use transcript_scraper::projects::ProjectStore;
use transcript_scraper::transcribe::{TranscriptPipeline, VideoReport};
use transcript_scraper::transport::{build_client, ConnectionStatus};
use transcript_scraper::utils::{format_count, format_file_size, truncate_display};
use transcript_scraper::{output, stats};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter: tracing_subscriber::EnvFilter = if cli.verbose {
        "transcript_scraper=debug".into()
    } else if cli.quiet {
        "transcript_scraper=warn".into()
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "transcript_scraper=info".into())
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::load(cli.config.as_deref())?;
    let root = cli
        .root
        .clone()
        .unwrap_or_else(|| config.scraper.output_root.clone());

    match cli.command {
        Commands::Fetch {
            input,
            project,
            subproject,
            language,
            no_proxy,
            cookies,
        } => {
            let store = ProjectStore::open(&root)?;
            let target = store.resolve_target(project.as_deref(), subproject.as_deref())?;

            let mut options = config.transport_options();
            if no_proxy {
                options.use_proxy = false;
            }
            if cookies.is_some() {
                options.cookie_file = cookies;
            }

            let (client, status) = build_client(&options).await?;
            print_connection(&status);

            let mut pipeline = TranscriptPipeline::from_config(&config, client).with_progress(!cli.quiet);
            if let Some(language) = language {
                pipeline = pipeline.with_language(language);
            }

            tracing::info!("Fetching {} ({}) into {}", input, pipeline.language(), target.display());
            let reports = pipeline.process(&input, &target).await?;
            print_reports(&reports);
        }
        Commands::Projects { action } => {
            let store = ProjectStore::open(&root)?;
            match action {
                ProjectAction::List => {
                    let projects = store.list_projects()?;
                    if projects.is_empty() {
                        println!("No projects under {}", store.root().display());
                    }
                    for project in projects {
                        println!("{}", project);
                    }
                }
                ProjectAction::Create { name } => {
                    let path = store.create_project(&name)?;
                    println!("{} Project created: {}", style("✓").green(), path.display());
                }
            }
        }
        Commands::Subprojects { action } => {
            let store = ProjectStore::open(&root)?;
            match action {
                SubprojectAction::List { project } => {
                    let subprojects = store.list_subprojects(&project)?;
                    if subprojects.is_empty() {
                        println!("No subprojects under '{}'", project);
                    }
                    for subproject in subprojects {
                        println!("{}", subproject);
                    }
                }
                SubprojectAction::Create { project, name } => {
                    let path = store.create_subproject(&project, &name)?;
                    println!("{} Subproject created: {}", style("✓").green(), path.display());
                }
            }
        }
        Commands::Stats { subprojects } => print_stats(&root, subprojects)?,
        Commands::Tokens { project, subproject } => {
            let store = ProjectStore::open(&root)?;
            let folder = store.resolve_target(Some(&project), subproject.as_deref())?;
            let (path, total) = output::generate_token_report(&folder)?;
            println!("Token report written to: {}", path.display());
            println!("Total tokens: {}", format_count(total));
        }
        Commands::Config { show } => {
            if show {
                config.display();
            } else {
                println!("Edit the config file to change settings:");
                match &cli.config {
                    Some(path) => println!("  {}", path.display()),
                    None => println!("  {}", Config::config_path()?.display()),
                }
            }
        }
    }

    Ok(())
}

fn print_connection(status: &ConnectionStatus) {
    let connection = if status.using_proxy {
        style(status.connection_type.to_string()).green()
    } else {
        style(status.connection_type.to_string()).yellow()
    };
    println!(
        "Connection: {} | cookies: {}",
        connection,
        if status.cookies_loaded { "loaded" } else { "none" }
    );
    if let Some(error) = &status.error {
        println!("{} {}", style("⚠").yellow(), error);
    }
}

fn print_reports(reports: &[VideoReport]) {
    for report in reports {
        match report {
            VideoReport::Saved { .. } => println!("{} {}", style("✓").green(), report),
            VideoReport::Skipped { .. } => println!("{} {}", style("✗").yellow(), report),
            VideoReport::Invalid { input, reason } => println!(
                "{} Skipped '{}': {}",
                style("✗").red(),
                truncate_display(input, 60),
                reason
            ),
        }
    }

    let saved = reports.iter().filter(|r| r.is_saved()).count();
    println!("{} of {} transcripts saved", saved, reports.len());
}

fn print_stats(root: &Path, by_subproject: bool) -> Result<()> {
    if by_subproject {
        let rows = stats::subproject_stats(root)?;
        println!("{:<20} {:<20} {:>8} {:>12} {:>10}", "PROJECT", "SUBPROJECT", "FILES", "TOKENS", "SIZE");
        for row in &rows {
            println!(
                "{:<20} {:<20} {:>8} {:>12} {:>10}",
                truncate_display(&row.project, 20),
                truncate_display(&row.subproject, 20),
                row.totals.file_count,
                format_count(row.totals.token_total),
                format_file_size(row.totals.byte_total)
            );
        }
    } else {
        let rows = stats::project_stats(root)?;
        println!("{:<20} {:>8} {:>12} {:>10}", "PROJECT", "FILES", "TOKENS", "SIZE");
        for row in &rows {
            println!(
                "{:<20} {:>8} {:>12} {:>10}",
                truncate_display(&row.project, 20),
                row.totals.file_count,
                format_count(row.totals.token_total),
                format_file_size(row.totals.byte_total)
            );
        }
    }
    Ok(())
}
