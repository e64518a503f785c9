//! Command dispatch
//!
//! Each command runs to completion on a single-threaded tokio runtime.

use std::future::Future;
use std::io;

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::application::services::{NavigatorService, SeriesOutcome, Selection};
use crate::application::SourceResultExt;
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::{output, render, CliError, CliResult};
use crate::config::{global_config_path, Settings};
use crate::domain::{RegionLevel, TreeRow};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;

/// Execute a CLI command.
pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let Some(command) = &cli.command else {
        return Err(CliError::Usage(
            "no command given, see `regstat --help`".into(),
        ));
    };

    match command {
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        Commands::Config { command } => execute_config(cli, command),
        _ => {
            let settings = load_settings(cli)?;
            let container = ServiceContainer::new(settings)?;
            block_on(execute_data_command(&container, command))
        }
    }
}

fn load_settings(cli: &Cli) -> CliResult<Settings> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(url) = &cli.base_url {
        settings.source.base_url = url.clone();
    }
    if cli.no_color {
        settings.display.color = false;
    }
    colored::control::set_override(settings.display.color);
    debug!("effective settings: {:?}", settings);
    Ok(settings)
}

fn block_on<F: Future<Output = CliResult<()>>>(future: F) -> CliResult<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(InfraError::Runtime)?;
    runtime.block_on(future)
}

async fn execute_data_command(container: &ServiceContainer, command: &Commands) -> CliResult<()> {
    match command {
        Commands::Tree { expand, all } => cmd_tree(container, expand, *all).await,
        Commands::Select { code, expand, json } => {
            cmd_select(container, code, expand, *json).await
        }
        Commands::Series { code, json } => cmd_series(container, code, *json).await,
        Commands::Search { query, expand } => cmd_search(container, query, expand).await,
        Commands::Years => cmd_years(container).await,
        Commands::Config { .. } | Commands::Completion { .. } => Ok(()),
    }
}

/// Load provinces and expand `codes` in order; expansion failures are reported, not fatal.
async fn prepare(navigator: &NavigatorService, codes: &[String]) -> CliResult<()> {
    navigator.reload_root().await?;
    for code in codes {
        match navigator.expand(code).await {
            Ok(outcome) => debug!("expand {}: {:?}", code, outcome),
            Err(e) if e.is_data_unavailable() => output::warning(&format!("{}: {}", code, e)),
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Expand cached ancestors of `code` by code prefix until it is in the tree.
async fn reveal(navigator: &NavigatorService, code: &str) -> CliResult<()> {
    loop {
        let snapshot = navigator.snapshot().await;
        if snapshot.rows.iter().any(|row| row.code == code) {
            return Ok(());
        }
        let next = snapshot
            .rows
            .iter()
            .filter(|row| row.level != RegionLevel::Subdistrict && row.loaded_children == 0)
            .find(|row| code.starts_with(row.code.as_str()) && code != row.code)
            .map(|row| row.code.clone());
        let Some(ancestor) = next else {
            return Ok(());
        };
        debug!("reveal {}: expanding {}", code, ancestor);
        let outcome = navigator.expand(&ancestor).await?;
        debug!("reveal {}: {:?}", code, outcome);
        let expanded = navigator.snapshot().await;
        let still_empty = expanded
            .rows
            .iter()
            .any(|row| row.code == ancestor && row.loaded_children == 0);
        if still_empty {
            return Ok(());
        }
    }
}

#[instrument(level = "debug", skip(container))]
async fn cmd_tree(container: &ServiceContainer, expand: &[String], all: bool) -> CliResult<()> {
    let navigator = container.navigator();
    prepare(&navigator, expand).await?;

    let snapshot = navigator.snapshot().await;
    let rows: Vec<&TreeRow> = if all {
        snapshot.rows.iter().collect()
    } else {
        snapshot.visible_rows()
    };
    output::info(&render::tree("regions", &rows));
    Ok(())
}

#[instrument(level = "debug", skip(container))]
async fn cmd_select(
    container: &ServiceContainer,
    code: &str,
    expand: &[String],
    json: bool,
) -> CliResult<()> {
    let navigator = container.navigator();
    prepare(&navigator, expand).await?;
    if expand.is_empty() {
        reveal(&navigator, code).await?;
    }

    let selection = navigator.select(code).await?;
    if json {
        output::info(&to_json(&selection)?);
        return Ok(());
    }

    let path = navigator.path_of(code).await?;
    output::header(&format!("{} [{}]", path.join(" > "), code));
    let node = selection.node();
    output::field("level", &node.level);
    match &selection {
        Selection::Province { node } => {
            output::field("population", &render::thousands(node.population));
            output::field("districts", &node.child_count);
        }
        Selection::District { detail, .. } => {
            for (label, value) in render::district_fields(detail) {
                output::field(label, &value);
            }
            let businesses = render::business_lines(detail, 10);
            if !businesses.is_empty() {
                output::header("Businesses");
                businesses.iter().for_each(|line| output::detail(line));
            }
            let tech = render::tech_lines(detail);
            if !tech.is_empty() {
                output::header("Technology sectors");
                tech.iter().for_each(|line| output::detail(line));
            }
        }
        Selection::Subdistrict { view, .. } => {
            for (label, value) in render::cross_section_fields(&view.cross_section) {
                output::field(label, &value);
            }
            print_series(&view.series);
        }
    }
    Ok(())
}

fn print_series(outcome: &SeriesOutcome) {
    output::header("Series");
    match outcome {
        SeriesOutcome::Ready(series) => {
            render::series_table(series)
                .iter()
                .for_each(|line| output::detail(line));
            output::header("Growth");
            render::growth_lines(series)
                .iter()
                .for_each(|line| output::detail(line));
        }
        SeriesOutcome::NoData => output::no_data("no year with population data"),
    }
}

#[instrument(level = "debug", skip(container))]
async fn cmd_series(container: &ServiceContainer, code: &str, json: bool) -> CliResult<()> {
    let outcome = match container.reconciliation().series(code).await {
        Ok(series) => SeriesOutcome::Ready(series),
        Err(e) if e.is_empty_series() => SeriesOutcome::NoData,
        Err(e) => return Err(e.into()),
    };
    if json {
        output::info(&to_json(&outcome)?);
    } else {
        output::info(&code);
        print_series(&outcome);
    }
    Ok(())
}

#[instrument(level = "debug", skip(container))]
async fn cmd_search(container: &ServiceContainer, query: &str, expand: &[String]) -> CliResult<()> {
    if expand.is_empty() {
        return Err(CliError::InvalidArgs(
            "search only covers fetched regions, pass --expand with province or district codes"
                .into(),
        ));
    }
    let navigator = container.navigator();
    prepare(&navigator, expand).await?;

    let hits = navigator.filter(query).await;
    if hits.is_empty() {
        output::no_data(&format!("no fetched region matches '{}'", query));
        return Ok(());
    }
    for hit in hits {
        let path = navigator.path_of(&hit.code).await?;
        output::info(&format!("{:<12} {}", hit.code, path.join(" > ")));
    }
    Ok(())
}

async fn cmd_years(container: &ServiceContainer) -> CliResult<()> {
    let years = container
        .source
        .list_years()
        .await
        .with_source_context("list years", "all")?;
    if years.is_empty() {
        output::no_data("the source reports no years");
    }
    for year in years {
        output::info(&year);
    }
    Ok(())
}

fn execute_config(cli: &Cli, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = load_settings(cli)?;
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Template => output::info(&Settings::template()),
        ConfigCommands::Path => {
            match global_config_path() {
                Some(path) => {
                    let state = if path.exists() { "" } else { " (not found)" };
                    output::field("global", &format!("{}{}", path.display(), state));
                }
                None => output::field("global", &"(no config directory)"),
            }
            if let Some(path) = &cli.config {
                output::field("explicit", &path.display());
            }
        }
    }
    Ok(())
}

fn to_json<T: serde::Serialize>(value: &T) -> CliResult<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
