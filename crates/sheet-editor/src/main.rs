//! Command line entry point: check sheet files, plan sweep charts, open live sessions

use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use sheet_client::ApiClient;
use sheet_editor::{Backends, Editor, EditorConfig};
use sheet_graph::{Sheet, SheetId};
use sheet_lease::SessionContext;
use sheet_sweep::{SweepData, SweepPlanner};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("sheet-editor")
        .version(sheet_editor::VERSION)
        .about("Inspect sheets and open live editing sessions")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .subcommand(
            Command::new("check")
                .about("Check a sheet file for structural problems")
                .arg(
                    Arg::new("sheet")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Sheet JSON file"),
                ),
        )
        .subcommand(
            Command::new("sweep-plan")
                .about("Show the chart chosen for each output of a sweep")
                .arg(
                    Arg::new("results")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Sweep results JSON file"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print the full chart panels as JSON"),
                ),
        )
        .subcommand(
            Command::new("open")
                .about("Open a sheet on the server and run a first preview")
                .arg(
                    Arg::new("sheet-id")
                        .required(true)
                        .value_parser(value_parser!(SheetId))
                        .help("Sheet id"),
                )
                .arg(
                    Arg::new("base-url")
                        .long("base-url")
                        .help("Server root URL"),
                )
                .arg(
                    Arg::new("identity")
                        .long("identity")
                        .help("User name sent to the server"),
                ),
        )
}

fn load_config(args: &ArgMatches) -> Result<EditorConfig> {
    let mut config = match args.get_one::<PathBuf>("config") {
        Some(path) => EditorConfig::load(path)?,
        None => EditorConfig::default(),
    };
    if let Some(url) = args.get_one::<String>("base-url") {
        config = config.with_base_url(url.clone());
    }
    if let Some(identity) = args.get_one::<String>("identity") {
        config = config.with_identity(identity.clone());
    }
    Ok(config)
}

fn check(args: &ArgMatches) -> Result<()> {
    let path = args.get_one::<PathBuf>("sheet").context("missing sheet path")?;
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let sheet: Sheet = serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;

    let issues = sheet.graph.check_integrity();
    println!(
        "{}: {} nodes, {} connections",
        sheet.name,
        sheet.graph.node_count(),
        sheet.graph.connection_count()
    );
    for issue in &issues {
        println!("  {issue}");
    }
    if !issues.is_empty() {
        bail!("{} integrity issue(s)", issues.len());
    }
    println!("  ok");
    Ok(())
}

fn sweep_plan(args: &ArgMatches) -> Result<()> {
    let path = args.get_one::<PathBuf>("results").context("missing results path")?;
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let data: SweepData = serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;

    let planner = SweepPlanner::new();
    if args.get_flag("json") {
        let panels = planner.plan(&data)?;
        println!("{}", serde_json::to_string_pretty(&panels)?);
        return Ok(());
    }
    for choice in planner.choose(&data) {
        println!(
            "{}: {} ({})",
            choice.output,
            choice.strategy.unwrap_or("no chart"),
            choice.shape
        );
    }
    Ok(())
}

async fn open(args: &ArgMatches) -> Result<()> {
    let config = load_config(args)?;
    let sheet = *args.get_one::<SheetId>("sheet-id").context("missing sheet id")?;
    let client = ApiClient::new(config.client_config()?)?;
    let ctx = SessionContext::new(config.identity.clone());

    let (editor, report) = Editor::open(Backends::from_client(client), config, ctx, sheet).await?;
    if let Some(warning) = report.warning() {
        println!("warning: {warning}");
    }
    for (node, err) in &report.reconcile.failures {
        println!("reference {node}: {err}");
    }
    println!("lease: {}", report.lease.describe());

    match editor.preview_now().await {
        Ok(annotation) => {
            println!("outputs refreshed: {}", annotation.outputs_refreshed.len());
            if let Some((node, message)) = annotation.first_error {
                println!("first error at {node}: {message}");
            }
        }
        Err(e) => println!("preview failed: {e}"),
    }
    editor.close().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let matches = cli().get_matches();
    match matches.subcommand() {
        Some(("check", args)) => check(args),
        Some(("sweep-plan", args)) => sweep_plan(args),
        Some(("open", args)) => open(args).await,
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn open_flags_override_config() {
        let matches = cli()
            .try_get_matches_from([
                "sheet-editor",
                "open",
                "6f1c1d1e-3b8a-4c55-9a53-0c1b5d8f2e10",
                "--identity",
                "ann",
            ])
            .unwrap();
        let (_, args) = matches.subcommand().unwrap();
        let config = load_config(args).unwrap();
        assert_eq!(config.identity, "ann");
        assert_eq!(config.heartbeat_secs, 10);
    }
}
