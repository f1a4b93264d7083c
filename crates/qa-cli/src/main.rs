//! `qa-state`: inspect and refresh the QA state of item JSON files

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use qa_engine::{InMemoryGateway, JsonFileGateway, ProgressMode, QaConfig, QaEngine, QaStateGateway, RefreshOptions};
use qa_model::{Item, Language};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn item_arg() -> Arg {
    Arg::new("item")
        .long("item")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Item JSON file")
}

fn lang_arg() -> Arg {
    Arg::new("lang")
        .long("lang")
        .help("Compute as if editing in this language")
}

fn store_arg() -> Arg {
    Arg::new("store")
        .long("store")
        .default_value(".qa-state")
        .value_parser(value_parser!(PathBuf))
        .help("Directory holding QA state files")
}

fn cli() -> Command {
    Command::new("qa-state")
        .version(qa_engine::VERSION)
        .about("Content quality assurance: scenario progress and status")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .default_value("qa.yaml")
                .value_parser(value_parser!(PathBuf))
                .help("QA configuration (.yaml, .yml or .toml)"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Debug logging"),
        )
        .subcommand(
            Command::new("attributes")
                .about("List attributes governed in a scenario, or in all scenarios")
                .arg(item_arg())
                .arg(Arg::new("scenario").long("scenario").help("Scenario name")),
        )
        .subcommand(
            Command::new("progress")
                .about("Compute progress of every scenario, or of one")
                .arg(item_arg())
                .arg(lang_arg())
                .arg(Arg::new("scenario").long("scenario").help("Scenario name"))
                .arg(
                    Arg::new("translation")
                        .long("translation")
                        .action(ArgAction::SetTrue)
                        .help("Count only content edited in the language"),
                ),
        )
        .subcommand(
            Command::new("status")
                .about("Show stored status and the automatically determined one")
                .arg(item_arg())
                .arg(store_arg()),
        )
        .subcommand(
            Command::new("refresh")
                .about("Recompute progress and status and save the QA state")
                .arg(item_arg())
                .arg(store_arg())
                .arg(lang_arg())
                .arg(
                    Arg::new("scenario")
                        .long("scenario")
                        .action(ArgAction::Append)
                        .help("Scenario to recompute; repeatable, defaults to all"),
                ),
        )
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_item(path: &Path) -> Result<Item> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading item {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing item {}", path.display()))
}

fn write_item(path: &Path, item: &Item) -> Result<()> {
    let json = serde_json::to_string_pretty(item)?;
    std::fs::write(path, json).with_context(|| format!("writing item {}", path.display()))
}

fn engine_for(config: &QaConfig, item: &Item, gateway: Arc<dyn QaStateGateway>) -> Result<QaEngine> {
    QaEngine::from_config(config, item.item_type(), gateway)
        .with_context(|| format!("building engine for item type '{}'", item.item_type()))
}

fn file_gateway(args: &ArgMatches) -> Result<Arc<dyn QaStateGateway>> {
    let dir = args
        .get_one::<PathBuf>("store")
        .context("missing --store")?;
    let gateway = JsonFileGateway::open(dir).with_context(|| format!("opening store {}", dir.display()))?;
    Ok(Arc::new(gateway))
}

fn attributes(config: &QaConfig, args: &ArgMatches) -> Result<Value> {
    let item = read_item(item_path(args)?)?;
    let engine = engine_for(config, &item, Arc::new(InMemoryGateway::new()))?;
    let scenario = args.get_one::<String>("scenario").map(String::as_str);
    let attributes = engine.qa_attributes(&item, scenario)?;
    Ok(json!({
        "item": item.identity_key(),
        "scenario": scenario,
        "attributes": attributes.iter().collect::<Vec<_>>(),
    }))
}

fn progress(config: &QaConfig, args: &ArgMatches) -> Result<Value> {
    let item = read_item(item_path(args)?)?;
    let engine = engine_for(config, &item, Arc::new(InMemoryGateway::new()))?;
    let language = args
        .get_one::<String>("lang")
        .map_or_else(|| engine.current_language(), |l| Language::new(l.as_str()));
    let mode = if args.get_flag("translation") {
        ProgressMode::Translation
    } else {
        ProgressMode::Validation
    };
    let scenarios = match args.get_one::<String>("scenario") {
        Some(scenario) => vec![scenario.clone()],
        None => engine.config().scenarios.clone(),
    };

    let mut progress = serde_json::Map::new();
    for scenario in &scenarios {
        let value = engine.progress_in(&item, scenario, &language, mode)?;
        progress.insert(scenario.clone(), json!(value));
    }
    Ok(json!({
        "item": item.identity_key(),
        "language": language,
        "mode": mode.as_str(),
        "progress": progress,
    }))
}

fn status(config: &QaConfig, args: &ArgMatches) -> Result<Value> {
    let item = read_item(item_path(args)?)?;
    let engine = engine_for(config, &item, file_gateway(args)?)?;
    let determined = engine.determine_automatic_status(&item)?;
    Ok(json!({
        "item": item.identity_key(),
        "stored_label": engine.status_label(&item)?,
        "automatic": determined.map(|s| json!({ "name": s.name, "label": s.label })),
    }))
}

fn refresh(config: &QaConfig, args: &ArgMatches) -> Result<Value> {
    let path = item_path(args)?;
    let mut item = read_item(path)?;
    let engine = engine_for(config, &item, file_gateway(args)?)?;

    let mut options = RefreshOptions::all();
    if let Some(scenarios) = args.get_many::<String>("scenario") {
        options = options.with_scenarios(scenarios.cloned());
    }
    if let Some(lang) = args.get_one::<String>("lang") {
        options = options.with_language(lang.as_str());
    }

    let outcome = engine.refresh_qa_state(&mut item, options)?;
    // New states are linked on the item
    write_item(path, &item)?;
    Ok(json!({
        "item": item.identity_key(),
        "language": outcome.language,
        "state": outcome.state,
    }))
}

fn item_path(args: &ArgMatches) -> Result<&Path> {
    args.get_one::<PathBuf>("item")
        .map(PathBuf::as_path)
        .context("missing --item")
}

fn run(matches: &ArgMatches) -> Result<Value> {
    let config_path = matches
        .get_one::<PathBuf>("config")
        .context("missing --config")?;
    let config = QaConfig::load(config_path).with_context(|| format!("loading {}", config_path.display()))?;

    match matches.subcommand() {
        Some(("attributes", args)) => attributes(&config, args),
        Some(("progress", args)) => progress(&config, args),
        Some(("status", args)) => status(&config, args),
        Some(("refresh", args)) => refresh(&config, args),
        Some((other, _)) => anyhow::bail!("unknown command '{other}'"),
        None => anyhow::bail!("no command given"),
    }
}

fn main() -> ExitCode {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("verbose"));

    match run(&matches) {
        Ok(output) => match serde_json::to_string_pretty(&output) {
            Ok(text) => {
                println!("{text}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                tracing::error!(error = %e, "could not encode output");
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
