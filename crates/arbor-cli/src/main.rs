//! `arbor` command-line front end

mod render;

use anyhow::{Context, Result};
use arbor_core::{Engine, EngineConfig, EngineError};
use arbor_harness::FailureContext;
use arbor_sync::{LocalFederation, StaticDiscovery};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use render::Output;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

fn cli() -> Command {
    Command::new("arbor")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Validate, test, debug and gate hierarchical component specifications")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("spec-dir")
                .long("spec-dir")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Specification directory (overrides the configuration)"),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .global(true)
                .default_value("text")
                .value_parser(["text", "json"])
                .help("Log line format on stderr"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Print results as JSON"),
        )
        .subcommand(
            Command::new("load")
                .about("Load a specification and print its summary")
                .arg(Arg::new("name").required(true)),
        )
        .subcommand(
            Command::new("tree")
                .about("Draw a specification's component tree")
                .arg(Arg::new("name").required(true))
                .arg(
                    Arg::new("format")
                        .long("format")
                        .default_value("ascii")
                        .value_parser(["ascii", "json"])
                        .help("ascii drawing or nested JSON outline"),
                )
                .arg(
                    Arg::new("depth")
                        .long("depth")
                        .value_parser(value_parser!(usize))
                        .help("Collapse components below this depth"),
                ),
        )
        .subcommand(
            Command::new("find")
                .about("Search a specification's components by id or name")
                .arg(Arg::new("name").required(true))
                .arg(Arg::new("query").required(true)),
        )
        .subcommand(
            Command::new("validate")
                .about("Deep-validate a specification")
                .arg(Arg::new("name").required(true)),
        )
        .subcommand(
            Command::new("test")
                .about("Run tree tests over one or more specifications")
                .arg(Arg::new("names").required(true).num_args(1..)),
        )
        .subcommand(
            Command::new("debug")
                .about("Diagnose a reported failure")
                .arg(Arg::new("name").required(true))
                .arg(Arg::new("failure-id").required(true))
                .arg(
                    Arg::new("message")
                        .long("message")
                        .short('m')
                        .default_value("")
                        .help("Observed error message"),
                )
                .arg(
                    Arg::new("component")
                        .long("component")
                        .help("Component suspected by the reporter"),
                )
                .arg(Arg::new("function").long("function"))
                .arg(
                    Arg::new("line")
                        .long("line")
                        .requires("function")
                        .value_parser(value_parser!(u32)),
                )
                .arg(
                    Arg::new("impact")
                        .long("impact")
                        .help("Impact level: critical, high, medium or low"),
                ),
        )
        .subcommand(
            Command::new("gate")
                .about("Run the integration gate for a candidate specification")
                .arg(Arg::new("name").required(true)),
        )
        .subcommand(
            Command::new("graph")
                .about("Build the dependency graph over every specification")
                .arg(
                    Arg::new("impact")
                        .long("impact")
                        .help("Also list components transitively depending on this one"),
                ),
        )
        .subcommand(Command::new("sync-status").about("Scan local specifications and report sync status"))
}

fn init_tracing(format: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if format == "json" {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}

fn load_config(matches: &ArgMatches) -> Result<EngineConfig> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => EngineConfig::from_toml_file(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(dir) = matches.get_one::<PathBuf>("spec-dir") {
        config = config.with_spec_dir(dir.clone());
    }
    Ok(config)
}

fn arg<'a>(matches: &'a ArgMatches, id: &str) -> Result<&'a str> {
    matches
        .get_one::<String>(id)
        .map(String::as_str)
        .with_context(|| format!("missing argument <{id}>"))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let matches = cli().get_matches();
    let log_format = matches
        .get_one::<String>("log-format")
        .map_or("text", String::as_str);
    init_tracing(log_format);

    let out = Output::new(matches.get_flag("json"));
    let engine = Engine::new(load_config(&matches)?)?;
    tracing::debug!(
        "Specification directory: {}",
        engine.config().store.spec_dir.display()
    );

    let outcome = match matches.subcommand() {
        Some(("load", args)) => engine
            .load(arg(args, "name")?)
            .await
            .map(|spec| out.spec(&spec)),
        Some(("tree", args)) => {
            let format = arg(args, "format")?;
            let depth = args.get_one::<usize>("depth").copied();
            engine
                .load(arg(args, "name")?)
                .await
                .map(|spec| out.tree(&spec, format == "json", depth))
        }
        Some(("find", args)) => {
            let query = arg(args, "query")?;
            engine
                .load(arg(args, "name")?)
                .await
                .map(|spec| out.matches(&spec, query))
        }
        Some(("validate", args)) => engine
            .validate(arg(args, "name")?)
            .await
            .map(|report| out.validation(&report)),
        Some(("test", args)) => {
            let names: Vec<String> = args
                .get_many::<String>("names")
                .map(|names| names.cloned().collect())
                .unwrap_or_default();
            let results = engine.run_tree_tests_many(&names).await;
            Ok(out.tree_tests(&results))
        }
        Some(("debug", args)) => {
            let context = failure_context(args)?;
            engine
                .debug_failure(arg(args, "name")?, arg(args, "failure-id")?, &context)
                .await
                .map(|results| out.debug(&results))
        }
        Some(("gate", args)) => engine
            .analyze_integration(arg(args, "name")?)
            .await
            .map(|approval| out.approval(&approval)),
        Some(("graph", args)) => graph(&engine, args, &out).await,
        Some(("sync-status", _)) => sync_status(engine, &out).await,
        _ => anyhow::bail!("unknown command"),
    };

    match outcome {
        Ok(code) => Ok(code),
        Err(err) => Ok(out.error(&err)),
    }
}

fn failure_context(args: &ArgMatches) -> Result<FailureContext> {
    let mut context = FailureContext::new(arg(args, "message")?);
    if let Some(component) = args.get_one::<String>("component") {
        context = context.with_component(component.as_str());
    }
    if let Some(function) = args.get_one::<String>("function") {
        context = context.with_location(function.as_str(), args.get_one::<u32>("line").copied());
    }
    if let Some(impact) = args.get_one::<String>("impact") {
        context = context.with_impact(impact.as_str());
    }
    Ok(context)
}

async fn graph(engine: &Engine, args: &ArgMatches, out: &Output) -> Result<ExitCode, EngineError> {
    let graph = engine.rebuild_graph().await?;
    let impacted = match args.get_one::<String>("impact") {
        Some(component) => Some((component.as_str(), engine.impact_of(component)?)),
        None => None,
    };
    Ok(out.graph(&graph, impacted))
}

/// One-shot sync view: scan the local directory and report what a daemon
/// for this node would know. No network transport is started.
async fn sync_status(engine: Engine, out: &Output) -> Result<ExitCode, EngineError> {
    let discovery = StaticDiscovery::new(engine.config().peers());
    let handle = engine.spawn_sync(Arc::new(LocalFederation::new()), Arc::new(discovery))?;
    handle.sync_now().await?;
    let engine = engine.with_sync(handle.clone());
    let status = engine.sync_status().await;
    handle.shutdown().await;
    Ok(out.sync_status(&status))
}
