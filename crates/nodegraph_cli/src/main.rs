// SPDX-License-Identifier: MIT OR Apache-2.0
//! `nodegraph` - inspect, check and generate node graph documents.

use clap::{Parser, Subcommand};
use nodegraph_core::config::ConfigError;
use nodegraph_core::execution::resolve_input;
use nodegraph_core::{
    ConnectorId, EngineConfig, ExecutionError, ExecutionOutcome, GraphError, GraphManager, LoadReport, Node,
    NodeExecutor, NodeId, Point, PortId, PortValue, Registry,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Node graph document tool
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Engine configuration (RON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log engine internals at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a summary of every graph in a document
    Inspect {
        /// Document to read
        file: PathBuf,
    },
    /// Verify that a document survives a save/load round trip
    Check {
        /// Document to read
        file: PathBuf,
    },
    /// Write a small sample program
    Demo {
        /// Output document
        out: PathBuf,
        /// Execute the program after saving it
        #[arg(long)]
        run: bool,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("Failed to load config: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("Round trip changed the document")]
    RoundTripMismatch,

    #[error("{0} element(s) could not be loaded")]
    Skipped(usize),

    #[error("Missing port '{0}' in sample program")]
    MissingPort(&'static str),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "nodegraph=debug,nodegraph_core=debug"
    } else {
        "nodegraph=info,nodegraph_core=warn"
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Command::Inspect { file } => inspect(&file, config),
        Command::Check { file } => check(&file, config),
        Command::Demo { out, run } => demo(&out, config, run),
    }
}

fn inspect(file: &Path, config: EngineConfig) -> Result<(), CliError> {
    let mut manager = GraphManager::with_standard_types(config);
    let report = manager.load(file)?;

    for &graph_id in &report.graphs {
        let Some(graph) = manager.graph(graph_id) else {
            continue;
        };
        println!("Graph '{}' ({})", graph.name, graph.id);
        println!(
            "  {} node(s), {} connector(s), {} router(s)",
            graph.node_count(),
            graph.connector_count(),
            graph.routers().len()
        );
        for node in graph.nodes().iter().filter_map(|id| manager.find_node(*id)) {
            let Point { x, y } = node.position();
            println!(
                "  node {} '{}' [{}] at ({x}, {y}), {} port(s)",
                node.id,
                node.header(),
                node.node_type,
                node.all_ports().count()
            );
        }
        for connector in graph.connectors().iter().filter_map(|id| manager.find_connector(*id)) {
            let Some((start, end)) = connector.ends() else {
                continue;
            };
            println!(
                "  connector {} {} -> {} via {} router(s)",
                connector.id,
                port_label(&manager, start),
                port_label(&manager, end),
                connector.routers().len()
            );
        }
    }
    print_skipped(&report);
    Ok(())
}

fn port_label(manager: &GraphManager, port: PortId) -> String {
    manager
        .find_port(port)
        .and_then(|p| manager.find_node(p.owner).map(|n| format!("{}.{}", n.header(), p.name)))
        .unwrap_or_else(|| port.to_string())
}

fn print_skipped(report: &LoadReport) {
    for skipped in &report.skipped {
        println!(
            "  skipped <{}> {}: {}",
            skipped.element,
            skipped.id.as_deref().unwrap_or("(no id)"),
            skipped.reason
        );
    }
}

/// Load, save, reload and save again; both saves must match
fn check(file: &Path, config: EngineConfig) -> Result<(), CliError> {
    let mut first = GraphManager::with_standard_types(config.clone());
    let report = first.load(file)?;
    print_skipped(&report);
    let saved = first.save_to_string()?;

    let mut second = GraphManager::with_standard_types(config);
    second.load_from_str(&saved)?;
    if second.save_to_string()? != saved {
        return Err(CliError::RoundTripMismatch);
    }
    if !report.is_clean() {
        return Err(CliError::Skipped(report.skipped.len()));
    }

    println!("{}: {} graph(s) OK", file.display(), report.graphs.len());
    Ok(())
}

/// `start -> print <- text`, returning the manager and the start node
fn build_demo(config: EngineConfig) -> Result<(GraphManager, NodeId), CliError> {
    let mut manager = GraphManager::with_standard_types(config);
    let graph = manager.create_graph("Demo");
    let start = manager.create_node(graph, "start", Point::new(0.0, 0.0))?;
    let print = manager.create_node(graph, "print", Point::new(260.0, 0.0))?;
    let text = manager.create_node(graph, "text_constant", Point::new(0.0, 140.0))?;

    let port = |node: NodeId, name: &'static str| {
        manager
            .find_port_by_name(node, name)
            .ok_or(CliError::MissingPort(name))
    };
    let (exec, input) = (port(start, "Exec")?, port(print, "In")?);
    let (value, message) = (port(text, "Value")?, port(print, "Text")?);

    manager.connect(exec, input)?;
    let wire = manager.connect(value, message)?;
    if let Some(wire) = wire {
        manager.create_router(wire, 0, Point::new(200.0, 120.0))?;
    }
    manager.set_port_value(value, PortValue::String("Hello from the graph".to_string()))?;
    Ok((manager, start))
}

fn demo(out: &Path, config: EngineConfig, run: bool) -> Result<(), CliError> {
    let (mut manager, start) = build_demo(config)?;
    manager.save(out)?;
    println!("Wrote {}", out.display());

    if run {
        let state = manager.execute_node(start, None, &mut ConsoleExecutor)?;
        println!("Finished: {state:?}");
    }
    Ok(())
}

/// Runs the built-in node types, printing to stdout
struct ConsoleExecutor;

impl NodeExecutor for ConsoleExecutor {
    fn on_execute(
        &mut self,
        node: &Node,
        registry: &Registry,
        _via: Option<ConnectorId>,
    ) -> Result<ExecutionOutcome, ExecutionError> {
        match node.node_type.as_str() {
            "start" => Ok(ExecutionOutcome::fire("Exec")),
            "print" => match resolve_input(registry, node, "Text") {
                Some(PortValue::String(text)) => {
                    println!("{text}");
                    Ok(ExecutionOutcome::fire("Out"))
                }
                Some(other) => Err(ExecutionError::Custom(format!("Cannot print {other:?}"))),
                None => Err(ExecutionError::MissingInput("Text".to_string())),
            },
            _ => Ok(ExecutionOutcome::done()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodegraph_core::ExecutionState;

    #[test]
    fn test_demo_document_passes_check() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo.xml");
        demo(&path, EngineConfig::default(), false).unwrap();
        check(&path, EngineConfig::default()).unwrap();
        inspect(&path, EngineConfig::default()).unwrap();
    }

    #[test]
    fn test_demo_program_runs() {
        let (mut manager, start) = build_demo(EngineConfig::default()).unwrap();
        let state = manager.execute_node(start, None, &mut ConsoleExecutor).unwrap();
        assert_eq!(state, ExecutionState::Executed);
    }

    #[test]
    fn test_check_reports_skipped_elements() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xml");
        std::fs::write(
            &path,
            r#"<NodeGraph Version="1"><Graph Id="not-an-id" Name="Broken"/></NodeGraph>"#,
        )
        .unwrap();
        assert!(matches!(
            check(&path, EngineConfig::default()),
            Err(CliError::Skipped(1))
        ));
    }

    #[test]
    fn test_cli_parses_global_config() {
        let cli = Cli::try_parse_from(["nodegraph", "check", "a.xml", "--config", "engine.ron"]).unwrap();
        assert_eq!(cli.config.as_deref(), Some(Path::new("engine.ron")));
        assert!(matches!(cli.command, Command::Check { .. }));
    }
}
