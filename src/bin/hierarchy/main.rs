//! hierarchy CLI tool
//!
//! Diagnostic front end for hierarchy-core: loads the persisted job positions from SQLite into a
//! hierarchy graph and answers one query against it.
//!
//! ## Commands
//!
//! - `is-ancestor <ancestor> <node>`: reachability check (`00000000` is everyone's ancestor)
//! - `descendants <node>`: the node and its descendants as a JSON array
//! - `is-root <node>`: whether the node has no parent
//! - `stats`: edge count and adjacency dump
//! - `add-node <node> [--parent <parent>]`: persist a node and apply its edge
//!
//! Exit status is 2 when the startup load fails and 1 for any other error.

use clap::{Parser, Subcommand};
use hierarchy_core::{
    config::HierarchyConfig,
    db::SqliteEdgeSource,
    loader::bootstrap,
    vertex::{Edge, Vertex},
    HierarchyError,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hierarchy")]
#[command(author, version, about = "Query an organizational hierarchy graph", long_about = None)]
struct Cli {
    /// SQLite database holding the job_positions table
    #[arg(long, default_value = "hierarchy.db")]
    db: PathBuf,

    /// TOML configuration file (defaults apply when absent)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether ANCESTOR is NODE or one of its transitive parents
    IsAncestor { ancestor: Vertex, node: Vertex },

    /// Print NODE and all of its descendants as JSON
    Descendants { node: Vertex },

    /// Check whether NODE has no parent
    IsRoot { node: Vertex },

    /// Print the edge count and the adjacency structure
    Stats,

    /// Persist NODE (under PARENT, if given) and add its edge to the graph
    AddNode {
        node: Vertex,

        #[arg(long)]
        parent: Option<Vertex>,
    },
}

async fn run(cli: Cli) -> Result<(), HierarchyError> {
    let config = match &cli.config {
        Some(path) => HierarchyConfig::from_toml_file(path)?,
        None => HierarchyConfig::default(),
    };
    let source = SqliteEdgeSource::open(&cli.db).await?;
    let (tree, processor, report) = bootstrap(&config, &source).await?;
    tracing::debug!("Startup load: {:?}", report);

    match cli.command {
        Commands::IsAncestor { ancestor, node } => {
            println!("{}", tree.is_ancestor(&ancestor, &node)?);
        }
        Commands::Descendants { node } => {
            let descendants = tree
                .get_nested_childs(&node)?
                .iter()
                .map(|vertex| vertex.to_string())
                .collect::<Vec<_>>();
            println!("{}", serde_json::to_string_pretty(&descendants)?);
        }
        Commands::IsRoot { node } => {
            println!("{}", tree.is_source_vertex(&node)?);
        }
        Commands::Stats => {
            let graph = tree.graph();
            println!("vertices: {}", graph.vertex_count());
            println!("edges: {}", graph.size());
            print!("{graph}");
        }
        Commands::AddNode { node, parent } => {
            source.insert_node(&node, parent.as_ref()).await?;
            if let Some(parent) = parent {
                processor.add_edge(Edge::new(parent, node)).await?;
            }
            println!("edges: {}", tree.graph().size());
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    match runtime.block_on(run(cli)) {
        Ok(()) => Ok(()),
        Err(e @ HierarchyError::Startup(_)) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
