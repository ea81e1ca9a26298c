//! Command line front end: host a partial graph, inspect a data directory or
//! generate a random graph.
#![forbid(unsafe_code)]

use std::error::Error;
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use shardgraph::db::{Connector, TcpConnector, COMPLETE_GRAPH_HOST};
use shardgraph::storage::{AggregationKind, AttributeDef, Direction};
use shardgraph::{
    init_logging, AttrKind, AttrValue, Config, ElementSpec, GraphDatabase, Schema, TypeId,
};
use tracing::warn;

#[derive(Parser, Debug)]
#[command(
    name = "shardgraph",
    version,
    about = "Partitioned graph storage engine",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        env = "SHARDGRAPH_LOG",
        default_value = "warn",
        help = "Log filter directive"
    )]
    log_level: String,

    #[arg(
        long,
        global = true,
        value_name = "FILE",
        help = "Host configuration (TOML); defaults to the user config dir"
    )]
    config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format for reports"
    )]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Args, Debug)]
struct SchemaArg {
    #[arg(
        long,
        value_name = "FILE",
        help = "Schema file (TOML or JSON); the built-in sample schema when absent"
    )]
    schema: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Host a partial graph over TCP.
    Serve {
        #[arg(long, value_name = "ADDR", help = "Address to listen on")]
        listen: String,

        #[arg(long, value_name = "DIR", help = "Data directory")]
        data_dir: Option<PathBuf>,

        #[arg(
            long,
            value_name = "ADDR",
            help = "Join the complete graph hosted at ADDR instead of creating one"
        )]
        join: Option<String>,

        #[arg(
            long,
            value_name = "SECS",
            default_value_t = 5,
            help = "Seconds between background flushes (0 disables them)"
        )]
        flush_interval: u64,

        #[command(flatten)]
        schema: SchemaArg,
    },
    /// Report the contents of a flushed data directory.
    Inspect {
        #[arg(value_name = "DIR")]
        data_dir: PathBuf,

        #[command(flatten)]
        schema: SchemaArg,
    },
    /// Build a random graph in a new data directory.
    Generate {
        #[arg(value_name = "DIR")]
        data_dir: PathBuf,

        #[arg(long, default_value_t = 100, help = "Vertices to create")]
        vertices: u32,

        #[arg(long, default_value_t = 200, help = "Edges to create")]
        edges: u32,

        #[arg(long, default_value_t = 42, help = "Random seed")]
        seed: u64,

        #[command(flatten)]
        schema: SchemaArg,
    },
}

const NODE: TypeId = TypeId(2);
const LINK: TypeId = TypeId(3);
const SOURCE: TypeId = TypeId(4);
const TARGET: TypeId = TypeId(5);

fn sample_schema() -> Schema {
    Schema::new("sample")
        .vertex_type(
            NODE.0,
            "Node",
            vec![
                AttributeDef::new("name", AttrKind::String),
                AttributeDef::new("weight", AttrKind::Long),
            ],
        )
        .edge_type(LINK.0, "Link", vec![AttributeDef::new("cost", AttrKind::Double)])
        .incidence_type(SOURCE.0, "source", Direction::Out, AggregationKind::None)
        .incidence_type(TARGET.0, "target", Direction::In, AggregationKind::None)
}

fn load_schema(arg: &SchemaArg) -> shardgraph::Result<Schema> {
    match &arg.schema {
        Some(path) => Schema::load(path),
        None => Ok(sample_schema()),
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("shardgraph").join("config.toml"))
}

fn load_config(explicit: Option<&Path>) -> shardgraph::Result<Config> {
    match explicit {
        Some(path) => Config::load(path),
        None => match default_config_path() {
            Some(path) if path.exists() => Config::load(path),
            _ => Ok(Config::default()),
        },
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Serve {
            listen,
            data_dir,
            join,
            flush_interval,
            schema,
        } => serve(
            config,
            load_schema(&schema)?,
            listen,
            data_dir,
            join,
            flush_interval,
        ),
        Command::Inspect { data_dir, schema } => {
            let report = inspect(config.with_data_dir(data_dir), load_schema(&schema)?)?;
            emit(cli.format, &report, print_inspect_text)
        }
        Command::Generate {
            data_dir,
            vertices,
            edges,
            seed,
            schema,
        } => {
            let schema_given = schema.schema.is_some();
            let report = generate(
                config.with_data_dir(data_dir),
                load_schema(&schema)?,
                schema_given,
                vertices,
                edges,
                seed,
            )?;
            emit(cli.format, &report, print_generate_text)
        }
    }
}

fn emit<T: Serialize>(
    format: OutputFormat,
    report: &T,
    text: impl FnOnce(&T),
) -> Result<(), Box<dyn Error>> {
    match format {
        OutputFormat::Text => text(report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
    }
    Ok(())
}

fn print_field(name: &str, value: impl std::fmt::Display) {
    println!("  {name:.<30} {value}");
}

fn serve(
    config: Config,
    schema: Schema,
    listen: String,
    data_dir: Option<PathBuf>,
    join: Option<String>,
    flush_interval: u64,
) -> Result<(), Box<dyn Error>> {
    let mut config = config.with_listen_address(listen.clone());
    if let Some(dir) = data_dir {
        config = config.with_data_dir(dir);
    }
    let listener = TcpListener::bind(&listen)?;
    let connector: Arc<dyn Connector> = Arc::new(TcpConnector);
    let has_graph = config
        .data_dir
        .as_ref()
        .map(|dir| dir.join("graph.json").exists())
        .unwrap_or(false);
    let db = match (join, has_graph) {
        (join, true) => GraphDatabase::open_with(config, schema, Some(connector), join),
        (Some(address), false) => GraphDatabase::join(config, schema, connector, &address),
        (None, false) => GraphDatabase::create_complete_with(config, schema, Some(connector)),
    }?;
    eprintln!(
        "serving partial graph {} on {listen}",
        db.partial_graph_id()
    );
    if flush_interval > 0 {
        let flusher = db.clone();
        thread::spawn(move || loop {
            thread::sleep(Duration::from_secs(flush_interval));
            if let Err(err) = flusher.flush() {
                warn!(error = %err, "cli.flush.failed");
            }
        });
    }
    db.server().serve(listener)?;
    db.shutdown()?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct InspectReport {
    partial_graph: u32,
    schema: String,
    vertices: u64,
    edges: u64,
    incidences: u64,
    resident_vertices: usize,
    resident_edges: usize,
    resident_incidences: usize,
    vertex_list_version: Option<i64>,
    registered_partial_graphs: Vec<u32>,
}

fn inspect(config: Config, schema: Schema) -> shardgraph::Result<InspectReport> {
    let db = GraphDatabase::open(config, schema)?;
    let own = db.partial_graph(db.partial_graph_id())?;
    let resident = db.resident_counts();
    let hosts_complete = db.partial_graph_id() == COMPLETE_GRAPH_HOST;
    let (vertex_list_version, registered) = if hosts_complete {
        (
            Some(db.vertex_list_version()?),
            db.partial_graphs()?.into_iter().map(|pg| pg.0).collect(),
        )
    } else {
        (None, Vec::new())
    };
    Ok(InspectReport {
        partial_graph: db.partial_graph_id().0,
        schema: db.schema().name.clone(),
        vertices: own.vertex_count,
        edges: own.edge_count,
        incidences: own.incidence_count,
        resident_vertices: resident.vertices,
        resident_edges: resident.edges,
        resident_incidences: resident.incidences,
        vertex_list_version,
        registered_partial_graphs: registered,
    })
}

fn print_inspect_text(report: &InspectReport) {
    println!("partial graph {} ({})", report.partial_graph, report.schema);
    print_field("vertices", report.vertices);
    print_field("edges", report.edges);
    print_field("incidences", report.incidences);
    print_field("resident vertices", report.resident_vertices);
    print_field("resident edges", report.resident_edges);
    print_field("resident incidences", report.resident_incidences);
    if let Some(version) = report.vertex_list_version {
        print_field("vertex list version", version);
    }
    if !report.registered_partial_graphs.is_empty() {
        let ids: Vec<String> = report
            .registered_partial_graphs
            .iter()
            .map(u32::to_string)
            .collect();
        print_field("partial graphs", ids.join(","));
    }
}

#[derive(Debug, Serialize)]
struct GenerateReport {
    vertices: u64,
    edges: u64,
    incidences: u64,
    records_written: usize,
}

fn generate(
    config: Config,
    schema: Schema,
    custom_schema: bool,
    vertices: u32,
    edges: u32,
    seed: u64,
) -> shardgraph::Result<GenerateReport> {
    if custom_schema && (schema.vertex_types.is_empty() || schema.edge_types.is_empty()) {
        return Err(shardgraph::GraphError::Config(
            "schema needs at least one vertex and one edge type".into(),
        ));
    }
    let vertex_type = TypeId(schema.vertex_types.first().map(|t| t.id).unwrap_or(NODE.0));
    let edge_type = TypeId(schema.edge_types.first().map(|t| t.id).unwrap_or(LINK.0));
    let incidence_types: Vec<TypeId> = schema.incidence_types.iter().map(|t| TypeId(t.id)).collect();
    let db = GraphDatabase::create_complete(config, schema)?;
    let mut rng = StdRng::seed_from_u64(seed);

    let mut created = Vec::with_capacity(vertices as usize);
    for n in 0..vertices {
        let vertex = db.create_vertex(ElementSpec::new(vertex_type))?;
        if !custom_schema {
            db.set_vertex_attribute(vertex, "name", AttrValue::Str(format!("node-{n}")))?;
            db.set_vertex_attribute(vertex, "weight", AttrValue::Long(rng.gen_range(0..1_000)))?;
        }
        created.push(vertex);
    }
    if !created.is_empty() && incidence_types.len() >= 2 {
        for _ in 0..edges {
            let edge = db.create_edge(ElementSpec::new(edge_type))?;
            if !custom_schema {
                db.set_edge_attribute(edge, "cost", AttrValue::Double(rng.gen::<f64>()))?;
            }
            let from = created[rng.gen_range(0..created.len())];
            let to = created[rng.gen_range(0..created.len())];
            db.connect(incidence_types[0], from, edge)?;
            db.connect(incidence_types[1], to, edge)?;
        }
    }

    let stats = db.flush()?;
    let report = GenerateReport {
        vertices: db.vertex_count()?,
        edges: db.edge_count()?,
        incidences: db.incidence_count()?,
        records_written: stats.records,
    };
    db.shutdown()?;
    Ok(report)
}

fn print_generate_text(report: &GenerateReport) {
    println!("generated graph");
    print_field("vertices", report.vertices);
    print_field("edges", report.edges);
    print_field("incidences", report.incidences);
    print_field("records written", report.records_written);
}
