//! portflow CLI - run catalog functions against local files
//!
//! Lists and describes the registered functions, and runs one function over
//! files and NDJSON records, writing every output port to a directory.

use clap::{Parser, Subcommand};
use portflow::config::ConfigMap;
use portflow::dataflow::memory::{MemoryInput, MemoryOutput};
use portflow::serialization::{read_records, NdjsonWriter};
use portflow::sinks::disk::destination_path;
use portflow::{Entry, FileEntry, FunctionRegistry, DEFAULT_INPUT_PORT};
use serde::Deserialize;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "portflow")]
#[command(version, about = "Run record and file transformation functions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every registered function
    List,

    /// Print a function's spec as YAML
    Describe {
        /// Function key (e.g. parseCSV)
        key: String,
    },

    /// Run one function over local inputs
    Run {
        /// Path to a run file naming the function and its configuration
        #[arg(short, long)]
        config: PathBuf,

        /// File fed to the default input port (repeatable)
        #[arg(short, long)]
        file: Vec<PathBuf>,

        /// NDJSON file whose lines are fed to the default input port as records
        #[arg(short, long)]
        records: Option<PathBuf>,

        /// Directory receiving one NDJSON file and one folder per output port
        #[arg(short, long)]
        output: PathBuf,
    },
}

/// Contents of a run file.
#[derive(Debug, Deserialize)]
struct RunConfig {
    /// Registry key of the function to run
    function: String,
    #[serde(default)]
    config: ConfigMap,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let registry = FunctionRegistry::with_builtins();

    let result = match cli.command {
        Commands::List => list_functions(&registry),
        Commands::Describe { key } => describe_function(&registry, &key),
        Commands::Run {
            config,
            file,
            records,
            output,
        } => run_function(&registry, config, file, records, output),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn list_functions(registry: &FunctionRegistry) -> Result<(), String> {
    for spec in registry.specs() {
        println!("{:<18} {:<6} {}", spec.key, spec.category, spec.name);
    }
    Ok(())
}

fn describe_function(registry: &FunctionRegistry, key: &str) -> Result<(), String> {
    let spec = registry
        .spec_by_key(key)
        .ok_or_else(|| format!("Unknown function '{}'", key))?;
    let yaml = serde_yaml::to_string(spec).map_err(|e| format!("Failed to render spec: {}", e))?;
    print!("{}", yaml);
    Ok(())
}

fn load_run_config(path: &Path) -> Result<RunConfig, String> {
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    serde_yaml::from_str(&contents).map_err(|e| format!("Failed to parse {}: {}", path.display(), e))
}

fn run_function(
    registry: &FunctionRegistry,
    config: PathBuf,
    files: Vec<PathBuf>,
    records: Option<PathBuf>,
    output: PathBuf,
) -> Result<(), String> {
    let run = load_run_config(&config)?;
    let mut function = registry
        .new_function(&run.function)
        .ok_or_else(|| format!("Unknown function '{}'", run.function))?;

    let mut input = MemoryInput::with_entries(Vec::<Entry>::new());
    for path in &files {
        let entry = FileEntry::open(path).map_err(|e| format!("Failed to open {}: {}", path.display(), e))?;
        input.push(DEFAULT_INPUT_PORT, entry);
    }
    if let Some(path) = &records {
        let reader = File::open(path).map_err(|e| format!("Failed to open {}: {}", path.display(), e))?;
        let parsed = read_records(BufReader::new(reader))
            .map_err(|e| format!("Failed to read records from {}: {}", path.display(), e))?;
        tracing::info!("Loaded {} records from {}", parsed.len(), path.display());
        for record in parsed {
            input.push(DEFAULT_INPUT_PORT, record);
        }
    }

    let mut sink = MemoryOutput::new();
    function
        .execute(&mut input, &mut sink, &run.config)
        .map_err(|e| format!("{} failed: {}", run.function, e))?;

    write_outputs(&sink, &output)
}

fn write_outputs(sink: &MemoryOutput, dir: &Path) -> Result<(), String> {
    fs::create_dir_all(dir).map_err(|e| format!("Failed to create {}: {}", dir.display(), e))?;

    for port in sink.record_ports() {
        let path = destination_path(dir, &format!("{}.ndjson", port)).map_err(|e| e.to_string())?;
        let file = File::create(&path).map_err(|e| format!("Failed to create {}: {}", path.display(), e))?;
        let mut writer = NdjsonWriter::new(BufWriter::new(file));
        writer
            .write_all(sink.records(port))
            .and_then(|_| writer.flush())
            .map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;
        println!("{} records -> {}", writer.written(), path.display());
    }

    for port in sink.file_ports() {
        let port_dir = destination_path(dir, port).map_err(|e| e.to_string())?;
        fs::create_dir_all(&port_dir)
            .map_err(|e| format!("Failed to create {}: {}", port_dir.display(), e))?;

        for file in sink.files(port) {
            let path = destination_path(&port_dir, &file.filename).map_err(|e| e.to_string())?;
            fs::write(&path, &file.contents)
                .map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;
            println!("{} bytes -> {}", file.contents.len(), path.display());
        }
    }

    Ok(())
}
