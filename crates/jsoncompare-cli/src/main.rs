//! Command-line interface for the `jsoncompare` engine.
//!
//! `jcmp diff` prints one line per navigable difference and exits with
//! status 1 when the documents differ. `sort`, `path` and `store` expose the
//! pane sort action, the path codec, and a file-backed comparison store.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path as FsPath, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use jsoncompare_core::path::{decode_pointer, encode_pointer};
use jsoncompare_core::{
    compare, parse_document, reduce, sort_value, Algorithm, ComparisonStore, Difference, EngineConfig, Format,
    HashCache, MemoryEditor, MemoryStore, Path, PathSegment, Session, SortOptions, UniqueDiffs,
};
use serde_json::Value;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "jcmp", version, about = "Compare JSON and YAML documents structurally.")]
struct Cli {
    /// Log debug events to STDERR.
    #[arg(short = 'v', long = "verbose", action = ArgAction::SetTrue, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compare two documents.
    Diff(DiffArgs),
    /// Print a document with keys (and optionally array elements) sorted.
    Sort(SortArgs),
    /// Convert between path notations.
    #[command(subcommand)]
    Path(PathCommand),
    /// Manage saved comparisons in a JSON file.
    Store(StoreArgs),
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
enum AlgorithmArg {
    #[default]
    Structural,
    Flat,
}

impl From<AlgorithmArg> for Algorithm {
    fn from(value: AlgorithmArg) -> Self {
        match value {
            AlgorithmArg::Structural => Self::Structural,
            AlgorithmArg::Flat => Self::Flat,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    /// One `~`/`-`/`+` line per navigable difference.
    #[default]
    Text,
    /// The full left/right difference as JSON.
    Json,
    /// The navigable entries as JSON.
    Unique,
}

#[derive(Debug, Args)]
struct DiffArgs {
    /// Left-hand document.
    left: PathBuf,

    /// Right-hand document; read from STDIN when omitted.
    right: Option<PathBuf>,

    /// Diff algorithm.
    #[arg(short = 'a', long = "algorithm", value_enum, default_value_t)]
    algorithm: AlgorithmArg,

    /// Output format.
    #[arg(short = 'f', long = "format", value_enum, default_value_t)]
    format: OutputFormat,

    /// Read inputs as YAML instead of JSON.
    #[arg(long = "yaml", action = ArgAction::SetTrue)]
    yaml: bool,

    /// Sort both documents before comparing.
    #[arg(long = "sort", action = ArgAction::SetTrue)]
    sort: bool,

    /// Write output to FILE instead of STDOUT.
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct SortArgs {
    /// Document to sort; read from STDIN when omitted.
    input: Option<PathBuf>,

    /// Leave array element order untouched.
    #[arg(long = "no-arrays", action = ArgAction::SetTrue)]
    no_arrays: bool,

    /// Read input as YAML instead of JSON.
    #[arg(long = "yaml", action = ArgAction::SetTrue)]
    yaml: bool,

    /// Write output to FILE instead of STDOUT.
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum PathCommand {
    /// Print the segments of a path as a JSON array.
    Decode {
        /// Path in dot/bracket notation, or pointer notation with `--pointer`.
        path: String,
        /// Parse the `%2F`-joined pointer dialect.
        #[arg(long = "pointer", action = ArgAction::SetTrue)]
        pointer: bool,
    },
    /// Build a path from editor segments; all-digit segments are indices.
    Encode {
        /// Path segments, outermost first.
        segments: Vec<String>,
        /// Emit the `%2F`-joined pointer dialect.
        #[arg(long = "pointer", action = ArgAction::SetTrue)]
        pointer: bool,
    },
}

#[derive(Debug, Args)]
struct StoreArgs {
    /// Store file; created on first save.
    #[arg(short = 's', long = "file", default_value = "comparisons.json")]
    file: PathBuf,

    #[command(subcommand)]
    action: StoreAction,
}

#[derive(Debug, Subcommand)]
enum StoreAction {
    /// List saved comparisons.
    List,
    /// Print a saved comparison as JSON.
    Show { id: u64 },
    /// Save two documents as a comparison.
    Save {
        left: PathBuf,
        right: PathBuf,
        #[arg(long = "left-title", default_value = "Sample 1")]
        left_title: String,
        #[arg(long = "right-title", default_value = "Sample 2")]
        right_title: String,
        /// Overwrite an existing comparison instead of adding one.
        #[arg(long = "id")]
        id: Option<u64>,
    },
    /// Diff a saved comparison.
    Compare { id: u64 },
    /// Remove a saved comparison.
    Delete { id: u64 },
}

fn main() {
    match try_main() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            let _ = writeln!(io::stderr(), "{err:#}");
            std::process::exit(1);
        }
    }
}

fn try_main() -> Result<i32> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Diff(args) => run_diff(&args),
        Command::Sort(args) => run_sort(&args),
        Command::Path(command) => run_path(command),
        Command::Store(args) => run_store(args),
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("JCMP_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn run_diff(args: &DiffArgs) -> Result<i32> {
    let format = if args.yaml { Format::Yaml } else { Format::Json };
    let mut lhs = read_document(Some(args.left.as_path()), format).context("failed to parse left input")?;
    let mut rhs = read_document(args.right.as_deref(), format).context("failed to parse right input")?;
    if args.sort {
        lhs = sort_value(&lhs, SortOptions::default());
        rhs = sort_value(&rhs, SortOptions::default());
    }

    let cache = HashCache::default();
    let algorithm = Algorithm::from(args.algorithm);
    debug!(%algorithm, "comparing documents");
    let diff = compare(&lhs, &rhs, algorithm, &cache)?
        .ok_or_else(|| anyhow!("both inputs must be objects or both must be arrays"))?;
    let unique = reduce(&diff);

    let rendered = render_diff(&diff, &unique, args.format)?;
    write_output(args.output.as_deref(), &rendered)?;
    Ok(i32::from(!diff.is_empty()))
}

fn render_diff(diff: &Difference, unique: &UniqueDiffs, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(unique)),
        OutputFormat::Json => {
            let mut rendered = serde_json::to_string_pretty(diff).context("failed to serialize difference")?;
            rendered.push('\n');
            Ok(rendered)
        }
        OutputFormat::Unique => {
            let mut rendered =
                serde_json::to_string_pretty(unique.entries()).context("failed to serialize differences")?;
            rendered.push('\n');
            Ok(rendered)
        }
    }
}

fn render_text(unique: &UniqueDiffs) -> String {
    let mut out = String::new();
    for entry in unique.entries() {
        let line = match (&entry.path_left, &entry.path_right) {
            (Some(path), Some(_)) => format!("~ {path}\n"),
            (Some(path), None) => format!("- {path}\n"),
            (None, Some(path)) => format!("+ {path}\n"),
            (None, None) => continue,
        };
        out.push_str(&line);
    }
    out
}

fn run_sort(args: &SortArgs) -> Result<i32> {
    let format = if args.yaml { Format::Yaml } else { Format::Json };
    let value = read_document(args.input.as_deref(), format).context("failed to parse input")?;
    let sorted = sort_value(&value, SortOptions::default().with_arrays(!args.no_arrays));
    let mut rendered = serde_json::to_string_pretty(&sorted).context("failed to serialize sorted document")?;
    rendered.push('\n');
    write_output(args.output.as_deref(), &rendered)?;
    Ok(0)
}

fn run_path(command: PathCommand) -> Result<i32> {
    match command {
        PathCommand::Decode { path, pointer } => {
            let decoded = if pointer { decode_pointer(&path) } else { Path::decode(&path) };
            let segments: Vec<Value> = decoded
                .into_iter()
                .map(|segment| match segment {
                    PathSegment::Key(key) => Value::String(key),
                    PathSegment::Index(index) => Value::from(index),
                })
                .collect();
            println!("{}", Value::Array(segments));
        }
        PathCommand::Encode { segments, pointer } => {
            let path = Path::from_editor_segments(&segments);
            if pointer {
                println!("{}", encode_pointer(&path));
            } else {
                println!("{path}");
            }
        }
    }
    Ok(0)
}

fn run_store(args: StoreArgs) -> Result<i32> {
    let mut store = load_store(&args.file)?;
    match args.action {
        StoreAction::List => {
            for (id, record) in store.list()? {
                println!("{id}\t{}", record.title);
            }
        }
        StoreAction::Show { id } => {
            let record = store.get(id)?;
            println!("{}", serde_json::to_string_pretty(&record).context("failed to serialize comparison")?);
        }
        StoreAction::Save { left, right, left_title, right_title, id } => {
            let left = MemoryEditor::with_json(read_document(Some(left.as_path()), Format::Json)?);
            let right = MemoryEditor::with_json(read_document(Some(right.as_path()), Format::Json)?);
            let mut session = Session::default();
            session.set_titles(left_title, right_title);
            session.assign_id(id);
            let id = session.save(&mut store, &left, &right)?;
            save_store(&args.file, &store)?;
            println!("{id}");
        }
        StoreAction::Compare { id } => {
            let config = EngineConfig::default().with_debounce(Duration::ZERO)?;
            let mut session = Session::new(config);
            let mut left = MemoryEditor::default();
            let mut right = MemoryEditor::default();
            session.load(&store, id, &mut left, &mut right)?;
            let Some(diff) = session.settle() else {
                bail!("comparison {id} has no comparable documents");
            };
            let have_diff = !diff.is_empty();
            print!("{}", render_text(session.unique_diffs()));
            return Ok(i32::from(have_diff));
        }
        StoreAction::Delete { id } => {
            store.delete(id)?;
            save_store(&args.file, &store)?;
        }
    }
    Ok(0)
}

fn load_store(path: &FsPath) -> Result<MemoryStore> {
    if !path.exists() {
        return Ok(MemoryStore::default());
    }
    let data = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("failed to parse store {}", path.display()))
}

fn save_store(path: &FsPath, store: &MemoryStore) -> Result<()> {
    let data = serde_json::to_string_pretty(store).context("failed to serialize store")?;
    fs::write(path, data).with_context(|| format!("failed to write {}", path.display()))
}

fn read_document(path: Option<&FsPath>, format: Format) -> Result<Value> {
    let text = match path {
        Some(path) => fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer).context("failed to read STDIN")?;
            buffer
        }
    };
    match parse_document(&text, format)? {
        Some(value) => Ok(value),
        None => bail!("input is empty"),
    }
}

fn write_output(path: Option<&FsPath>, rendered: &str) -> Result<()> {
    if let Some(path) = path {
        fs::write(path, rendered.as_bytes()).with_context(|| format!("failed to write output to {}", path.display()))?;
    } else {
        print!("{rendered}");
        io::stdout().flush().ok();
    }
    Ok(())
}
