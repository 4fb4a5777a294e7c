use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use livability_cli::{render_index, render_places_json, render_places_text, render_route, OutputFormat};
use livability_lib::{
    load_region, region_path, Coordinate, Engine, LivabilityWeights, Mode, RegionData,
    SearchAlgorithm, ZoneTable, DEFAULT_CACHE_CAPACITY, DEFAULT_TOP_N,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "City livability ranking and routing utilities")]
struct Cli {
    /// Directory holding `<region>.db` (defaults to $LIVABILITY_DATA_DIR, then /data).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Region name; the dataset file is `<region>.db`.
    #[arg(long, global = true, default_value = "cotonou")]
    region: String,

    /// Livability weights JSON replacing the built-in defaults.
    #[arg(long, global = true)]
    weights: Option<PathBuf>,

    /// Feature table CSV replacing the zone metrics stored in the dataset.
    #[arg(long, global = true)]
    features: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the livability index of every zone, best first.
    Index,
    /// Rank places against a destination and route from each.
    Places {
        /// Destination latitude.
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        /// Destination longitude.
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        /// Transportation mode: drive, walk, bike or all.
        #[arg(long, default_value = "all")]
        mode: Mode,
        /// Number of places to return.
        #[arg(long, default_value_t = DEFAULT_TOP_N)]
        top: usize,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Compute a shortest path between two coordinates.
    Route {
        #[arg(long, allow_hyphen_values = true)]
        from_lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        from_lng: f64,
        #[arg(long, allow_hyphen_values = true)]
        to_lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        to_lng: f64,
        #[arg(long, default_value = "all")]
        mode: Mode,
        /// Search algorithm: dijkstra or a-star.
        #[arg(long, default_value = "dijkstra")]
        algorithm: SearchAlgorithm,
    },
    /// Validate a livability weights JSON file.
    CheckWeights {
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match &cli.command {
        Command::Index => handle_index(&cli, &mut out),
        Command::Places {
            lat,
            lng,
            mode,
            top,
            format,
        } => handle_places(&cli, &mut out, Coordinate::new(*lat, *lng), *mode, *top, *format),
        Command::Route {
            from_lat,
            from_lng,
            to_lat,
            to_lng,
            mode,
            algorithm,
        } => handle_route(
            &cli,
            &mut out,
            Coordinate::new(*from_lat, *from_lng),
            Coordinate::new(*to_lat, *to_lng),
            *mode,
            *algorithm,
        ),
        Command::CheckWeights { file } => handle_check_weights(&mut out, file),
    }
}

fn handle_index(cli: &Cli, out: &mut impl Write) -> Result<()> {
    let engine = build_engine(cli)?;
    render_index(out, engine.livability())?;
    Ok(())
}

fn handle_places(
    cli: &Cli,
    out: &mut impl Write,
    destination: Coordinate,
    mode: Mode,
    top: usize,
    format: OutputFormat,
) -> Result<()> {
    if top == 0 {
        bail!("--top must be at least 1");
    }
    let engine = build_engine(cli)?;
    let places = engine
        .find_best_places(destination, mode, top)
        .context("failed to rank places")?;

    match format {
        OutputFormat::Text => render_places_text(out, &places)?,
        OutputFormat::Json => render_places_json(out, &places)?,
    }
    Ok(())
}

fn handle_route(
    cli: &Cli,
    out: &mut impl Write,
    origin: Coordinate,
    destination: Coordinate,
    mode: Mode,
    algorithm: SearchAlgorithm,
) -> Result<()> {
    let engine = build_engine(cli)?;
    let result = engine
        .route(origin, destination, mode, algorithm)
        .context("failed to compute route")?;
    render_route(out, &result)?;
    Ok(())
}

fn handle_check_weights(out: &mut impl Write, file: &Path) -> Result<()> {
    let weights = LivabilityWeights::from_json_path(file)
        .with_context(|| format!("invalid weights file {}", file.display()))?;
    writeln!(out, "Weights OK:")?;
    for (key, value) in weights.to_map() {
        writeln!(out, "  {key}: {value}")?;
    }
    Ok(())
}

fn build_engine(cli: &Cli) -> Result<Engine> {
    let weights = match &cli.weights {
        Some(path) => LivabilityWeights::from_json_path(path)
            .with_context(|| format!("invalid weights file {}", path.display()))?,
        None => LivabilityWeights::default(),
    };

    let path = region_path(cli.data_dir.as_deref(), &cli.region);
    debug!(path = %path.display(), "loading region");
    let RegionData { network, zones } = load_region(&path)
        .with_context(|| format!("failed to load region dataset from {}", path.display()))?;

    let zones = match &cli.features {
        Some(csv) => {
            let replacement = ZoneTable::from_csv_path(csv)
                .with_context(|| format!("failed to read feature table {}", csv.display()))?;
            zones.with_features_from(replacement)
        }
        None => zones,
    };

    Engine::from_region(RegionData { network, zones }, weights, DEFAULT_CACHE_CAPACITY)
        .context("failed to build the livability engine")
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
