use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use serde::Serialize;

use std::path::PathBuf;

use puttline::backend::{PuttBackend, SolvePuttRequest};
use puttline::common::{EpsgCode, GeographicPoint, ProjectedPoint};
use puttline::config::{Config, SolverMode};
use puttline::math::Degree;
use puttline::registry::generate::{generate_manifest, save_manifest, ManifestParams, StimpRange};
use puttline::registry::{default_manifest_path, Registry};
use puttline::solver::Solver;
use puttline::transform::{geographic_to_projected, projected_to_green_local};

#[derive(Parser)]
#[command(name = "puttline")]
#[command(about = "Putt assistance backend: course lookup, green-frame transforms, solving", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short = 'd', long = "debug", global = true)]
    debug: bool,

    /// Course data directory (holds datasets.json and manifests/)
    #[arg(long, global = true)]
    course_data: Option<PathBuf>,

    /// Which solver answers `solve`
    #[arg(long, global = true, value_enum)]
    solver: Option<SolverArg>,

    /// Base URL of the solver service (remote mode)
    #[arg(long, global = true)]
    solver_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SolverArg {
    Mock,
    Remote,
}

#[derive(Subcommand)]
enum Commands {
    /// List the greens in the datasets registry
    Courses(CoursesArgs),

    /// Show where a WGS84 position lands on a green
    Transform(TransformArgs),

    /// Solve a putt
    Solve(SolveArgs),

    /// Report backend (and solver service) health
    Health,

    /// Build a green manifest from a DTM grid file
    Manifest(ManifestArgs),
}

#[derive(Args, Debug)]
struct CoursesArgs {
    /// Output format
    #[arg(short = 'f', long, value_enum, default_value = "human")]
    format: OutputFormat,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

#[derive(Args, Debug)]
struct TransformArgs {
    #[arg(long)]
    dtm_id: String,
    #[arg(long, allow_hyphen_values = true)]
    lat: f64,
    #[arg(long, allow_hyphen_values = true)]
    lon: f64,
}

#[derive(Args, Debug)]
struct SolveArgs {
    #[arg(long)]
    course: String,
    #[arg(long)]
    hole: u32,
    /// Ball position as LAT,LON
    #[arg(long, value_parser = parse_lat_lon, allow_hyphen_values = true)]
    ball: GeographicPoint,
    /// Cup position as LAT,LON
    #[arg(long, value_parser = parse_lat_lon, allow_hyphen_values = true)]
    cup: GeographicPoint,
    /// Stimpmeter reading in feet
    #[arg(long)]
    stimp: f64,
}

#[derive(Args, Debug)]
struct ManifestArgs {
    #[arg(long)]
    dtm_id: String,
    #[arg(long)]
    course: String,
    #[arg(long)]
    hole: u32,
    /// Tab-separated elevation grid
    #[arg(long)]
    grid: PathBuf,
    /// Green origin easting in the projected CRS, meters
    #[arg(long, allow_hyphen_values = true)]
    origin_x: f64,
    /// Green origin northing in the projected CRS, meters
    #[arg(long, allow_hyphen_values = true)]
    origin_y: f64,
    /// Green frame rotation, degrees counterclockwise
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    rotation: f64,
    /// EPSG code of the projected CRS
    #[arg(long)]
    epsg: u32,
    /// Grid spacing in meters (default: from the grid's file name)
    #[arg(long)]
    spacing: Option<f64>,
    #[arg(long, default_value_t = 8.0)]
    stimp_min: f64,
    #[arg(long, default_value_t = 14.0)]
    stimp_max: f64,
    #[arg(long)]
    description: Option<String>,
    /// Save to manifests/<dtm_id>.json under the course data directory
    #[arg(short = 'w', long)]
    write: bool,
}

fn parse_lat_lon(s: &str) -> Result<GeographicPoint, String> {
    let (lat, lon) = s
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LON, got {s:?}"))?;
    let lat = lat.trim().parse().map_err(|e| format!("bad latitude: {e}"))?;
    let lon = lon.trim().parse().map_err(|e| format!("bad longitude: {e}"))?;
    Ok(GeographicPoint::new(lat, lon))
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        for cause in e.chain().skip(1) {
            eprintln!("  {cause}");
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // --debug sets the default level; RUST_LOG still wins
    let env = if cli.debug {
        Env::default().default_filter_or("debug")
    } else {
        Env::default().default_filter_or("warn")
    };
    env_logger::Builder::from_env(env).init();

    let config = load_config(&cli)?;

    match cli.command {
        Commands::Courses(args) => courses(&load_registry(&config)?, args),
        Commands::Transform(args) => transform(&load_registry(&config)?, args),
        Commands::Solve(args) => solve(&config, load_registry(&config)?, args),
        Commands::Health => health(&config, load_registry(&config)?),
        Commands::Manifest(args) => manifest(&config, args),
    }
}

fn load_registry(config: &Config) -> Result<Registry> {
    Registry::load(&config.course_data_root).with_context(|| {
        format!(
            "Failed to load course data from {}",
            config.course_data_root.display()
        )
    })
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::from_env().context("Invalid environment configuration")?;
    if let Some(root) = &cli.course_data {
        config.course_data_root = root.clone();
    }
    if let Some(solver) = cli.solver {
        config.solver = match solver {
            SolverArg::Mock => SolverMode::Mock,
            SolverArg::Remote => SolverMode::Remote,
        };
    }
    if let Some(url) = &cli.solver_url {
        config.solver_url = url.clone();
    }
    Ok(config)
}

fn backend(config: &Config, registry: Registry) -> Result<PuttBackend<Solver>> {
    let solver = config
        .solver(&registry)
        .context("Failed to set up the putt solver")?;
    Ok(PuttBackend::new(registry, solver))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn courses(registry: &Registry, args: CoursesArgs) -> Result<()> {
    match args.format {
        OutputFormat::Json => print_json(&serde_json::json!({ "datasets": registry.datasets() })),
        OutputFormat::Human => {
            for d in registry.datasets() {
                println!(
                    "{:<28} {} hole {:>2}  {}x{} @ {} m",
                    d.dtm_id, d.course_id, d.hole_id, d.grid_rows, d.grid_cols, d.grid_spacing_m
                );
            }
            Ok(())
        }
    }
}

fn transform(registry: &Registry, args: TransformArgs) -> Result<()> {
    let frame = registry
        .manifest(&args.dtm_id)
        .with_context(|| format!("Failed to load manifest for {}", args.dtm_id))?
        .frame;
    let point = GeographicPoint::new(args.lat, args.lon);

    let projected = geographic_to_projected(point, frame.epsg)
        .with_context(|| format!("Failed to project {point:?} into {}", frame.epsg))?;
    let local = projected_to_green_local(projected, frame.origin, frame.rotation);

    print_json(&serde_json::json!({
        "dtm_id": args.dtm_id,
        "epsg": frame.epsg.code(),
        "wgs84": point,
        "projected_m": projected,
        "green_local_m": local,
    }))
}

fn solve(config: &Config, registry: Registry, args: SolveArgs) -> Result<()> {
    let backend = backend(config, registry)?;
    let response = backend.solve_putt(&SolvePuttRequest {
        course_id: args.course,
        hole_id: args.hole,
        ball_wgs84: args.ball,
        cup_wgs84: args.cup,
        stimp: args.stimp,
    });
    print_json(&response)?;
    if !response.success {
        anyhow::bail!("Putt could not be solved");
    }
    Ok(())
}

fn health(config: &Config, registry: Registry) -> Result<()> {
    let backend = backend(config, registry)?;
    print_json(&backend.health())?;

    if let Solver::Remote(remote) = backend.solver() {
        let service = remote
            .health()
            .with_context(|| format!("Solver service at {} is not healthy", remote.base_url()))?;
        print_json(&service)?;
    }
    Ok(())
}

fn manifest(config: &Config, args: ManifestArgs) -> Result<()> {
    let params = ManifestParams {
        dtm_id: args.dtm_id,
        course_id: args.course,
        hole_id: args.hole,
        origin: ProjectedPoint::new(args.origin_x, args.origin_y),
        rotation: Degree::new(args.rotation),
        epsg: EpsgCode::new(args.epsg),
        stimp_range: Some(StimpRange {
            min: args.stimp_min,
            max: args.stimp_max,
        }),
        description: args.description,
        grid_spacing_m: args.spacing,
    };
    let manifest = generate_manifest(params, &args.grid)
        .with_context(|| format!("Failed to build a manifest from {}", args.grid.display()))?;
    print_json(&manifest)?;

    if args.write {
        let path = default_manifest_path(&config.course_data_root, &manifest.dtm_id);
        save_manifest(&manifest, &path)?;
        eprintln!("Saved {}", path.display());
    }
    Ok(())
}
