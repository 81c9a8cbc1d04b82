use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;

use trinkbrunnen::api::{self, overpass, wfs};
use trinkbrunnen::bwb::{keys as bwb_keys, load_bwb_file};
use trinkbrunnen::config::FileConfig;
use trinkbrunnen::domain::Dataset;
use trinkbrunnen::logging::init_logger;
use trinkbrunnen::matching::ProximityMatcher;
use trinkbrunnen::osm::parse_drinking_water;
use trinkbrunnen::osm::parser::keys as osm_keys;
use trinkbrunnen::render::{LeafletMap, maps};
use trinkbrunnen::report::{ComparisonReport, DatasetSummary};

/// Compare Berlin drinking fountains ("Trinkbrunnen") from the official
/// Berliner Wasserbetriebe WFS with OpenStreetMap
///
/// Examples:
///   # Download the official dataset
///   trinkbrunnen fetch-wfs
///
///   # Map all official fountains by type
///   trinkbrunnen map
///
///   # Match OSM against BWB within 30m and print a coverage report
///   trinkbrunnen compare --max-distance 30
///
///   # Reuse a saved Overpass response instead of querying the API
///   trinkbrunnen compare --osm-file osm_drinking_water.json
#[derive(Parser, Debug)]
#[command(name = "trinkbrunnen")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to config file (optional, auto-searches trinkbrunnen.toml if not provided)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// BWB data file (defaults to data/berlin_trinkbrunnen_wfs.json)
    #[arg(long, global = true)]
    data_file: Option<PathBuf>,

    /// Directory for generated HTML maps
    #[arg(short = 'o', long, global = true)]
    output_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download the BWB fountain layer from the WFS and save it as GeoJSON
    FetchWfs,
    /// Map all BWB fountains coloured by type and print type statistics
    Map,
    /// Map BWB and OSM fountains side by side without matching
    Simple {
        /// Saved Overpass JSON response to use instead of querying the API
        #[arg(long)]
        osm_file: Option<PathBuf>,
    },
    /// Match OSM against BWB, write the comparison map and print a report
    Compare {
        /// Maximum distance in meters for two fountains to be the same
        #[arg(short = 'd', long)]
        max_distance: Option<f64>,

        /// Saved Overpass JSON response to use instead of querying the API
        #[arg(long)]
        osm_file: Option<PathBuf>,

        /// Also write the match result (pairs and unmatched indices) as JSON
        #[arg(long)]
        matches_json: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    let total_start = Instant::now();

    let (mut config, config_warnings) = match args.config {
        Some(ref path) => (FileConfig::from_path(path)?, Vec::new()),
        None => {
            let (config, warnings) = FileConfig::load();
            (config.unwrap_or_default(), warnings)
        }
    };
    if let Some(ref data_file) = args.data_file {
        config.data_file = data_file.clone();
    }
    if let Some(ref output_dir) = args.output_dir {
        config.output_dir = output_dir.clone();
    }
    config.verbose |= args.verbose;

    init_logger(config.verbose);
    for warning in &config_warnings {
        log::warn!("{}", warning);
    }

    if config.verbose {
        println!("Configuration:");
        println!("  Place: {}", config.place);
        println!("  Data file: {}", config.data_file.display());
        println!("  Output dir: {}", config.output_dir.display());
        println!("  Max match distance: {}m", config.max_distance_m);
        println!("  Overpass mirrors: {}", config.overpass.urls.len());
        println!();
    }

    match args.command {
        Command::FetchWfs => run_fetch_wfs(&config)?,
        Command::Map => run_type_map(&config)?,
        Command::Simple { osm_file } => run_simple(&config, osm_file.as_deref())?,
        Command::Compare {
            max_distance,
            osm_file,
            matches_json,
        } => {
            if let Some(d) = max_distance {
                config.max_distance_m = d;
            }
            run_compare(&config, osm_file.as_deref(), matches_json.as_deref())?
        }
    }

    println!();
    println!(
        "Done! Total time: {:.1}s",
        total_start.elapsed().as_secs_f32()
    );

    Ok(())
}

fn run_fetch_wfs(config: &FileConfig) -> Result<()> {
    println!("Fetching Trinkbrunnen from WFS (Web Feature Service)...");
    println!("{}", "=".repeat(60));

    let spinner = create_spinner(&format!("Requesting {}...", config.wfs.url));
    let start = Instant::now();
    let data = clear_on_error(&spinner, wfs::fetch_feature_collection(&config.wfs))
        .context("Failed to fetch data from WFS. The service might be unavailable")?;
    let count = wfs::feature_count(&data);
    spinner.finish_with_message(format!(
        "Fetched {} Trinkbrunnen [{:.1}s]",
        count,
        start.elapsed().as_secs_f32()
    ));

    wfs::save_feature_collection(&config.data_file, &data)?;
    println!("Data saved to {}", config.data_file.display());

    if let Some((keys, geometry_type)) = wfs::describe_first_feature(&data) {
        println!();
        println!("Available properties: {}", keys.join(", "));
        println!("Geometry type: {}", geometry_type);
    }

    println!();
    println!("Total number of Trinkbrunnen in Berlin (from WFS): {}", count);
    Ok(())
}

fn run_type_map(config: &FileConfig) -> Result<()> {
    let bwb = load_bwb(&config.data_file)?;

    let spinner = create_spinner("Building fountain type map...");
    let map = clear_on_error(&spinner, maps::type_map(&bwb))?;
    let path = clear_on_error(
        &spinner,
        write_map(&map, &config.output_dir, maps::TYPE_MAP_FILE),
    )?;
    spinner.finish_with_message(format!(
        "Map saved as {} ({} fountains)",
        path.display(),
        map.marker_count()
    ));

    println!();
    print!("{}", DatasetSummary::by_attribute(&bwb, bwb_keys::TYPE));
    Ok(())
}

fn run_simple(config: &FileConfig, osm_file: Option<&Path>) -> Result<()> {
    let bwb = load_bwb(&config.data_file)?;
    let osm = load_osm(config, osm_file)?;

    let map = maps::simple_map(&bwb, &osm)?;
    let path = write_map(&map, &config.output_dir, maps::SIMPLE_MAP_FILE)?;

    println!("Simple comparison map saved: {}", path.display());
    println!("BWB (red): {} fountains", bwb.len());
    println!("OSM (blue): {} fountains", osm.len());
    Ok(())
}

fn run_compare(
    config: &FileConfig,
    osm_file: Option<&Path>,
    matches_json: Option<&Path>,
) -> Result<()> {
    println!("Comparing OSM and BWB Trinkbrunnen data for Berlin...");
    println!("{}", "=".repeat(60));

    let bwb = load_bwb(&config.data_file)?;
    let osm = load_osm(config, osm_file)?;
    if osm.is_empty() {
        bail!("No OSM data found. Cannot perform comparison.");
    }

    let spinner = create_spinner(&format!(
        "Finding matches within {}m...",
        config.max_distance_m
    ));
    let start = Instant::now();
    let matcher = clear_on_error(&spinner, ProximityMatcher::new(config.max_distance_m))?
        .with_copied_attrs(
        &[osm_keys::OPERATOR],
        &[bwb_keys::TYPE],
    );
    // OSM is the reference side; each BWB fountain is claimed at most once
    let outcome = matcher.run(&osm, &bwb);
    spinner.finish_with_message(format!(
        "Found {} matches, {} OSM unmatched, {} BWB unmatched [{:.1}s]",
        outcome.matches.len(),
        outcome.unmatched_reference.len(),
        outcome.unmatched_candidates.len(),
        start.elapsed().as_secs_f32()
    ));

    if let Some(path) = matches_json {
        let json = serde_json::to_string_pretty(&outcome).context("Failed to serialize matches")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Match result saved as: {}", path.display());
    }

    let report = ComparisonReport::build(&osm, &bwb, &outcome, config.close_match_m);

    let map = maps::comparison_map(&osm, &bwb, &outcome, &report, config.close_match_m)?;
    let path = write_map(&map, &config.output_dir, maps::COMPARISON_MAP_FILE)?;
    println!("Comparison map saved as: {}", path.display());

    println!();
    print!("{}", report);
    println!();
    println!("Analysis complete! View the interactive map: {}", path.display());
    Ok(())
}

fn load_bwb(path: &Path) -> Result<Dataset> {
    let spinner = create_spinner("Loading official BWB Trinkbrunnen data...");
    let bwb = clear_on_error(&spinner, load_bwb_file(path)).with_context(|| {
        format!(
            "Failed to load {}. Run `trinkbrunnen fetch-wfs` first to download the BWB data",
            path.display()
        )
    })?;
    spinner.finish_with_message(format!("Loaded {} BWB Trinkbrunnen", bwb.len()));
    Ok(bwb)
}

fn load_osm(config: &FileConfig, osm_file: Option<&Path>) -> Result<Dataset> {
    let response = match osm_file {
        Some(path) => overpass::load_response(path)?,
        None => {
            let spinner = create_spinner(&format!("Geocoding {}...", config.place));
            let start = Instant::now();
            let place = clear_on_error(&spinner, api::geocode_place(&config.place))
                .context("Failed to geocode place")?;
            let area_id = clear_on_error(
                &spinner,
                place
                    .area_id()
                    .with_context(|| format!("{} has no usable boundary", place.display_name)),
            )?;
            spinner.finish_with_message(format!(
                "Geocoded: {} -> area {} [{:.1}s]",
                place.display_name,
                area_id,
                start.elapsed().as_secs_f32()
            ));

            let spinner = create_spinner("Fetching drinking fountains from OpenStreetMap...");
            let start = Instant::now();
            let response = clear_on_error(
                &spinner,
                api::fetch_drinking_water(area_id, &config.overpass),
            )
            .context("Failed to fetch drinking water from Overpass API")?;
            spinner.finish_with_message(format!(
                "Fetched {} drinking water elements [{:.1}s]",
                response.elements.len(),
                start.elapsed().as_secs_f32()
            ));
            response
        }
    };

    let osm = parse_drinking_water(&response);
    log::info!("Converted to {} point features", osm.len());
    Ok(osm)
}

fn write_map(map: &LeafletMap, output_dir: &Path, file_name: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;
    let path = output_dir.join(file_name);
    map.write(&path)?;
    log::info!(
        "Wrote {} with {} markers",
        path.display(),
        map.marker_count()
    );
    Ok(path)
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}

/// Remove the spinner line before an error propagates
fn clear_on_error<T, E>(spinner: &ProgressBar, result: Result<T, E>) -> Result<T, E> {
    if result.is_err() {
        spinner.finish_and_clear();
    }
    result
}
