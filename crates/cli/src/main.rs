//! STPGIS CLI - multi-criteria suitability and priority mapping

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use stpgis_algorithms::align::GridAligner;
use stpgis_algorithms::classify::{reclassify, write_zone_csv, zone_class_statistics, ClassBreaks, CLASS_LABELS};
use stpgis_algorithms::clip::{ClipTarget, Place};
use stpgis_algorithms::interpolation::{
    interpolate, interpolate_with_fallback, samples_from_features, InterpolationGrid,
    InterpolationSummary, Method, GRID_SIZE,
};
use stpgis_colormap::{style_for_raster, write_sld, ColorRamp};
use stpgis_core::io::{read_geojson, read_geotiff, unique_output_path, write_geotiff, GeoTiffOptions};
use stpgis_core::{Raster, CRS};
use stpgis_parallel::ProcessingMode;
use stpgis_pipeline::{
    catchment_villages, DirectoryPublisher, EngineConfig, PriorityMapper, PriorityRequest,
    SuitabilityMapper, SuitabilityRequest, WeightedLayer,
};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "stpgis")]
#[command(author, version, about = "Multi-criteria raster suitability and priority mapping", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Engine configuration (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the output directory
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Override the target resolution: "30" or "30,30"
    #[arg(long, global = true)]
    resolution: Option<String>,

    /// Override the working CRS (EPSG code)
    #[arg(long, global = true)]
    crs: Option<u32>,

    /// Worker threads for per-layer work (1 = sequential)
    #[arg(long, global = true)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// Reproject and resample rasters onto one common grid
    Align {
        /// Input rasters
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Directory for the aligned rasters (default: output directory)
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Build, clip and publish a priority map with zone statistics
    Priority {
        /// Criterion layer as PATH=WEIGHT (repeatable)
        #[arg(short, long = "layer", required = true)]
        layers: Vec<String>,
        /// Constraint raster (repeatable)
        #[arg(long = "constraint")]
        constraints: Vec<PathBuf>,
        /// Unit kind of --clip: village or subdistrict
        #[arg(long, default_value = "subdistrict")]
        place: String,
        /// Comma-separated unit ids
        #[arg(long)]
        clip: Option<String>,
        /// Where published layers go (default: <output>/published)
        #[arg(long)]
        publish_dir: Option<PathBuf>,
    },
    /// Build, clip and publish a suitability map
    Suitability {
        /// Condition layer as PATH=WEIGHT (repeatable)
        #[arg(short, long = "layer", required = true)]
        layers: Vec<String>,
        /// Constraint raster (repeatable)
        #[arg(long = "constraint")]
        constraints: Vec<PathBuf>,
        #[arg(long, default_value = "subdistrict")]
        place: String,
        #[arg(long)]
        clip: Option<String>,
        /// Reverse the colour ramp
        #[arg(long)]
        reverse: bool,
        #[arg(long)]
        publish_dir: Option<PathBuf>,
    },
    /// Clip a raster to the basin, a unit selection or a town buffer
    Clip {
        /// Input raster
        input: PathBuf,
        /// Comma-separated town ids (buffer clip)
        #[arg(long, conflicts_with_all = ["clip", "basin"])]
        town: Option<String>,
        /// Comma-separated unit ids
        #[arg(long, conflicts_with = "basin")]
        clip: Option<String>,
        #[arg(long, default_value = "subdistrict")]
        place: String,
        /// Clip to the configured basin
        #[arg(long)]
        basin: bool,
    },
    /// Five-class breakdown of a raster per selected unit
    Classify {
        /// Input raster
        input: PathBuf,
        /// Comma-separated unit ids
        #[arg(long, required = true)]
        clip: String,
        #[arg(long, default_value = "subdistrict")]
        place: String,
        /// CSV output (default: unique name in the output directory)
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Generate a class-break style for a raster
    Style {
        /// Input raster
        input: PathBuf,
        /// Ramp: blue-to-red, orange-to-green, green-to-red, viridis, terrain, spectral
        #[arg(short, long)]
        ramp: Option<String>,
        #[arg(long)]
        reverse: bool,
        /// Number of classes (default from configuration)
        #[arg(short = 'n', long)]
        classes: Option<usize>,
        /// SLD output file (default: unique name in the output directory)
        #[arg(long)]
        sld: Option<PathBuf>,
        /// Print the style as JSON
        #[arg(long)]
        json: bool,
    },
    /// Interpolate point samples into a criterion raster
    Interpolate {
        /// Input GeoJSON with point (or polygon) features
        input: PathBuf,
        /// Output raster
        output: PathBuf,
        /// Numeric attribute to interpolate
        #[arg(short, long)]
        attribute: String,
        /// idw, kriging, spline, or auto (kriging with IDW fallback)
        #[arg(short, long, default_value = "auto")]
        method: String,
        /// Grid cells per side
        #[arg(long, default_value_t = GRID_SIZE)]
        size: usize,
    },
    /// List villages intersecting the catchments of the given drains
    Catchment {
        /// Comma-separated drain numbers
        #[arg(long, required = true)]
        drain: String,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn load_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(dir) = &cli.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(res) = &cli.resolution {
        config.target_resolution = parse_resolution(res)?;
    }
    if let Some(epsg) = cli.crs {
        config.working_crs = epsg;
    }
    match cli.threads {
        Some(0) => anyhow::bail!("--threads must be at least 1"),
        Some(1) => config.processing = ProcessingMode::Sequential,
        Some(n) => config.processing = ProcessingMode::ParallelWith(n),
        None => {}
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn read_raster(path: &Path) -> Result<Raster<f64>> {
    let pb = spinner("Reading raster...");
    let raster: Raster<f64> = read_geotiff(path, None)
        .with_context(|| format!("Failed to read raster {}", path.display()))?;
    pb.finish_and_clear();
    info!("Input: {} x {}", raster.cols(), raster.rows());
    Ok(raster)
}

fn write_result(raster: &Raster<f64>, path: &Path) -> Result<()> {
    let pb = spinner("Writing output...");
    write_geotiff(raster, path, Some(GeoTiffOptions::default()))
        .context("Failed to write output")?;
    pb.finish_and_clear();
    Ok(())
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn parse_resolution(s: &str) -> Result<(f64, f64)> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    let (x, y) = match parts.as_slice() {
        [v] => (*v, *v),
        [x, y] => (*x, *y),
        _ => anyhow::bail!("Resolution must be 'R' or 'RX,RY', got: {}", s),
    };
    Ok((
        x.parse().context("Invalid x resolution")?,
        y.parse().context("Invalid y resolution")?,
    ))
}

fn parse_ids(s: &str) -> Result<Vec<i64>> {
    s.split(',')
        .filter(|p| !p.trim().is_empty())
        .map(|p| {
            p.trim()
                .parse::<i64>()
                .with_context(|| format!("Invalid id: {}", p))
        })
        .collect()
}

fn parse_layer(s: &str) -> Result<WeightedLayer> {
    let (path, weight) = s
        .rsplit_once('=')
        .with_context(|| format!("Layer must be 'PATH=WEIGHT', got: {}", s))?;
    let weight: f64 = weight
        .trim()
        .parse()
        .with_context(|| format!("Invalid weight in: {}", s))?;
    Ok(WeightedLayer::new(path.trim(), weight))
}

fn parse_layers(layers: &[String]) -> Result<Vec<WeightedLayer>> {
    layers.iter().map(|l| parse_layer(l)).collect()
}

fn parse_place(s: &str) -> Result<Place> {
    Ok(s.parse::<Place>()?)
}

fn publish_dir(config: &EngineConfig, dir: Option<PathBuf>) -> PathBuf {
    dir.unwrap_or_else(|| config.output_dir.join("published"))
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);
    let config = load_config(&cli)?;

    match cli.command {
        // ── Info ─────────────────────────────────────────────────────
        Commands::Info { input } => {
            let raster = read_raster(&input)?;
            let (rows, cols) = raster.shape();
            let bounds = raster.bounds();
            let (res_x, res_y) = raster.transform().resolution();
            let stats = raster.statistics();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
            println!("Cell size: {} x {}", res_x, res_y);
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
            );
            if let Some(crs) = raster.crs() {
                println!("CRS: {}", crs);
            }
            if let Some(nodata) = raster.nodata() {
                println!("NoData: {}", nodata);
            }
            println!("\nStatistics:");
            if let Some(min) = stats.min {
                println!("  Min: {:.4}", min);
            }
            if let Some(max) = stats.max {
                println!("  Max: {:.4}", max);
            }
            if let Some(mean) = stats.mean {
                println!("  Mean: {:.4}", mean);
            }
            println!(
                "  Valid cells: {} ({:.1}%)",
                stats.valid_count,
                100.0 * stats.valid_count as f64 / raster.len() as f64
            );
        }

        // ── Align ────────────────────────────────────────────────────
        Commands::Align { inputs, out_dir } => {
            let out_dir = out_dir.unwrap_or_else(|| config.output_dir.clone());
            std::fs::create_dir_all(&out_dir).context("Failed to create output directory")?;

            let aligner: GridAligner = config.aligner();
            let pb = spinner(&format!("Aligning {} layers...", inputs.len()));
            let start = Instant::now();
            let stack = aligner.align_paths(&inputs).context("Alignment failed")?;
            let elapsed = start.elapsed();
            pb.finish_and_clear();

            println!(
                "Common grid: {} x {} at {:?} in {}",
                stack.grid.cols, stack.grid.rows, stack.grid.resolution, stack.grid.crs
            );
            for (input, layer) in inputs.iter().zip(&stack.layers) {
                let stem = input
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("layer");
                let out = out_dir.join(format!("aligned_{}.tif", stem));
                write_result(layer, &out)?;
                println!("  {} -> {}", input.display(), out.display());
            }
            println!("  Processing time: {:.2?}", elapsed);
        }

        // ── Priority ─────────────────────────────────────────────────
        Commands::Priority {
            layers,
            constraints,
            place,
            clip,
            publish_dir: dir,
        } => {
            let request = PriorityRequest {
                layers: parse_layers(&layers)?,
                constraints,
                place: parse_place(&place)?,
                clip: clip.as_deref().map(parse_ids).transpose()?.unwrap_or_default(),
            };
            let publisher = DirectoryPublisher::new(publish_dir(&config, dir));

            let pb = spinner("Building priority map...");
            let start = Instant::now();
            let map = PriorityMapper::new(&config, &publisher)
                .create_priority_map(&request)
                .context("Priority map failed")?;
            pb.finish_and_clear();

            println!("{}", serde_json::to_string_pretty(&map)?);
            done("Priority map", &map.raster_path, start.elapsed());
        }

        // ── Suitability ──────────────────────────────────────────────
        Commands::Suitability {
            layers,
            constraints,
            place,
            clip,
            reverse,
            publish_dir: dir,
        } => {
            let request = SuitabilityRequest {
                layers: parse_layers(&layers)?,
                constraints,
                place: parse_place(&place)?,
                clip: clip.as_deref().map(parse_ids).transpose()?.unwrap_or_default(),
                reverse,
            };
            let publisher = DirectoryPublisher::new(publish_dir(&config, dir));

            let pb = spinner("Building suitability map...");
            let start = Instant::now();
            let map = SuitabilityMapper::new(&config, &publisher)
                .create_suitability_map(&request)
                .context("Suitability map failed")?;
            pb.finish_and_clear();

            println!("{}", serde_json::to_string_pretty(&map)?);
            done("Suitability map", &map.raster_path, start.elapsed());
        }

        // ── Clip ─────────────────────────────────────────────────────
        Commands::Clip {
            input,
            town,
            clip,
            place,
            basin,
        } => {
            let target = match (town, clip, basin) {
                (Some(ids), _, _) => ClipTarget::TownBuffer {
                    ids: parse_ids(&ids)?,
                },
                (None, Some(ids), _) => ClipTarget::Units {
                    place: parse_place(&place)?,
                    ids: parse_ids(&ids)?,
                },
                (None, None, true) => ClipTarget::Basin {
                    path: config.basin_path.clone(),
                },
                (None, None, false) => anyhow::bail!("Give one of --town, --clip or --basin"),
            };

            config.ensure_output_dir()?;
            let start = Instant::now();
            let out = config
                .clipper()
                .clip_file(&input, &target)
                .context("Clip failed")?;
            done("Clipped raster", &out, start.elapsed());
        }

        // ── Classify ─────────────────────────────────────────────────
        Commands::Classify {
            input,
            clip,
            place,
            csv,
        } => {
            let raster = read_raster(&input)?;
            let place = parse_place(&place)?;
            let ids = parse_ids(&clip)?;

            let breaks = ClassBreaks::from_raster(&raster, CLASS_LABELS.len())?;
            let classes = reclassify(&raster, &breaks)?;
            let crs = raster.crs().cloned().unwrap_or_else(|| config.crs());
            let zones = config.clipper().unit_zones(place, &ids, &crs)?;
            let stats = zone_class_statistics(&classes, &zones)?;

            let csv = match csv {
                Some(path) => path,
                None => {
                    config.ensure_output_dir()?;
                    unique_output_path(&config.output_dir, "village_details", "csv")
                }
            };
            write_zone_csv(&stats, &csv)?;

            println!("Breaks: {:?}", breaks.edges());
            for s in &stats {
                let p = s.percentages();
                println!(
                    "  {:<24} {:>6.2} {:>6.2} {:>6.2} {:>6.2} {:>6.2}",
                    s.name, p[0], p[1], p[2], p[3], p[4]
                );
            }
            println!("Zone statistics saved to: {}", csv.display());
        }

        // ── Style ────────────────────────────────────────────────────
        Commands::Style {
            input,
            ramp,
            reverse,
            classes,
            sld,
            json,
        } => {
            let raster = read_raster(&input)?;
            let ramp: ColorRamp = match ramp {
                Some(r) => r.parse()?,
                None => config.color_ramp,
            };
            let style = style_for_raster(&raster, classes.unwrap_or(config.num_classes), ramp, reverse)?;

            let path = match sld {
                Some(path) => {
                    stpgis_core::io::write_text(&path, &style.to_sld())?;
                    path
                }
                None => {
                    config.ensure_output_dir()?;
                    write_sld(&style, &config.output_dir)?
                }
            };
            if json {
                println!("{}", style.to_json()?);
            } else {
                for entry in &style.entries {
                    println!("  {:>12.4}  {}  {}", entry.quantity, entry.color, entry.label);
                }
            }
            println!("SLD saved to: {}", path.display());
        }

        // ── Interpolate ──────────────────────────────────────────────
        Commands::Interpolate {
            input,
            output,
            attribute,
            method,
            size,
        } => {
            let features = read_geojson(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let crs: Option<CRS> = features.crs.clone();
            let points = samples_from_features(&features, &attribute)?;
            info!("{} samples of '{}'", points.len(), attribute);

            let grid = InterpolationGrid::around_samples(&points, size, crs)?;
            let pb = spinner("Interpolating...");
            let start = Instant::now();
            let (raster, used) = if method.eq_ignore_ascii_case("auto") {
                interpolate_with_fallback(&points, &grid)?
            } else {
                let m: Method = method.parse()?;
                (interpolate(&points, m, &grid)?, m)
            };
            let elapsed = start.elapsed();
            pb.finish_and_clear();

            write_result(&raster, &output)?;
            let summary = InterpolationSummary::new(&raster, used)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            done("Interpolated raster", &output, elapsed);
        }

        // ── Catchment ────────────────────────────────────────────────
        Commands::Catchment { drain } => {
            let drains = parse_ids(&drain)?;
            let selection = catchment_villages(&config, &drains).context("Catchment selection failed")?;
            for v in &selection.villages {
                let id = v.id.map(|i| i.to_string()).unwrap_or_default();
                println!("  {:>8}  {:<24} {:>14.1}", id, v.village_name, v.area);
            }
            println!(
                "{} villages saved to: {}",
                selection.villages.len(),
                selection.path.display()
            );
        }
    }

    Ok(())
}
