use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use choropleth::{MapChart, MapConfig, MapOptions, RecordingSurface};
use clap::{Parser, Subcommand, ValueEnum};
use compute::compute_data_view;
use data::{DataController, DataPoint};
use formats::{FeatureCollection, parse_dataset_str};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Choropleth data and geometry tooling")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the aggregated data view of a dataset
    Aggregate {
        /// Dataset JSON: an array of {location, label, group?, value}
        #[arg(long)]
        data: PathBuf,

        /// Group to present (defaults to the first group)
        #[arg(long)]
        group: Option<String>,
    },

    /// Print the working geometry prepared from a feature collection
    Prepare {
        /// GeoJSON FeatureCollection
        #[arg(long)]
        geojson: PathBuf,

        /// Feature id to remove (repeatable)
        #[arg(long)]
        exclude: Vec<String>,

        /// Feature id to keep; when given, all others are removed (repeatable)
        #[arg(long)]
        include: Vec<String>,

        #[arg(long, value_enum, default_value_t = PrepareOutput::Summary)]
        output: PrepareOutput,
    },

    /// Render one map frame and print it as JSON
    View {
        #[arg(long)]
        data: PathBuf,

        /// GeoJSON FeatureCollection; a grid is generated when omitted
        #[arg(long)]
        geojson: Option<PathBuf>,

        /// Chart options JSON
        #[arg(long)]
        options: Option<PathBuf>,

        #[arg(long)]
        group: Option<String>,

        /// Feature id to select before rendering (repeatable)
        #[arg(long)]
        select: Vec<String>,
    },
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum PrepareOutput {
    Summary,
    Geojson,
}

#[derive(Serialize)]
struct PreparedSummary {
    id: String,
    name: String,
    center: Option<[f64; 2]>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = real_main() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn real_main() -> Result<(), String> {
    let args = Args::parse();
    match args.command {
        Command::Aggregate { data, group } => cmd_aggregate(&data, group.as_deref()),
        Command::Prepare {
            geojson,
            exclude,
            include,
            output,
        } => cmd_prepare(&geojson, &exclude, &include, output),
        Command::View {
            data,
            geojson,
            options,
            group,
            select,
        } => cmd_view(
            &data,
            geojson.as_deref(),
            options.as_deref(),
            group,
            &select,
        ),
    }
}

fn cmd_aggregate(data: &Path, group: Option<&str>) -> Result<(), String> {
    let dataset = read_dataset(data)?;
    let view = compute_data_view(&dataset, group);
    info!(
        records = dataset.len(),
        groups = view.groups.len(),
        group = ?view.selected_group,
        "aggregated"
    );
    print_json(&view)
}

fn cmd_prepare(
    geojson: &Path,
    exclude: &[String],
    include: &[String],
    output: PrepareOutput,
) -> Result<(), String> {
    let raw = read_geojson(geojson)?;
    let config = MapConfig::default();
    let working = choropleth::prepare(
        &raw,
        exclude,
        include,
        Rc::clone(&config.id_accessor),
        Rc::clone(&config.name_accessor),
    )
    .map_err(|e| format!("prepare {geojson:?}: {e}"))?;
    info!(input = raw.len(), kept = working.len(), "prepared");

    match output {
        PrepareOutput::Summary => {
            let rows: Vec<PreparedSummary> = working
                .features
                .iter()
                .map(|f| PreparedSummary {
                    id: f.feature_id.clone(),
                    name: f.name.clone(),
                    center: f.center.map(|c| [c.lon_deg, c.lat_deg]),
                })
                .collect();
            print_json(&rows)
        }
        PrepareOutput::Geojson => {
            let features = working.features.iter().map(|f| f.feature.clone()).collect();
            let text = FeatureCollection::new(features)
                .to_geojson_string()
                .map_err(|e| format!("encode geojson: {e}"))?;
            println!("{text}");
            Ok(())
        }
    }
}

fn cmd_view(
    data: &Path,
    geojson: Option<&Path>,
    options: Option<&Path>,
    group: Option<String>,
    select: &[String],
) -> Result<(), String> {
    let mut opts = match options {
        Some(path) => {
            let text = fs::read_to_string(path).map_err(|e| format!("read {path:?}: {e}"))?;
            MapOptions::from_json_str(&text).map_err(|e| format!("options {path:?}: {e}"))?
        }
        None => MapOptions::default(),
    };
    if group.is_some() {
        opts.group = group;
    }
    let config = MapConfig::new(opts).map_err(|e| format!("options: {e}"))?;

    let surface = RecordingSurface::new();
    let chart = MapChart::new(config, surface.clone()).map_err(|e| format!("options: {e}"))?;
    chart.set_data_controller(Rc::new(DataController::new(read_dataset(data)?)));
    if let Some(path) = geojson {
        chart
            .set_geojson(read_geojson(path)?)
            .map_err(|e| format!("geometry {path:?}: {e}"))?;
    }
    chart.run().map_err(|e| format!("render: {e}"))?;
    for id in select {
        let selected = chart.click_feature(id).map_err(|e| format!("select {id}: {e}"))?;
        if !selected {
            return Err(format!("select {id}: no such feature"));
        }
    }
    if !select.is_empty() {
        chart.run().map_err(|e| format!("render: {e}"))?;
    }

    let frame = surface
        .last_frame()
        .ok_or_else(|| "nothing was rendered".to_string())?;
    print_json(&frame)
}

fn read_dataset(path: &Path) -> Result<Vec<DataPoint>, String> {
    let text = fs::read_to_string(path).map_err(|e| format!("read {path:?}: {e}"))?;
    parse_dataset_str(&text).map_err(|e| format!("dataset {path:?}: {e}"))
}

fn read_geojson(path: &Path) -> Result<FeatureCollection, String> {
    let text = fs::read_to_string(path).map_err(|e| format!("read {path:?}: {e}"))?;
    FeatureCollection::from_geojson_str(&text).map_err(|e| format!("geojson {path:?}: {e}"))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let text = serde_json::to_string_pretty(value).map_err(|e| format!("encode json: {e}"))?;
    println!("{text}");
    Ok(())
}
