//! CLI entry point for the corridor travel-time comparison tool.
//!
//! Subcommands fetch two date windows from ClearGuide and write the summary
//! table, the time-of-day profile, speed-difference heatmaps, or all of them.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use corridor_compare::analyzers::ContourTable;
use corridor_compare::config::{Config, RouteConfig};
use corridor_compare::fetch::BasicClient;
use corridor_compare::fetch::auth::Credentials;
use corridor_compare::filter::FilterCriteria;
use corridor_compare::infra::clearguide::ClearGuideClient;
use corridor_compare::model::RouteId;
use corridor_compare::output::{
    HeatmapOutput, format_summary_table, heatmap_for_route, print_json, summary_table,
    time_of_day_charts, time_of_day_table, timeseries_table, write_csv, write_json,
};
use corridor_compare::points::{Direction, distances_from_origin, load_points};
use corridor_compare::session::{ComparisonRequest, Session};
use corridor_compare::window::{DateSpan, WindowPair};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

type ClearGuideSession = Session<ClearGuideClient<BasicClient>>;

#[derive(Parser)]
#[command(name = "corridor_compare")]
#[command(about = "Compare corridor travel times and speeds between two date windows", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ComparisonArgs {
    /// Comma-separated customer route numbers
    #[arg(long, value_delimiter = ',', required = true)]
    routes: Vec<RouteId>,

    /// Baseline window, e.g. 2024-09-01:2024-09-30
    #[arg(long)]
    window_a: DateSpan,

    /// Comparison window, e.g. 2024-10-01:2024-10-31
    #[arg(long)]
    window_b: DateSpan,

    /// Weekdays to keep (Mon,Tue,...); all days when omitted
    #[arg(long, value_delimiter = ',')]
    weekdays: Vec<String>,

    /// ISO dates to drop from both windows
    #[arg(long, value_delimiter = ',')]
    exclude: Vec<String>,

    /// Directory for CSV and JSON output
    #[arg(short, long, default_value = "output")]
    output_dir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Print and write the per-route summary table
    Summary {
        #[command(flatten)]
        args: ComparisonArgs,
    },
    /// Write the time-of-day profile table and chart series
    TimeOfDay {
        #[command(flatten)]
        args: ComparisonArgs,
    },
    /// Write speed-difference heatmaps for routes with point data
    Heatmap {
        #[command(flatten)]
        args: ComparisonArgs,

        /// JSON file with per-route direction and point file
        #[arg(long)]
        route_config: Option<PathBuf>,
    },
    /// Run every comparison from one fetch per metric
    Report {
        #[command(flatten)]
        args: ComparisonArgs,

        /// JSON file with per-route direction and point file
        #[arg(long)]
        route_config: Option<PathBuf>,
    },
    /// Print intersection distances from a KML or GeoJSON point file
    Points {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Travel direction: Northbound, Southbound, Eastbound or Westbound
        #[arg(short, long)]
        direction: Direction,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/corridor_compare.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("corridor_compare.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Summary { args } => {
            let (mut session, request, criteria) = prepare(&args)?;
            let rows = session.summary(&request, &criteria).await?;
            let table = summary_table(&rows);
            println!("{}", format_summary_table(&table));
            write_csv(&args.output_dir.join("summary.csv"), &table)?;
        }
        Commands::TimeOfDay { args } => {
            let (mut session, request, criteria) = prepare(&args)?;
            let profile = session.time_of_day(&request, &criteria).await?;
            write_csv(
                &args.output_dir.join("time_of_day.csv"),
                &time_of_day_table(&profile),
            )?;
            write_json(
                &args.output_dir.join("time_of_day_charts.json"),
                &time_of_day_charts(&profile),
            )?;
        }
        Commands::Heatmap { args, route_config } => {
            let route_config = load_route_config(route_config.as_deref())?;
            let (mut session, request, criteria) = prepare(&args)?;
            let contours = session.speed_contours(&request, &criteria).await?;
            let heatmaps = build_heatmaps(request.routes(), &contours, &route_config);
            write_json(&args.output_dir.join("heatmaps.json"), &heatmaps)?;
        }
        Commands::Report { args, route_config } => {
            let route_config = load_route_config(route_config.as_deref())?;
            let (mut session, request, criteria) = prepare(&args)?;
            let report = session.report(&request, &criteria).await?;

            let table = summary_table(&report.summary);
            println!("{}", format_summary_table(&table));
            let dir = &args.output_dir;
            write_csv(&dir.join("summary.csv"), &table)?;
            write_csv(
                &dir.join("timeseries.csv"),
                &timeseries_table(&report.timeseries),
            )?;
            write_csv(
                &dir.join("time_of_day.csv"),
                &time_of_day_table(&report.time_of_day),
            )?;
            write_json(
                &dir.join("time_of_day_charts.json"),
                &time_of_day_charts(&report.time_of_day),
            )?;
            let heatmaps = build_heatmaps(request.routes(), &report.contours, &route_config);
            write_json(&dir.join("heatmaps.json"), &heatmaps)?;

            info!(
                output_dir = %dir.display(),
                upstream_fetches = session.fetch_count(),
                "Report written"
            );
        }
        Commands::Points { file, direction } => {
            let points = load_points(&file)
                .with_context(|| format!("reading points from {}", file.display()))?;
            let labels = distances_from_origin(&points, direction)?;
            for label in &labels {
                println!("{:<40} {:>8.2} mi", label.name, label.distance_miles);
            }
            print_json(&labels)?;
        }
    }

    Ok(())
}

/// Builds the session, request and filter shared by every comparison subcommand.
fn prepare(args: &ComparisonArgs) -> Result<(ClearGuideSession, ComparisonRequest, FilterCriteria)> {
    let config = Config::from_env().context("loading configuration")?;
    let credentials = Credentials::from_env().context("loading ClearGuide credentials")?;
    let criteria = FilterCriteria::parse(&args.weekdays, &args.exclude)?;
    let windows = WindowPair::from_dates(args.window_a, args.window_b, &config.site_clock)?;

    fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating {}", args.output_dir.display()))?;

    let http = BasicClient::new(config.timeout)?;
    let api = ClearGuideClient::new(http, &config);
    let session = Session::new(api, config.site_clock);
    let request = ComparisonRequest::new(args.routes.iter().copied(), windows, credentials);

    info!(
        routes = request.routes().len(),
        timezone = %config.site_clock.timezone(),
        "Comparison prepared"
    );
    Ok((session, request, criteria))
}

fn load_route_config(path: Option<&Path>) -> Result<RouteConfig> {
    match path {
        Some(path) => {
            let config = RouteConfig::load(path)
                .with_context(|| format!("reading route config {}", path.display()))?;
            let with_points = config.iter().filter(|(_, s)| s.points.is_some()).count();
            info!(path = %path.display(), with_points, "Route config loaded");
            Ok(config)
        }
        None => {
            warn!("No route config given; heatmaps need a direction and point file per route");
            Ok(RouteConfig::default())
        }
    }
}

fn build_heatmaps(
    routes: &[RouteId],
    contours: &BTreeMap<RouteId, ContourTable>,
    route_config: &RouteConfig,
) -> Vec<HeatmapOutput> {
    let heatmaps: Vec<HeatmapOutput> = routes
        .iter()
        .map(|&route_id| {
            heatmap_for_route(route_id, contours.get(&route_id), route_config.get(route_id))
        })
        .collect();
    let ready = heatmaps
        .iter()
        .filter(|h| matches!(h, HeatmapOutput::Ready(_)))
        .count();
    info!(ready, unavailable = heatmaps.len() - ready, "Heatmaps built");
    heatmaps
}
