use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use tracing::warn;

use wayrascope::config::WayraConfig;
use wayrascope::download::save_payload;
use wayrascope::logging::init_tracing;
use wayrascope::models::{Coordinates, DownloadFormat, DownloadRequest};
use wayrascope::transform::{
    DailyDataset, DailyVariable, HourlyDataset, WindUnit, build_daily_dataset,
    build_hourly_dataset, format_percent, format_probability, parse_range_date, range_to_dates,
};
use wayrascope::{
    AnalyzeResponse, AppStore, EventType, HourlyOrchestrator, HttpBackend, Language,
    PreferenceStore, Session, Theme, WeatherBackend,
};

#[derive(Parser)]
#[command(name = "wayrascope", version, about = "Climate and comfort analysis for a place and date")]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Interface language (es, en); the choice is remembered
    #[arg(long, global = true)]
    lang: Option<Language>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a city or a coordinate pair
    Analyze(AnalyzeArgs),
    /// Show the hourly forecast of one day
    Hourly(HourlyArgs),
    /// Download the analysis as CSV or JSON
    Download(DownloadArgs),
    /// Show or change stored preferences
    Prefs(PrefsArgs),
}

#[derive(Args)]
struct TargetArgs {
    /// Place name
    #[arg(long, conflicts_with_all = ["lat", "lon"], required_unless_present = "lat")]
    city: Option<String>,

    /// Latitude in decimal degrees
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    lat: Option<f64>,

    /// Longitude in decimal degrees
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    lon: Option<f64>,
}

impl TargetArgs {
    fn coordinates(&self) -> Option<Coordinates> {
        self.lat.zip(self.lon).map(|(lat, lon)| Coordinates::new(lat, lon))
    }
}

#[derive(Args)]
struct AnalyzeArgs {
    #[command(flatten)]
    target: TargetArgs,

    /// Event date (YYYY-MM-DD), defaults to today
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Event type
    #[arg(long)]
    event: Option<EventType>,

    /// Variable of the daily chart
    #[arg(long, default_value = "temperature")]
    variable: DailyVariable,

    /// Show wind in km/h
    #[arg(long)]
    kmh: bool,

    /// Jump to the N-th best day (1-based) after analyzing
    #[arg(long)]
    best_day: Option<usize>,
}

#[derive(Args)]
struct HourlyArgs {
    #[arg(long, allow_negative_numbers = true)]
    lat: f64,

    #[arg(long, allow_negative_numbers = true)]
    lon: f64,

    #[arg(long)]
    date: NaiveDate,

    #[arg(long)]
    event: Option<EventType>,

    /// Show wind in km/h
    #[arg(long)]
    kmh: bool,
}

#[derive(Args)]
struct DownloadArgs {
    #[command(flatten)]
    target: TargetArgs,

    #[arg(long)]
    date: NaiveDate,

    /// csv or json
    #[arg(long, default_value = "csv")]
    fmt: DownloadFormat,

    /// Output directory
    #[arg(long, default_value = ".")]
    out: PathBuf,
}

#[derive(Args)]
struct PrefsArgs {
    #[arg(long)]
    language: Option<Language>,

    #[arg(long)]
    theme: Option<Theme>,

    /// Forget the stored language and theme
    #[arg(long, conflicts_with_all = ["language", "theme"])]
    reset: bool,
}

fn open_preferences(config: &WayraConfig) -> Option<Arc<PreferenceStore>> {
    if !config.storage.enabled {
        return None;
    }
    let location = config.storage.resolved_location();
    match PreferenceStore::open(&location) {
        Ok(store) => Some(Arc::new(store)),
        Err(e) => {
            warn!(error = %e, "Preferences unavailable, continuing without them");
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = WayraConfig::load_from_path(cli.config.clone())
        .with_context(|| "Failed to load configuration")?;
    init_tracing(&config.logging, cli.verbose)?;

    let store = AppStore::new(&config.defaults, open_preferences(&config));
    if let Some(language) = cli.lang {
        store.set_language(language);
    }
    let backend: Arc<dyn WeatherBackend> = Arc::new(
        HttpBackend::new(&config.api, store.language())
            .with_context(|| "Failed to create backend client")?,
    );

    match cli.command {
        Commands::Analyze(args) => analyze(store, backend, &config, args).await,
        Commands::Hourly(args) => hourly(store, backend, args).await,
        Commands::Download(args) => download(backend, args).await,
        Commands::Prefs(args) => {
            prefs(&store, &config, args);
            Ok(())
        }
    }
}

async fn analyze(
    store: AppStore,
    backend: Arc<dyn WeatherBackend>,
    config: &WayraConfig,
    args: AnalyzeArgs,
) -> Result<()> {
    store.with_state(|state| {
        if let Some(city) = &args.target.city {
            state.set_city(city.clone());
            state.set_use_pin(false);
        }
        if let Some(coords) = args.target.coordinates() {
            state.set_coordinates(Some(coords));
            state.set_use_pin(true);
        }
        if let Some(date) = args.date {
            state.set_date(date);
        }
        if let Some(event) = args.event {
            state.set_event_type(event);
        }
    });

    let session = Session::new(store.clone(), backend, &config.defaults);
    let result = session
        .analyze()
        .await
        .with_context(|| "Analysis failed")?;
    let language = store.language();
    print_analysis(&result, language);

    if let Some(rank) = args.best_day {
        let Some(best) = rank.checked_sub(1).and_then(|index| result.best_days.get(index)) else {
            bail!("No best day #{rank}, the analysis has {}", result.best_days.len());
        };
        let date = parse_range_date(&best.date)
            .with_context(|| format!("Unrecognized best day date '{}'", best.date))?;
        session
            .select_best_day(date)
            .await
            .with_context(|| "Failed to load the best day")?;
    }

    let event_date = store.query().date;
    print_daily(&build_daily_dataset(&result, args.variable, event_date));

    let view = session.hourly_view();
    let wind_unit = if args.kmh { WindUnit::Kmh } else { WindUnit::Native };
    match (&view.data, &view.error) {
        (_, Some(error)) => println!("\nHourly forecast unavailable: {error}"),
        (Some(data), None) => print_hourly(&build_hourly_dataset(data, wind_unit)),
        (None, None) => {}
    }
    Ok(())
}

async fn hourly(store: AppStore, backend: Arc<dyn WeatherBackend>, args: HourlyArgs) -> Result<()> {
    let orchestrator = HourlyOrchestrator::new(store, backend);
    let data = orchestrator
        .load_hourly(args.lat, args.lon, args.date, args.event, false)
        .await
        .with_context(|| "Hourly forecast failed")?;

    let wind_unit = if args.kmh { WindUnit::Kmh } else { WindUnit::Native };
    print_hourly(&build_hourly_dataset(&data, wind_unit));
    Ok(())
}

async fn download(backend: Arc<dyn WeatherBackend>, args: DownloadArgs) -> Result<()> {
    let request = DownloadRequest {
        city: args.target.city.clone(),
        coordinates: args.target.coordinates(),
        date: args.date,
        format: args.fmt,
    };
    let payload = backend
        .download(&request)
        .await
        .with_context(|| "Download failed")?;
    let path = save_payload(&payload, &args.out)?;

    println!("Saved {} ({} bytes)", path.display(), payload.bytes.len());
    if let Some(meta) = payload.meta {
        println!("Metadata: {meta}");
    }
    Ok(())
}

fn prefs(store: &AppStore, config: &WayraConfig, args: PrefsArgs) {
    if args.reset {
        store.reset_preferences(&config.defaults);
    }
    if let Some(language) = args.language {
        store.set_language(language);
    }
    if let Some(theme) = args.theme {
        store.set_theme(theme);
    }
    println!("language = {}", store.language());
    println!("theme    = {}", store.theme());
}

fn cell(value: Option<f64>, decimals: usize) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.decimals$}"))
}

fn print_analysis(result: &AnalyzeResponse, language: Language) {
    let no_data = language.messages().no_data;
    println!("📍 {}", result.location.label());
    match range_to_dates(&result.range) {
        Some((start, end)) => println!("   Window: {start} → {end}"),
        None => println!("   Window: {}", result.range),
    }
    println!("   Comfort: {}", result.localized_comfort(language));
    println!("   Eco impact: {}", result.localized_eco_impact(language));
    let aqi = &result.air_quality_index;
    println!(
        "   Air quality: {} ({})",
        aqi.aqi.map_or_else(|| no_data.to_string(), |v| format!("{v:.0}")),
        aqi.category
    );
    println!(
        "   Trends: temperature {} · precipitation {} · humidity {} · wind {}",
        result.trend.temperature, result.trend.precipitation, result.trend.humidity, result.trend.wind
    );
    if !result.wayra_advisor.is_empty() {
        println!("   Advisor: {}", result.localized_advisor(language));
    }

    if let Some(probabilities) = &result.probabilities {
        println!("\nProbabilities");
        for (label, prob) in [
            ("very hot", probabilities.very_hot.prob),
            ("very cold", probabilities.very_cold.prob),
            ("very windy", probabilities.very_windy.prob),
            ("very humid", probabilities.very_humid.prob),
            ("very uncomfortable", probabilities.very_uncomfortable.prob),
        ] {
            println!("   {label:<20} {}", format_probability(prob, language));
        }
    }

    if !result.best_days.is_empty() {
        println!("\nBest days");
        for (rank, best) in result.best_days.iter().enumerate() {
            println!("   #{} {} score {:.1} {}", rank + 1, best.date, best.score, best.notes);
        }
    }

    if !result.sources.is_empty() {
        println!("\nSources: {}", result.sources.join(", "));
    }
    println!("Generated {}", Utc::now().format("%Y-%m-%d %H:%M UTC"));
}

fn print_daily(dataset: &DailyDataset) {
    println!("\nDaily {} ({})", dataset.variable, dataset.unit);
    if let Some(coverage) = dataset.incomplete_coverage {
        println!("   ⚠ Incomplete data: {} coverage", format_percent(coverage));
    }
    if let Some(stats) = dataset.stats {
        println!(
            "   min {:.1} · avg {:.1} · max {:.1}",
            stats.min, stats.avg, stats.max
        );
    }

    for (index, row) in dataset.rows.iter().enumerate() {
        let marker = if dataset.focus == Some(index) { "▶" } else { " " };
        let band = row
            .spread(dataset.variable)
            .map(|(low, high)| format!("  [p25 {low:.1} – p75 {high:.1}]"))
            .unwrap_or_default();
        println!(
            " {marker} {:<10} {:>10}{band}",
            row.date,
            cell(row.value(dataset.variable), 1)
        );
    }
}

fn print_hourly(dataset: &HourlyDataset) {
    let units = &dataset.units;
    println!(
        "\nHourly  temp ({}) · humidity ({}) · wind ({}) · precipitation ({})",
        units.temperature, units.humidity, units.wind, units.precipitation
    );
    for row in &dataset.rows {
        println!(
            " {} {}  {:>8} {:>8} {:>10} {:>8}",
            if row.best { "★" } else { " " },
            row.hour,
            cell(row.temperature, 1),
            cell(row.humidity, 0),
            cell(row.display_wind, 2),
            cell(row.precipitation, 1),
        );
    }
    for best in &dataset.best_hours {
        println!(" ★ {} score {:.1} {}", best.hour, best.score, best.notes);
    }
}
