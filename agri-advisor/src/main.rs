//! AgriSense Advisor - command-line entry point
//!
//! Runs one recommender or weather query against the configured services
//! and prints what the corresponding view would render.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use agri_advisor::aggregate::DisplayModel;
use agri_advisor::fields::FieldValue;
use agri_advisor::transport::{HttpTransport, Transport};
use agri_advisor::units::UnitSystem;
use agri_advisor::views::{
    crop_display, fertilizer_display, load_image, FormOutcome, FormState, ViewSpec, CROP_VIEW,
    DISEASE_VIEW, FERTILIZER_VIEW, SEED_VIEW,
};
use agri_advisor::weather::{
    Coordinates, FixedGeolocator, Geolocator, NoGeolocator, WeatherPanel, WeatherView,
};
use agri_advisor::AdvisorError;
use agri_common::config::{self, TomlConfig};
use agri_common::{EventBus, PreferenceStore};
use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for agri-advisor
#[derive(Parser, Debug)]
#[command(name = "agri-advisor")]
#[command(about = "Crop, fertilizer, disease and seed recommendations plus weather alerts")]
#[command(version)]
struct Args {
    /// Config file (default: platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Base URL of the prediction service
    #[arg(long, global = true, env = "AGRISENSE_API_URL")]
    api_url: Option<String>,

    /// Current-weather endpoint URL
    #[arg(long, global = true, env = "AGRISENSE_WEATHER_URL")]
    weather_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Log dispatcher events
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Recommend a crop from soil and climate readings
    Crop {
        /// Field value as Name=value (repeatable)
        #[arg(long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },
    /// Recommend a fertilizer
    Fertilizer {
        #[arg(long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },
    /// Detect plant disease from a leaf image
    Disease {
        #[arg(long)]
        image: PathBuf,
    },
    /// Recommend seed and pesticide
    Seed {
        #[arg(long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },
    /// Current weather and alerts
    Weather {
        /// Place name to search
        #[arg(long, conflicts_with_all = ["lat", "lon"])]
        place: Option<String>,

        #[arg(long, requires = "lon", allow_hyphen_values = true)]
        lat: Option<f64>,

        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,

        /// metric or imperial (default from config)
        #[arg(long)]
        unit: Option<UnitSystem>,

        /// Switch units after the first reading and fetch again
        #[arg(long)]
        toggle: bool,
    },
    /// Show or change the preferred language
    Language {
        #[command(subcommand)]
        action: LanguageAction,
    },
}

#[derive(Subcommand, Debug)]
enum LanguageAction {
    Get,
    Set { code: String },
}

fn parse_field(s: &str) -> std::result::Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected Name=value, got '{}'", s))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing field name in '{}'", s));
    }
    Ok((name.to_string(), value.to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Loaded before tracing so logging.level can seed the filter
    let config_path = config::config_source(args.config.as_deref());
    let toml_config = config::load_toml_config(args.config.as_deref())
        .context("Failed to load configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("agri_advisor={0},agri_common={0}", toml_config.logging.level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match &config_path {
        Some(path) => info!("Loaded config from {}", path.display()),
        None => info!("No config file found, using built-in defaults"),
    }

    let events = EventBus::default();
    let event_logger = args.verbose.then(|| spawn_event_logger(&events));

    let timeout = args
        .timeout
        .or(toml_config.request_timeout_secs)
        .map(Duration::from_secs);

    match args.command {
        Command::Crop { fields } => {
            let api = prediction_transport(&args.api_url, &toml_config, timeout)?;
            if let Some(response) = run_form(CROP_VIEW, api, &events, text_fields(fields)).await? {
                print_prediction("crop", &crop_display(&response));
            }
        }
        Command::Fertilizer { fields } => {
            let api = prediction_transport(&args.api_url, &toml_config, timeout)?;
            if let Some(response) = run_form(FERTILIZER_VIEW, api, &events, text_fields(fields)).await? {
                print_prediction("fertilizer", &fertilizer_display(&response));
            }
        }
        Command::Disease { image } => {
            let api = prediction_transport(&args.api_url, &toml_config, timeout)?;
            let file = load_image(&image).with_context(|| format!("Failed to read {}", image.display()))?;
            let values = vec![("image".to_string(), FieldValue::File(file))];
            if let Some(detection) = run_form(DISEASE_VIEW, api, &events, values).await? {
                println!("Disease:    {}", detection.disease);
                println!("Confidence: {}%", detection.confidence_percent());
            }
        }
        Command::Seed { fields } => {
            let api = prediction_transport(&args.api_url, &toml_config, timeout)?;
            if let Some(recommendation) = run_form(SEED_VIEW, api, &events, text_fields(fields)).await? {
                println!("Recommended seed:      {}", recommendation.seed);
                println!("Recommended pesticide: {}", recommendation.pesticide);
            }
        }
        Command::Weather {
            place,
            lat,
            lon,
            unit,
            toggle,
        } => {
            let weather_url = args
                .weather_url
                .clone()
                .unwrap_or_else(|| toml_config.weather_base_url.clone());
            let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(weather_url, timeout)?);
            let (api_key, _) = config::resolve_weather_api_key(&toml_config);
            let unit = unit.unwrap_or_else(|| configured_unit(&toml_config));

            let geolocator: Arc<dyn Geolocator> = match (lat, lon) {
                (Some(latitude), Some(longitude)) => Arc::new(FixedGeolocator(Coordinates { latitude, longitude })),
                _ => Arc::new(NoGeolocator),
            };

            let panel = WeatherPanel::new(transport, geolocator, api_key, unit).with_events(events.clone());
            match place {
                Some(place) => panel.search(&place).await?,
                None => panel.locate().await?,
            }
            print_weather(&panel.view().await);

            if toggle {
                let unit = panel.toggle_unit().await?;
                info!("Units switched to {}", unit);
                println!();
                print_weather(&panel.view().await);
            }
        }
        Command::Language { action } => {
            let path = toml_config
                .preferences_path
                .clone()
                .or_else(config::default_preferences_path)
                .ok_or_else(|| anyhow!("No preferences location available on this platform"))?;
            let mut store = PreferenceStore::load(path)?;
            match action {
                LanguageAction::Get => println!("{}", store.language().unwrap_or("(not set)")),
                LanguageAction::Set { code } => {
                    store.set_language(&code)?;
                    info!("Language set to {} in {}", code, store.path().display());
                    println!("{}", code);
                }
            }
        }
    }

    // Closing the last sender ends the logger once it has drained the channel
    drop(events);
    if let Some(logger) = event_logger {
        let logged = logger.await.context("Event logger failed")?;
        debug!(logged, "Event logger finished");
    }

    Ok(())
}

fn prediction_transport(
    api_url: &Option<String>,
    toml_config: &TomlConfig,
    timeout: Option<Duration>,
) -> Result<Arc<dyn Transport>> {
    let base_url = api_url.clone().unwrap_or_else(|| toml_config.api_base_url.clone());
    info!("Prediction service: {}", base_url);
    Ok(Arc::new(HttpTransport::new(base_url, timeout)?))
}

fn configured_unit(toml_config: &TomlConfig) -> UnitSystem {
    toml_config.default_unit.parse().unwrap_or_else(|e| {
        warn!("Ignoring default_unit from config: {}", e);
        UnitSystem::default()
    })
}

fn text_fields(fields: Vec<(String, String)>) -> Vec<(String, FieldValue)> {
    fields
        .into_iter()
        .map(|(name, value)| (name, FieldValue::Text(value)))
        .collect()
}

/// Fill a form, submit it once, and return the response if one arrived
///
/// Validation and transport failures print the view's message and yield `None`.
async fn run_form<R>(
    spec: ViewSpec<R>,
    transport: Arc<dyn Transport>,
    events: &EventBus,
    values: Vec<(String, FieldValue)>,
) -> Result<Option<R>>
where
    R: Clone + Send,
{
    let mut form = FormState::new(spec, transport).with_events(events.clone());
    for (name, value) in values {
        form.set_value(&name, value);
    }

    match form.submit().await {
        Ok(_) => {}
        Err(AdvisorError::Validation(_)) => {
            if let Some(message) = form.validation_message() {
                eprintln!("{}", message);
            }
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    }

    match form.outcome().await {
        FormOutcome::Ready(response) => Ok(Some(response)),
        FormOutcome::Failed(message) => {
            eprintln!("{}", message);
            Ok(None)
        }
        FormOutcome::Editing { .. } | FormOutcome::Loading => {
            bail!("{} form did not settle", form.spec().name)
        }
    }
}

fn print_prediction(kind: &str, model: &DisplayModel) {
    println!("Recommended {}: {}", kind, model.final_label);
    println!();
    println!("{}", model.entry.title);
    println!("{}", model.entry.description);
    println!("Image: {}", model.entry.image_ref);
    println!();
    println!("{:<14} {:<18} Confidence", "Model", "Prediction");
    for row in &model.rows {
        println!("{:<14} {:<18} {}", row.display_name, row.label, row.confidence);
    }
}

fn print_weather(view: &WeatherView) {
    if let Some(error) = &view.error {
        eprintln!("{}", error);
    }
    let today = chrono::Local::now().format("%A, %B %-d, %Y").to_string();
    if let Some(report) = weather_report(view, &today) {
        print!("{}", report);
    }
}

/// Rendered reading and alerts; `None` when no reading is held
fn weather_report(view: &WeatherView, today: &str) -> Option<String> {
    let reading = view.reading.as_ref()?;
    let round = agri_advisor::alerts::round_display;
    let symbol = reading.unit_system.temperature_symbol();

    let mut lines = vec![
        format!("{}, {}", reading.location_name, reading.country),
        today.to_string(),
        format!("{}°{}  {}", round(reading.temp_value), symbol, reading.condition_description),
        // Humidity is shown as reported
        format!("Humidity:   {}%", reading.humidity_pct),
        format!("Wind:       {} {}", round(reading.wind_speed), reading.unit_system.speed_label()),
        format!("Feels like: {}°{}", round(reading.feels_like), symbol),
        format!("Icon:       {}", reading.icon_url()),
    ];

    if !view.alerts.is_empty() {
        lines.push(String::new());
        lines.push("Alerts:".to_string());
        lines.extend(view.alerts.iter().map(|alert| format!("  {}", alert)));
    }

    let mut report = lines.join("\n");
    report.push('\n');
    Some(report)
}

/// Log every bus event until all senders are gone; yields the count logged
fn spawn_event_logger(events: &EventBus) -> JoinHandle<usize> {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        let mut logged = 0;
        loop {
            match rx.recv().await {
                Ok(event) => {
                    match serde_json::to_string(&event) {
                        Ok(json) => info!(form_id = %event.form_id(), "Event: {}", json),
                        Err(e) => warn!("Failed to serialize event: {}", e),
                    }
                    logged += 1;
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event logger lagged"),
                Err(RecvError::Closed) => break,
            }
        }
        logged
    })
}
