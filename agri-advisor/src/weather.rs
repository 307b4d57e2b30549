//! Weather view: place search, position lookup, unit toggling
//!
//! The place search and the position lookup each own an independent
//! dispatcher, so both may be in flight at once. A panel-level issue
//! sequence keeps an older query from overwriting the reading set by a
//! newer one, whichever dispatcher each went through.

use crate::alerts::{self, Alert};
use crate::dispatcher::{RequestDispatcher, Resolution};
use crate::error::AdvisorResult;
use crate::request::{Endpoint, HttpMethod, PayloadShape, WirePayload};
use crate::transport::{Transport, TransportError};
use crate::units::{UnitSession, UnitSystem};
use agri_common::events::EventBus;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

pub const WEATHER_FAILURE_MESSAGE: &str = "Failed to fetch weather data. Please try again.";
pub const LOCATION_NOT_FOUND_MESSAGE: &str = "Location not found. Please try again.";

/// Current-weather lookup by place name
pub const WEATHER_BY_PLACE: Endpoint = Endpoint {
    name: "weather_by_place",
    method: HttpMethod::Get,
    path: "",
    shape: PayloadShape::Query,
    renames: &[],
    status_in_body: true,
};

/// Current-weather lookup by coordinates
pub const WEATHER_BY_COORDINATES: Endpoint = Endpoint {
    name: "weather_by_coordinates",
    method: HttpMethod::Get,
    path: "",
    shape: PayloadShape::Query,
    renames: &[],
    status_in_body: true,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeolocationError {
    #[error("Geolocation is not supported on this device.")]
    Unsupported,

    #[error("Unable to retrieve your location. Please enter a location manually.")]
    Unavailable(String),
}

/// Source of the device's current position
#[async_trait]
pub trait Geolocator: Send + Sync {
    async fn current_position(&self) -> Result<Coordinates, GeolocationError>;
}

/// Position supplied up front (command line, config)
pub struct FixedGeolocator(pub Coordinates);

#[async_trait]
impl Geolocator for FixedGeolocator {
    async fn current_position(&self) -> Result<Coordinates, GeolocationError> {
        Ok(self.0)
    }
}

/// No positioning available
pub struct NoGeolocator;

#[async_trait]
impl Geolocator for NoGeolocator {
    async fn current_position(&self) -> Result<Coordinates, GeolocationError> {
        Err(GeolocationError::Unsupported)
    }
}

// Wire shape of the current-weather response

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CurrentWeather {
    pub name: String,
    #[serde(default)]
    pub sys: SysInfo,
    pub main: MainInfo,
    pub wind: WindInfo,
    pub weather: Vec<ConditionInfo>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SysInfo {
    #[serde(default)]
    pub country: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MainInfo {
    pub temp: f64,
    pub humidity: f64,
    pub feels_like: f64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct WindInfo {
    pub speed: f64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ConditionInfo {
    pub main: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
}

fn decode_current(body: Value) -> Result<CurrentWeather, TransportError> {
    let current: CurrentWeather =
        serde_json::from_value(body).map_err(|e| TransportError::Parse(e.to_string()))?;
    if current.weather.is_empty() {
        return Err(TransportError::Parse("weather conditions missing".to_string()));
    }
    Ok(current)
}

/// Place lookups must report `cod == 200`; anything else carries a message
fn decode_by_place(body: Value) -> Result<CurrentWeather, TransportError> {
    if body.get("cod").and_then(Value::as_i64) != Some(200) {
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .unwrap_or(LOCATION_NOT_FOUND_MESSAGE);
        return Err(TransportError::Service(message.to_string()));
    }
    decode_current(body)
}

/// Coordinate lookups do not check `cod`
fn decode_by_coordinates(body: Value) -> Result<CurrentWeather, TransportError> {
    decode_current(body)
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReading {
    pub location_name: String,
    pub country: String,
    pub temp_value: f64,
    pub unit_system: UnitSystem,
    pub humidity_pct: f64,
    pub wind_speed: f64,
    pub condition_main: String,
    pub condition_description: String,
    pub condition_icon: String,
    pub feels_like: f64,
}

impl WeatherReading {
    /// Reading in the unit system the request was issued under
    pub fn from_current(current: CurrentWeather, unit_system: UnitSystem) -> Self {
        let condition = current.weather.into_iter().next();
        let (condition_main, condition_description, condition_icon) = condition
            .map(|c| (c.main, c.description, c.icon))
            .unwrap_or_default();

        Self {
            location_name: current.name,
            country: current.sys.country,
            temp_value: current.main.temp,
            unit_system,
            humidity_pct: current.main.humidity,
            wind_speed: current.wind.speed,
            condition_main,
            condition_description,
            condition_icon,
            feels_like: current.main.feels_like,
        }
    }

    pub fn icon_url(&self) -> String {
        format!("https://openweathermap.org/img/wn/{}@2x.png", self.condition_icon)
    }
}

/// Snapshot of what the weather view renders
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherView {
    pub unit: UnitSystem,
    pub reading: Option<WeatherReading>,
    pub alerts: Vec<Alert>,
    pub error: Option<String>,
}

struct PanelState {
    session: UnitSession,
    reading: Option<WeatherReading>,
    error: Option<String>,
    issued: u64,
    applied: u64,
}

pub struct WeatherPanel {
    search: RequestDispatcher<CurrentWeather>,
    locate: RequestDispatcher<CurrentWeather>,
    geolocator: Arc<dyn Geolocator>,
    api_key: String,
    state: Mutex<PanelState>,
}

impl WeatherPanel {
    pub fn new(
        transport: Arc<dyn Transport>,
        geolocator: Arc<dyn Geolocator>,
        api_key: impl Into<String>,
        unit: UnitSystem,
    ) -> Self {
        Self {
            search: RequestDispatcher::new("weather_search", WEATHER_BY_PLACE, transport.clone(), decode_by_place),
            locate: RequestDispatcher::new("weather_locate", WEATHER_BY_COORDINATES, transport, decode_by_coordinates),
            geolocator,
            api_key: api_key.into(),
            state: Mutex::new(PanelState {
                session: UnitSession::new(unit),
                reading: None,
                error: None,
                issued: 0,
                applied: 0,
            }),
        }
    }

    pub fn with_events(self, bus: EventBus) -> Self {
        Self {
            search: self.search.with_events(bus.clone()),
            locate: self.locate.with_events(bus),
            ..self
        }
    }

    async fn issue(&self) -> (UnitSystem, u64) {
        let mut state = self.state.lock().await;
        state.issued += 1;
        (state.session.unit(), state.issued)
    }

    /// Look up current weather by place name; blank input is ignored
    pub async fn search(&self, place: &str) -> AdvisorResult<()> {
        let place = place.trim();
        if place.is_empty() {
            return Ok(());
        }

        let (unit, seq) = self.issue().await;
        let payload = WirePayload::query([
            ("q", place.to_string()),
            ("units", unit.as_query().to_string()),
            ("appid", self.api_key.clone()),
        ]);

        debug!(place, unit = %unit, seq, "Weather search");
        let resolution = self.search.submit(payload).await?;
        self.apply(resolution, unit, seq).await;
        Ok(())
    }

    /// Look up current weather at the device position
    ///
    /// A positioning failure is shown on the panel and leaves the search path untouched.
    pub async fn locate(&self) -> AdvisorResult<()> {
        let position = match self.geolocator.current_position().await {
            Ok(position) => position,
            Err(e) => {
                info!("Geolocation failed: {:?}", e);
                self.state.lock().await.error = Some(e.to_string());
                return Ok(());
            }
        };

        let (unit, seq) = self.issue().await;
        let payload = WirePayload::query([
            ("lat", position.latitude.to_string()),
            ("lon", position.longitude.to_string()),
            ("units", unit.as_query().to_string()),
            ("appid", self.api_key.clone()),
        ]);

        debug!(lat = position.latitude, lon = position.longitude, unit = %unit, seq, "Weather by position");
        let resolution = self.locate.submit(payload).await?;
        self.apply(resolution, unit, seq).await;
        Ok(())
    }

    /// Flip units and re-query the displayed place by name
    pub async fn toggle_unit(&self) -> AdvisorResult<UnitSystem> {
        let (unit, refetch) = {
            let mut state = self.state.lock().await;
            let refetch = state.session.toggle();
            (state.session.unit(), refetch)
        };

        if let Some(refetch) = refetch {
            // A pending search was issued under the old unit
            self.search.abandon().await;
            self.search(&refetch.place).await?;
        }
        Ok(unit)
    }

    async fn apply(&self, resolution: Resolution<CurrentWeather>, unit: UnitSystem, seq: u64) {
        let Resolution::Applied(outcome) = resolution else {
            return;
        };

        let mut state = self.state.lock().await;
        if seq < state.applied {
            debug!(seq, applied = state.applied, "Dropping superseded weather result");
            return;
        }
        state.applied = seq;

        match outcome {
            Ok(current) => {
                let reading = WeatherReading::from_current(current, unit);
                state.session.record_display(reading.location_name.clone());
                info!(
                    location = %reading.location_name,
                    temp = reading.temp_value,
                    unit = %unit,
                    "Weather reading updated"
                );
                state.reading = Some(reading);
                state.error = None;
            }
            Err(TransportError::Service(message)) => state.error = Some(message),
            Err(_) => state.error = Some(WEATHER_FAILURE_MESSAGE.to_string()),
        }
    }

    pub async fn view(&self) -> WeatherView {
        let state = self.state.lock().await;
        WeatherView {
            unit: state.session.unit(),
            alerts: state.reading.as_ref().map(alerts::evaluate).unwrap_or_default(),
            reading: state.reading.clone(),
            error: state.error.clone(),
        }
    }
}
