//! Weather alert derivation
//!
//! An ordered rule table evaluated top to bottom. Rules in an exclusive
//! family stop the rest of that family once one fires, so at most one
//! temperature and one precipitation alert appear per reading.

use crate::units::UnitSystem;
use crate::weather::WeatherReading;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertFamily {
    Temperature,
    Wind,
    Precipitation,
}

impl AlertFamily {
    fn exclusive(self) -> bool {
        match self {
            AlertFamily::Temperature | AlertFamily::Precipitation => true,
            AlertFamily::Wind => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub family: AlertFamily,
    pub message: String,
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

struct AlertRule {
    family: AlertFamily,
    fires: fn(&WeatherReading) -> bool,
    message: fn(&WeatherReading) -> String,
}

const HIGH_TEMP_C: f64 = 35.0;
const HIGH_TEMP_F: f64 = 95.0;
const LOW_TEMP_C: f64 = 0.0;
const LOW_TEMP_F: f64 = 32.0;
const HIGH_WIND_KMH: f64 = 20.0;
// 20 km/h ≈ 12.5 mph
const HIGH_WIND_MPH: f64 = 12.5;

/// Round half up toward +∞, as displayed readings are rounded
pub fn round_display(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

fn condition(reading: &WeatherReading) -> String {
    reading.condition_main.to_lowercase()
}

fn temperature_text(reading: &WeatherReading) -> String {
    format!(
        "{}°{}",
        round_display(reading.temp_value),
        reading.unit_system.temperature_symbol()
    )
}

const RULES: &[AlertRule] = &[
    AlertRule {
        family: AlertFamily::Temperature,
        fires: |r| match r.unit_system {
            UnitSystem::Metric => r.temp_value > HIGH_TEMP_C,
            UnitSystem::Imperial => r.temp_value > HIGH_TEMP_F,
        },
        message: |r| format!("High temperature warning: {}", temperature_text(r)),
    },
    AlertRule {
        family: AlertFamily::Temperature,
        fires: |r| match r.unit_system {
            UnitSystem::Metric => r.temp_value < LOW_TEMP_C,
            UnitSystem::Imperial => r.temp_value < LOW_TEMP_F,
        },
        message: |r| format!("Low temperature warning: {}", temperature_text(r)),
    },
    AlertRule {
        family: AlertFamily::Wind,
        fires: |r| match r.unit_system {
            UnitSystem::Metric => r.wind_speed > HIGH_WIND_KMH,
            UnitSystem::Imperial => r.wind_speed > HIGH_WIND_MPH,
        },
        message: |r| {
            format!(
                "High wind warning: {} {}",
                round_display(r.wind_speed),
                r.unit_system.speed_label()
            )
        },
    },
    AlertRule {
        family: AlertFamily::Precipitation,
        fires: |r| condition(r).contains("rain"),
        message: |_| "Rain alert: Precipitation expected".to_string(),
    },
    AlertRule {
        family: AlertFamily::Precipitation,
        fires: |r| condition(r).contains("snow"),
        message: |_| "Snow alert: Snowfall expected".to_string(),
    },
];

/// Alerts for `reading`, temperature first, then wind, then precipitation
pub fn evaluate(reading: &WeatherReading) -> Vec<Alert> {
    let mut fired: Vec<AlertFamily> = Vec::new();
    let mut alerts = Vec::new();

    for rule in RULES {
        if rule.family.exclusive() && fired.contains(&rule.family) {
            continue;
        }
        if (rule.fires)(reading) {
            fired.push(rule.family);
            alerts.push(Alert {
                family: rule.family,
                message: (rule.message)(reading),
            });
        }
    }

    alerts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(temp: f64, wind: f64, condition: &str, unit: UnitSystem) -> WeatherReading {
        WeatherReading {
            location_name: "Pune".to_string(),
            country: "IN".to_string(),
            temp_value: temp,
            unit_system: unit,
            humidity_pct: 40.0,
            wind_speed: wind,
            condition_main: condition.to_string(),
            condition_description: condition.to_lowercase(),
            condition_icon: "01d".to_string(),
            feels_like: temp,
        }
    }

    fn messages(alerts: &[Alert]) -> Vec<&str> {
        alerts.iter().map(|a| a.message.as_str()).collect()
    }

    #[test]
    fn test_high_temperature_metric() {
        let alerts = evaluate(&reading(36.0, 5.0, "Clear", UnitSystem::Metric));
        assert_eq!(messages(&alerts), vec!["High temperature warning: 36°C"]);
    }

    #[test]
    fn test_temperature_then_wind() {
        let alerts = evaluate(&reading(36.0, 25.0, "Clear", UnitSystem::Metric));
        assert_eq!(
            messages(&alerts),
            vec!["High temperature warning: 36°C", "High wind warning: 25 km/h"]
        );
        assert_eq!(alerts[0].family, AlertFamily::Temperature);
        assert_eq!(alerts[1].family, AlertFamily::Wind);
    }

    #[test]
    fn test_light_rain() {
        let alerts = evaluate(&reading(20.0, 5.0, "light rain", UnitSystem::Metric));
        assert_eq!(messages(&alerts), vec!["Rain alert: Precipitation expected"]);
    }

    #[test]
    fn test_rain_wins_over_snow() {
        let alerts = evaluate(&reading(1.0, 0.0, "Rain and snow", UnitSystem::Metric));
        assert_eq!(messages(&alerts), vec!["Rain alert: Precipitation expected"]);
    }

    #[test]
    fn test_snow_with_low_temperature() {
        let alerts = evaluate(&reading(-4.4, 3.0, "Snow", UnitSystem::Metric));
        assert_eq!(
            messages(&alerts),
            vec!["Low temperature warning: -4°C", "Snow alert: Snowfall expected"]
        );
    }

    #[test]
    fn test_imperial_thresholds() {
        // 90°F would be a heat alert if read as Celsius
        assert!(evaluate(&reading(90.0, 10.0, "Clear", UnitSystem::Imperial)).is_empty());

        let alerts = evaluate(&reading(96.4, 13.0, "Clear", UnitSystem::Imperial));
        assert_eq!(
            messages(&alerts),
            vec!["High temperature warning: 96°F", "High wind warning: 13 mph"]
        );

        let alerts = evaluate(&reading(31.0, 0.0, "Clouds", UnitSystem::Imperial));
        assert_eq!(messages(&alerts), vec!["Low temperature warning: 31°F"]);
    }

    #[test]
    fn test_thresholds_are_strict() {
        assert!(evaluate(&reading(35.0, 20.0, "Clear", UnitSystem::Metric)).is_empty());
        assert!(evaluate(&reading(0.0, 0.0, "Clear", UnitSystem::Metric)).is_empty());
        assert!(evaluate(&reading(32.0, 12.5, "Clear", UnitSystem::Imperial)).is_empty());
    }

    #[test]
    fn test_stable_across_calls() {
        let r = reading(40.0, 30.0, "Thunderstorm with rain", UnitSystem::Metric);
        assert_eq!(evaluate(&r), evaluate(&r));
        assert_eq!(evaluate(&r).len(), 3);
    }

    #[test]
    fn test_round_display_half_up() {
        assert_eq!(round_display(35.5), 36);
        assert_eq!(round_display(-0.5), 0);
        assert_eq!(round_display(-4.5), -4);
        assert_eq!(round_display(-0.2), 0);
    }
}
