//! Operating ranges for the goldfish/spearmint system

use crate::analysis::TelemetryWindow;
use serde::Serialize;

/// Healthy band for one measured parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OperatingRange {
    pub parameter: &'static str,
    pub label: &'static str,
    /// `None` for parameters with only a ceiling
    pub min: Option<f64>,
    pub max: f64,
    pub unit: &'static str,
    /// Human-readable limit, e.g. `1.2-2.0 mS/cm`
    pub limit: &'static str,
}

impl OperatingRange {
    pub fn contains(&self, value: f64) -> bool {
        self.min.map_or(true, |min| value >= min) && value <= self.max
    }
}

pub const PH: OperatingRange = OperatingRange {
    parameter: "pH",
    label: "pH",
    min: Some(6.5),
    max: 7.5,
    unit: "",
    limit: "6.5-7.5",
};

pub const TEMPERATURE: OperatingRange = OperatingRange {
    parameter: "temperature",
    label: "Temperature",
    min: Some(18.0),
    max: 24.0,
    unit: "°C",
    limit: "18-24°C",
};

pub const AMMONIA: OperatingRange = OperatingRange {
    parameter: "ammonia",
    label: "Ammonia",
    min: None,
    max: 0.5,
    unit: "ppm",
    limit: "<0.5ppm",
};

pub const HEIGHT: OperatingRange = OperatingRange {
    parameter: "height",
    label: "Height",
    min: Some(20.0),
    max: 60.0,
    unit: "cm",
    limit: "20-60cm",
};

pub const GROWTH_RATE: OperatingRange = OperatingRange {
    parameter: "growth_rate",
    label: "Growth rate",
    min: Some(0.8),
    max: 1.5,
    unit: " cm/day",
    limit: "0.8-1.5 cm/day",
};

pub const EC: OperatingRange = OperatingRange {
    parameter: "ec",
    label: "EC",
    min: Some(1.2),
    max: 2.0,
    unit: " mS/cm",
    limit: "1.2-2.0 mS/cm",
};

pub const FISH: [OperatingRange; 3] = [PH, TEMPERATURE, AMMONIA];
pub const PLANT: [OperatingRange; 3] = [HEIGHT, GROWTH_RATE, EC];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    #[serde(rename = "type")]
    pub level: AlertLevel,
    pub parameter: &'static str,
    pub component: &'static str,
    pub message: String,
}

fn out_of_range(range: &OperatingRange, component: &'static str, value: f64) -> Option<Alert> {
    if range.contains(value) {
        return None;
    }

    let (level, message) = if range.min.is_none() {
        (
            AlertLevel::Critical,
            format!(
                "{} level ({}{}) is above safe limit ({}{})",
                range.label, value, range.unit, range.max, range.unit
            ),
        )
    } else {
        let subject = if range.parameter == "pH" {
            "pH level".to_string()
        } else {
            range.label.to_string()
        };
        (
            AlertLevel::Warning,
            format!(
                "{} ({}{}) is outside optimal range ({})",
                subject, value, range.unit, range.limit
            ),
        )
    };

    Some(Alert {
        level,
        parameter: range.parameter,
        component,
        message,
    })
}

/// Alerts for the most recent fish and plant readings in `window`.
///
/// Plant height is tracked as a range but not alerted on; it changes too
/// slowly for a single reading to be actionable.
pub fn alerts(window: &TelemetryWindow) -> Vec<Alert> {
    let mut alerts = Vec::new();

    if let Some(fish) = window.fish().last() {
        for (range, value) in [(PH, fish.ph), (TEMPERATURE, fish.temperature), (AMMONIA, fish.ammonia)] {
            alerts.extend(out_of_range(&range, "fish", value));
        }
    }

    if let Some(plant) = window.plant().last() {
        for (range, value) in [(EC, plant.ec), (GROWTH_RATE, plant.growth_rate)] {
            alerts.extend(out_of_range(&range, "plant", value));
        }
    }

    alerts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{FishReading, PlantReading};
    use yare::parameterized;

    #[parameterized(
        ph_low = { PH, 6.4, false },
        ph_edge = { PH, 6.5, true },
        ph_high = { PH, 7.6, false },
        ammonia_zero = { AMMONIA, 0.0, true },
        ammonia_high = { AMMONIA, 0.51, false },
        ec_ok = { EC, 1.5, true },
        temp_hot = { TEMPERATURE, 26.0, false },
    )]
    fn test_contains(range: OperatingRange, value: f64, expected: bool) {
        assert_eq!(range.contains(value), expected);
    }

    #[test]
    fn test_alerts_use_latest_reading() {
        let window = TelemetryWindow::new(
            vec![
                FishReading {
                    timestamp: "2024-06-01".to_string(),
                    ph: 5.0,
                    temperature: 22.0,
                    ammonia: 0.1,
                },
                FishReading {
                    timestamp: "2024-06-02".to_string(),
                    ph: 6.2,
                    temperature: 22.0,
                    ammonia: 0.7,
                },
            ],
            vec![PlantReading {
                timestamp: "2024-06-02".to_string(),
                height: 80.0,
                growth_rate: 1.0,
                ec: 2.4,
            }],
        );

        let alerts = alerts(&window);
        let messages: Vec<&str> = alerts.iter().map(|a| a.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "pH level (6.2) is outside optimal range (6.5-7.5)",
                "Ammonia level (0.7ppm) is above safe limit (0.5ppm)",
                "EC (2.4 mS/cm) is outside optimal range (1.2-2.0 mS/cm)",
            ]
        );
        assert_eq!(alerts[1].level, AlertLevel::Critical);
        assert_eq!(alerts[2].component, "plant");
    }

    #[test]
    fn test_empty_window_has_no_alerts() {
        assert!(alerts(&TelemetryWindow::default()).is_empty());
    }
}
