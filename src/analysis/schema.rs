//! Canonical structured analysis shape
//!
//! Every key is optional because providers routinely omit some of them. Each
//! section is parsed on its own: a section whose shape does not fit stays in
//! `extra` untouched, and keys we do not model are kept there too, so a
//! canonical object survives a parse/serialize cycle unchanged.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Top-level keys that identify a canonical analysis object
pub const CANONICAL_KEYS: &[&str] = &[
    "Goldfish_Health",
    "Spearmint_Growth",
    "System_Risk",
    "urgent",
    "watch",
];

/// A leaf value exactly as the provider sent it.
///
/// Usually text, but models also answer `"probability": 0.68`; the value is
/// kept as-is and only rendered as text for display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Leaf(Value);

impl Leaf {
    pub fn as_str(&self) -> Option<&str> {
        self.0.as_str()
    }

    pub fn value(&self) -> &Value {
        &self.0
    }
}

impl From<&str> for Leaf {
    fn from(text: &str) -> Self {
        Leaf(Value::String(text.to_string()))
    }
}

impl From<Value> for Leaf {
    fn from(value: Value) -> Self {
        Leaf(value)
    }
}

impl fmt::Display for Leaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Value::String(s) => f.write_str(s),
            Value::Null => Ok(()),
            other => write!(f, "{}", other),
        }
    }
}

/// Text of an optional leaf, when it is a string
pub fn leaf_str(leaf: &Option<Leaf>) -> Option<&str> {
    leaf.as_ref().and_then(Leaf::as_str)
}

fn leaf(text: &str) -> Option<Leaf> {
    Some(Leaf::from(text))
}

/// Keeps an explicit `null` as `Some(Leaf(Null))` so it is written back
fn present<'de, D>(deserializer: D) -> Result<Option<Leaf>, D::Error>
where
    D: Deserializer<'de>,
{
    Leaf::deserialize(deserializer).map(Some)
}

/// Removes `key` from `map` when it parses as `T`; otherwise leaves it in place
fn take_section<T: DeserializeOwned>(map: &mut Map<String, Value>, key: &str) -> Option<T> {
    let value = map.get(key)?;
    match T::deserialize(value) {
        Ok(section) => {
            map.remove(key);
            Some(section)
        }
        Err(e) => {
            debug!("Keeping {} as an unmodelled key: {}", key, e);
            None
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StructuredAnalysis {
    #[serde(rename = "Goldfish_Health", skip_serializing_if = "Option::is_none")]
    pub goldfish_health: Option<GoldfishHealth>,

    #[serde(rename = "Spearmint_Growth", skip_serializing_if = "Option::is_none")]
    pub spearmint_growth: Option<SpearmintGrowth>,

    #[serde(rename = "System_Risk", skip_serializing_if = "Option::is_none")]
    pub system_risk: Option<BTreeMap<String, RiskAssessment>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub urgent: Option<Advisory>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub watch: Option<Advisory>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,

    /// Set only on degraded results
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Set when the validator stage failed and the primary result was kept
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_error: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl<'de> Deserialize<'de> for StructuredAnalysis {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut extra = Map::<String, Value>::deserialize(deserializer)?;
        Ok(Self {
            goldfish_health: take_section(&mut extra, "Goldfish_Health"),
            spearmint_growth: take_section(&mut extra, "Spearmint_Growth"),
            system_risk: take_section(&mut extra, "System_Risk"),
            urgent: take_section(&mut extra, "urgent"),
            watch: take_section(&mut extra, "watch"),
            confidence_score: take_section(&mut extra, "confidence_score"),
            error: take_section(&mut extra, "error"),
            validation_error: take_section(&mut extra, "validation_error"),
            extra,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GoldfishHealth {
    #[serde(rename = "pH_Trend", skip_serializing_if = "Option::is_none")]
    pub ph_trend: Option<PhTrend>,

    #[serde(rename = "Ammonia_Risk", skip_serializing_if = "Option::is_none")]
    pub ammonia_risk: Option<AmmoniaRisk>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl<'de> Deserialize<'de> for GoldfishHealth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut extra = Map::<String, Value>::deserialize(deserializer)?;
        Ok(Self {
            ph_trend: take_section(&mut extra, "pH_Trend"),
            ammonia_risk: take_section(&mut extra, "Ammonia_Risk"),
            extra,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SpearmintGrowth {
    #[serde(rename = "Harvest_Readiness", skip_serializing_if = "Option::is_none")]
    pub harvest_readiness: Option<HarvestReadiness>,

    #[serde(rename = "Nutrient_Deficit", skip_serializing_if = "Option::is_none")]
    pub nutrient_deficit: Option<NutrientDeficit>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl<'de> Deserialize<'de> for SpearmintGrowth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut extra = Map::<String, Value>::deserialize(deserializer)?;
        Ok(Self {
            harvest_readiness: take_section(&mut extra, "Harvest_Readiness"),
            nutrient_deficit: take_section(&mut extra, "Nutrient_Deficit"),
            extra,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhTrend {
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub next_30d: Option<Leaf>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub action: Option<Leaf>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PhTrend {
    pub fn new(next_30d: &str, action: &str) -> Self {
        Self {
            next_30d: leaf(next_30d),
            action: leaf(action),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AmmoniaRisk {
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub probability: Option<Leaf>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub peak_day: Option<Leaf>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AmmoniaRisk {
    pub fn new(probability: &str, peak_day: &str) -> Self {
        Self {
            probability: leaf(probability),
            peak_day: leaf(peak_day),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HarvestReadiness {
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub optimal_date: Option<Leaf>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl HarvestReadiness {
    pub fn new(optimal_date: &str) -> Self {
        Self {
            optimal_date: leaf(optimal_date),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NutrientDeficit {
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub nitrogen: Option<Leaf>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub fix: Option<Leaf>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NutrientDeficit {
    pub fn new(nitrogen: &str, fix: &str) -> Self {
        Self {
            nitrogen: leaf(nitrogen),
            fix: leaf(fix),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub severity: Option<Leaf>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub impact: Option<Leaf>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RiskAssessment {
    pub fn new(severity: &str, impact: &str) -> Self {
        Self {
            severity: leaf(severity),
            impact: leaf(impact),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Advisory {
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub title: Option<Leaf>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub action: Option<Leaf>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Advisory {
    pub fn new(title: &str, action: &str) -> Self {
        Self {
            title: leaf(title),
            action: leaf(action),
            extra: Map::new(),
        }
    }
}

impl StructuredAnalysis {
    /// Whether any canonical section parsed
    pub fn has_canonical_content(&self) -> bool {
        self.goldfish_health.is_some()
            || self.spearmint_growth.is_some()
            || self.system_risk.is_some()
            || self.urgent.is_some()
            || self.watch.is_some()
    }

    /// Whether this result carries a degradation annotation
    pub fn is_degraded(&self) -> bool {
        self.error.is_some() || self.validation_error.is_some()
    }

    /// Parses a JSON value, accepting it only if it is an object in which at
    /// least one canonical section has a usable shape
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        if !CANONICAL_KEYS.iter().any(|key| object.contains_key(*key)) {
            return None;
        }
        Self::deserialize(value)
            .ok()
            .filter(Self::has_canonical_content)
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
