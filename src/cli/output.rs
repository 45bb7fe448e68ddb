//! Output formatting for multiple formats
//!
//! Every command result can be rendered as JSON, YAML, or human-readable
//! text. JSON output uses the same wire shapes the library serializes.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::analysis::schema::{Advisory, Leaf, StructuredAnalysis};
use crate::analysis::{AnalysisSummary, FinalResult};
use crate::chat::ChatReply;
use crate::config::AquasenseConfig;
use crate::telemetry::{Alert, AlertLevel};

const RULE: &str = "\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
    Human,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_result(&self, result: &FinalResult) -> Result<String> {
        match self.format {
            OutputFormat::Human => Ok(human_result(result)),
            _ => self.serialize(result, "analysis result"),
        }
    }

    pub fn format_history(&self, history: &[AnalysisSummary]) -> Result<String> {
        match self.format {
            OutputFormat::Human => Ok(human_history(history)),
            _ => self.serialize(&history, "analysis history"),
        }
    }

    pub fn format_chat(&self, reply: &ChatReply) -> Result<String> {
        match self.format {
            OutputFormat::Human => Ok(format!("{}\n\n(session {})\n", reply.message.content, reply.session_id)),
            _ => self.serialize(reply, "chat reply"),
        }
    }

    pub fn format_alerts(&self, alerts: &[Alert]) -> Result<String> {
        match self.format {
            OutputFormat::Human => Ok(human_alerts(alerts)),
            _ => self.serialize(
                &serde_json::json!({ "alerts": alerts, "total_alerts": alerts.len() }),
                "alerts",
            ),
        }
    }

    pub fn format_health(&self, health: &BTreeMap<String, HealthStatus>) -> Result<String> {
        match self.format {
            OutputFormat::Human => Ok(human_health(health)),
            _ => self.serialize(health, "health status"),
        }
    }

    pub fn format_config(&self, config: &AquasenseConfig) -> Result<String> {
        match self.format {
            OutputFormat::Human => Ok(config.to_string()),
            _ => {
                // Sorted keys keep the output stable between runs
                let map: BTreeMap<_, _> = config.to_display_map().into_iter().collect();
                self.serialize(&map, "configuration")
            }
        }
    }

    fn serialize<T: Serialize + ?Sized>(&self, value: &T, what: &str) -> Result<String> {
        match self.format {
            OutputFormat::Yaml => serde_yaml::to_string(value)
                .with_context(|| format!("Failed to serialize {} to YAML", what)),
            _ => serde_json::to_string_pretty(value)
                .with_context(|| format!("Failed to serialize {} to JSON", what)),
        }
    }
}

fn text(value: &Option<Leaf>) -> String {
    match value {
        Some(leaf) if !leaf.value().is_null() => leaf.to_string(),
        _ => "Unknown".to_string(),
    }
}

fn push_advisory(output: &mut String, heading: &str, advisory: &Option<Advisory>) {
    if let Some(advisory) = advisory {
        output.push_str(&format!("{}:\n", heading));
        output.push_str(&format!("\u{251C}\u{2500} {}\n", text(&advisory.title)));
        output.push_str(&format!("\u{2514}\u{2500} {}\n\n", text(&advisory.action)));
    }
}

fn push_analysis(output: &mut String, analysis: &StructuredAnalysis) {
    if let Some(health) = &analysis.goldfish_health {
        output.push_str("Goldfish Health:\n");
        if let Some(trend) = &health.ph_trend {
            output.push_str(&format!(
                "\u{251C}\u{2500} pH (30d):     {}  \u{2192} {}\n",
                text(&trend.next_30d),
                text(&trend.action)
            ));
        }
        if let Some(risk) = &health.ammonia_risk {
            output.push_str(&format!(
                "\u{2514}\u{2500} Ammonia risk: {} (peak {})\n",
                text(&risk.probability),
                text(&risk.peak_day)
            ));
        }
        output.push('\n');
    }

    if let Some(growth) = &analysis.spearmint_growth {
        output.push_str("Spearmint Growth:\n");
        if let Some(harvest) = &growth.harvest_readiness {
            output.push_str(&format!(
                "\u{251C}\u{2500} Harvest:      {}\n",
                text(&harvest.optimal_date)
            ));
        }
        if let Some(deficit) = &growth.nutrient_deficit {
            output.push_str(&format!(
                "\u{2514}\u{2500} Nitrogen:     {}  \u{2192} {}\n",
                text(&deficit.nitrogen),
                text(&deficit.fix)
            ));
        }
        output.push('\n');
    }

    if let Some(risks) = analysis.system_risk.as_ref().filter(|r| !r.is_empty()) {
        output.push_str("System Risks:\n");
        for (i, (name, risk)) in risks.iter().enumerate() {
            let connector = if i == risks.len() - 1 { "\u{2514}" } else { "\u{251C}" };
            output.push_str(&format!(
                "{}\u{2500} {} [{}]: {}\n",
                connector,
                name,
                text(&risk.severity),
                text(&risk.impact)
            ));
        }
        output.push('\n');
    }

    push_advisory(output, "Urgent", &analysis.urgent);
    push_advisory(output, "Watch", &analysis.watch);
}

fn human_result(result: &FinalResult) -> String {
    let mut output = String::new();

    if result.is_degraded() {
        output.push_str("\u{26A0} Aquaponics Analysis (Degraded)\n");
    } else {
        output.push_str("\u{2713} Aquaponics Analysis\n");
    }
    output.push_str(RULE);
    output.push_str("\n\n");

    output.push_str(&format!("ID:     {}\n", result.id()));
    output.push_str(&format!("Model:  {}\n", result.model_used()));
    output.push_str(&format!("Time:   {}\n\n", result.timestamp().to_rfc3339()));

    push_analysis(&mut output, result.results());

    let confidence = result.confidence_score();
    let filled = ((confidence * 10.0) as usize).min(10);
    let bar = "\u{2588}".repeat(filled) + &"\u{2591}".repeat(10 - filled);
    output.push_str(&format!(
        "Confidence: {} {}%\n",
        bar,
        (confidence * 100.0).round() as u8
    ));

    let results = result.results();
    if results.error.is_some() || results.validation_error.is_some() {
        output.push_str("\n\u{26A0} Warnings:\n");
        if let Some(error) = &results.error {
            output.push_str(&format!("  - {}\n", error));
        }
        if let Some(error) = &results.validation_error {
            output.push_str(&format!("  - validation: {}\n", error));
        }
    }

    output
}

fn human_history(history: &[AnalysisSummary]) -> String {
    if history.is_empty() {
        return "No stored analyses\n".to_string();
    }

    let mut output = String::new();
    output.push_str("Analysis History\n");
    output.push_str(RULE);
    output.push_str("\n\n");
    for entry in history {
        output.push_str(&format!(
            "{}  {}  {:<22} {:.2}\n",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.id,
            entry.model_used,
            entry.confidence_score
        ));
    }
    output
}

fn human_alerts(alerts: &[Alert]) -> String {
    if alerts.is_empty() {
        return "\u{2713} All parameters within operating ranges\n".to_string();
    }

    let mut output = String::new();
    for alert in alerts {
        let symbol = match alert.level {
            AlertLevel::Critical => "\u{2717}",
            AlertLevel::Warning => "\u{26A0}",
        };
        output.push_str(&format!("{} [{}] {}\n", symbol, alert.component, alert.message));
    }
    output.push_str(&format!("\n{} alert(s)\n", alerts.len()));
    output
}

fn human_health(health: &BTreeMap<String, HealthStatus>) -> String {
    let mut output = String::new();
    output.push_str("Provider Health Status\n");
    output.push_str(RULE);
    output.push_str("\n\n");

    for (name, status) in health {
        let symbol = if status.available { "\u{2713}" } else { "\u{2717}" };
        output.push_str(&format!("{} {}\n", symbol, name));
        output.push_str(&format!(
            "  Status: {}\n",
            if status.available { "Configured" } else { "Unconfigured" }
        ));
        output.push_str(&format!("  Message: {}\n", status.message));
        if let Some(details) = &status.details {
            output.push_str(&format!("  Details: {}\n", details));
        }
        output.push('\n');
    }

    output
}

/// Configuration status of one provider
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HealthStatus {
    pub available: bool,
    pub message: String,
    pub details: Option<String>,
}

impl HealthStatus {
    pub fn available(message: String) -> Self {
        Self {
            available: true,
            message,
            details: None,
        }
    }

    pub fn unavailable(message: String) -> Self {
        Self {
            available: false,
            message,
            details: None,
        }
    }

    pub fn with_details(mut self, details: String) -> Self {
        self.details = Some(details);
        self
    }
}
