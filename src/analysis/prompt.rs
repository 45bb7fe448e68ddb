//! Prompt templates and user-message rendering
//!
//! Templates are opaque to the rest of the crate: they are sent as configured
//! and recorded with each result for traceability.

use super::schema::StructuredAnalysis;
use super::types::TelemetryWindow;

/// System prompt for the forecast stage
pub const PRIMARY_SYSTEM_PROMPT: &str = r#"You are an aquaponics expert analysing a goldfish and spearmint system. Forecast fish health and plant growth from the initial period and check your forecast against the validation period.

Operating ranges:
Goldfish: pH (6.5-7.5), Temperature (18-24°C), Ammonia (<0.5ppm)
Spearmint: Height (20-60cm), Growth Rate (0.8-1.5cm/day), EC (1.2-2.0 mS/cm)
Cross-dependencies: pH → Nutrient Absorption, Ammonia → Root Stress

Never recommend chemical pH adjusters (organic system only).

Respond with JSON only, in this format:
{
  "Goldfish_Health": {
    "pH_Trend": {"next_30d": "7.2 → 6.9", "action": "Add crushed coral by Thursday"},
    "Ammonia_Risk": {"probability": "68%", "peak_day": "2024-07-15"}
  },
  "Spearmint_Growth": {
    "Harvest_Readiness": {"optimal_date": "2024-08-20 ±3d"},
    "Nutrient_Deficit": {"nitrogen": "low", "fix": "Increase fish feeding 10%"}
  },
  "System_Risk": {
    "pH-EC_Imbalance": {"severity": "high", "impact": "Stunted spearmint + fish stress"}
  },
  "urgent": {"title": "Nighttime O2 Drop Predicted", "action": "Add air stone by 2024-07-12"},
  "watch": {"title": "Spearmint Pests Likely", "action": "Release ladybugs next Thursday"}
}"#;

/// System prompt for the validation stage
pub const VALIDATOR_SYSTEM_PROMPT: &str = r#"You are an aquaponics expert. I want you to forecast goldfish/spearmint interactions and optimize their symbiotic environment using initial data (Mar-May 2024). Validate predictions against Jun-Aug 2024 data.

Core Requirements
Data Input:
Goldfish Focus: pH (6.5-7.5), Temperature (18-24°C), Ammonia (<0.5ppm)
Spearmint Focus: Height (20-60cm), Growth Rate (0.8-1.5cm/day), EC (1.2-2.0 mS/cm)
Cross-Dependency Alert: pH → Nutrient Absorption, Ammonia → Root Stress

Warnings
Goldfish mortality risk if pH <6.5 persists >48hrs
Spearmint flavor degradation if EC >2.2 mS/cm
Never recommend chemical pH adjusters (organic system only)

Context
200 goldfish @ 22°C in 1000L tank
Spearmint grows in raft beds (pH-sensitive)
Current pain point: Spearmint leaves yellowing despite "good" pH
Past issue: Fish stress during July 2024 heatwave

Immediate Priorities
Every Tuesday: test dissolved oxygen before dawn, trim spearmint tips to stimulate growth.
When pH <6.8: add 500g crushed coral per 1000L, increase aeration by 30%.

Return Format: the same JSON object as the analysis you are validating, with "Goldfish_Health", "Spearmint_Growth", "System_Risk", "urgent" and "watch" sections and an added "confidence_score" between 0 and 1."#;

/// Instructions prepended to every chat turn
pub const CHAT_INSTRUCTIONS: &str = "Instructions for you: You are an aquaponics expert. Monitor these parameters:\n\
- Fish: pH (6.5-7.5), Temperature (18-24°C), Ammonia (<0.5ppm)\n\
- Spearmint: Height (20-60cm), Growth Rate (0.8-1.5cm/day), EC (1.2-2.0 mS/cm)\n\
- Track pH impact on nutrient absorption and ammonia's effect on root stress.";

/// Template text recorded for an ensemble run
pub fn ensemble_template(primary: &str, validator: &str) -> String {
    format!(
        "Ensemble model using both:\n\n1. Primary Prompt:\n{}\n\n2. Validator Prompt:\n{}",
        primary, validator
    )
}

pub struct PromptBuilder;

impl PromptBuilder {
    /// User message for the forecast stage
    pub fn primary_message(
        initial: &TelemetryWindow,
        validation: &TelemetryWindow,
    ) -> Result<String, serde_json::Error> {
        let mut message = String::from("Please analyze the following aquaponics telemetry data:\n");
        push_windows(&mut message, initial, validation)?;
        message.push_str(
            "\nBased on this data, please provide analysis and recommendations in the format specified.\n",
        );
        Ok(message)
    }

    /// User message for the validation stage, embedding the forecast under review
    pub fn validator_message(
        initial: &TelemetryWindow,
        validation: &TelemetryWindow,
        primary_result: &StructuredAnalysis,
    ) -> Result<String, serde_json::Error> {
        let mut message = String::from("Please validate the following aquaponics analysis results:\n");
        push_windows(&mut message, initial, validation)?;
        message.push_str("\nPRIMARY ANALYSIS RESULTS:\n");
        message.push_str(&serde_json::to_string_pretty(primary_result)?);
        message.push_str(
            "\n\nPlease validate these results, provide confidence scores, and enhance the \
             recommendations if needed. Return your response in the same format as the primary \
             results, but with any corrections or additions you deem necessary.\n",
        );
        Ok(message)
    }
}

fn push_windows(
    message: &mut String,
    initial: &TelemetryWindow,
    validation: &TelemetryWindow,
) -> Result<(), serde_json::Error> {
    for (label, window) in [("INITIAL DATA", initial), ("VALIDATION DATA", validation)] {
        message.push_str(&format!(
            "\n{}:\nFish Telemetry:\n{}\n\nPlant Telemetry:\n{}\n",
            label,
            serde_json::to_string_pretty(window.fish())?,
            serde_json::to_string_pretty(window.plant())?,
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::fallback::{FallbackCatalog, FallbackScenario};
    use crate::analysis::types::FishReading;

    fn window(ph: f64) -> TelemetryWindow {
        TelemetryWindow::new(
            vec![FishReading {
                timestamp: "2024-06-15".to_string(),
                ph,
                temperature: 23.5,
                ammonia: 0.45,
            }],
            vec![],
        )
    }

    #[test]
    fn test_primary_message_contains_both_windows() {
        let message = PromptBuilder::primary_message(&window(7.1), &window(6.7)).unwrap();
        assert!(message.contains("INITIAL DATA"));
        assert!(message.contains("VALIDATION DATA"));
        assert!(message.contains("7.1"));
        assert!(message.contains("6.7"));
        assert!(!message.contains("PRIMARY ANALYSIS RESULTS"));
    }

    #[test]
    fn test_validator_message_embeds_primary_result() {
        let primary = FallbackCatalog::get(&FallbackScenario::Primary);
        let message = PromptBuilder::validator_message(&window(7.1), &window(6.7), &primary).unwrap();
        assert!(message.contains("PRIMARY ANALYSIS RESULTS"));
        assert!(message.contains("Add crushed coral by Thursday"));
        assert!(message.contains("\"pH\": 6.7"));
    }

    #[test]
    fn test_ensemble_template_names_both_prompts() {
        let template = ensemble_template("P", "V");
        assert!(template.contains("1. Primary Prompt:\nP"));
        assert!(template.contains("2. Validator Prompt:\nV"));
    }
}
