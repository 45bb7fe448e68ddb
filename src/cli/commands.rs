use crate::analysis::ModelSelector;
use crate::telemetry::Period;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use uuid::Uuid;

/// Resilient AI analysis for aquaponics telemetry
#[derive(Parser, Debug)]
#[command(
    name = "aquasense",
    about = "Resilient AI analysis for aquaponics telemetry",
    version,
    author,
    long_about = "aquasense forecasts goldfish health and spearmint growth from telemetry \
                  using a two-stage AI pipeline (forecast, then validation). Provider outages, \
                  rate limits and unparseable replies degrade to deterministic fallback data, \
                  so every command produces a well-formed answer."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Analyze telemetry and print the result",
        long_about = "Loads initial.json and validation.json from the telemetry directory, \
                      runs the analysis pipeline and stores the result.\n\n\
                      Examples:\n  \
                      aquasense predict\n  \
                      aquasense predict --model primary --format json\n  \
                      aquasense predict --telemetry-dir ./datasets --no-save"
    )]
    Predict(PredictArgs),

    #[command(about = "List stored analyses, newest first")]
    History(HistoryArgs),

    #[command(about = "Print one stored analysis")]
    Show(ShowArgs),

    #[command(
        about = "Ask the aquaponics assistant a question",
        long_about = "Sends one chat turn. When the provider is rate limited, questions that \
                      mention pH, EC, ammonia or temperature are answered with the relevant \
                      operating ranges.\n\n\
                      Examples:\n  \
                      aquasense chat \"Is 0.7ppm ammonia dangerous?\""
    )]
    Chat(ChatArgs),

    #[command(about = "Check the latest readings against operating ranges")]
    Alerts(AlertsArgs),

    #[command(
        about = "Report which providers are configured",
        long_about = "Reports provider configuration without making any network calls."
    )]
    Health(HealthArgs),

    #[command(about = "Print the effective configuration")]
    Config(ConfigArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct PredictArgs {
    #[arg(
        long,
        value_name = "DIR",
        help = "Directory holding initial.json and validation.json (defaults to <data-dir>/telemetry)"
    )]
    pub telemetry_dir: Option<PathBuf>,

    #[arg(
        short = 'm',
        long,
        value_enum,
        default_value = "ensemble",
        help = "Which providers take part"
    )]
    pub model: ModelArg,

    #[arg(
        long,
        value_name = "JSON",
        help = "System configuration recorded with the result"
    )]
    pub system_config: Option<String>,

    #[arg(long, help = "Do not persist the result")]
    pub no_save: bool,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct HistoryArgs {
    #[arg(short = 'n', long, value_name = "N", help = "Show at most N entries")]
    pub limit: Option<usize>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct ShowArgs {
    #[arg(value_name = "ID", help = "Analysis id")]
    pub id: Uuid,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct ChatArgs {
    #[arg(value_name = "MESSAGE", help = "Question for the assistant")]
    pub message: String,

    #[arg(short = 's', long, value_name = "ID", help = "Session id to continue")]
    pub session: Option<String>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct AlertsArgs {
    #[arg(long, value_name = "DIR", help = "Telemetry directory (defaults to <data-dir>/telemetry)")]
    pub telemetry_dir: Option<PathBuf>,

    #[arg(
        short = 'p',
        long,
        value_enum,
        default_value = "validation",
        help = "Dataset whose latest readings are checked"
    )]
    pub period: PeriodArg,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct HealthArgs {
    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct ConfigArgs {
    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelArg {
    Primary,
    Validator,
    Ensemble,
}

impl From<ModelArg> for ModelSelector {
    fn from(arg: ModelArg) -> Self {
        match arg {
            ModelArg::Primary => ModelSelector::PrimaryOnly,
            ModelArg::Validator => ModelSelector::ValidatorOnly,
            ModelArg::Ensemble => ModelSelector::Ensemble,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodArg {
    Initial,
    Validation,
}

impl From<PeriodArg> for Period {
    fn from(arg: PeriodArg) -> Self {
        match arg {
            PeriodArg::Initial => Period::Initial,
            PeriodArg::Validation => Period::Validation,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}
