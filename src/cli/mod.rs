pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{
    AlertsArgs, ChatArgs, CliArgs, Commands, ConfigArgs, HealthArgs, HistoryArgs, PredictArgs,
    ShowArgs,
};
pub use output::{HealthStatus, OutputFormat, OutputFormatter};
