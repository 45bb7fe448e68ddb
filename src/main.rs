use aquasense::cli::commands::{CliArgs, Commands};
use aquasense::cli::handlers::{
    handle_alerts, handle_chat, handle_config, handle_health, handle_history, handle_predict,
    handle_show,
};
use aquasense::util::logging::{self, LoggingConfig};
use aquasense::{AquasenseConfig, VERSION};

use clap::Parser;
use tracing::{debug, Level};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    logging::init_logging(logging_config(&args));

    debug!("aquasense v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let config = AquasenseConfig::default();
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(2);
    }
    debug!("Configuration: {:?}", config);

    let exit_code = match &args.command {
        Commands::Predict(a) => handle_predict(a, &config).await,
        Commands::History(a) => handle_history(a, &config).await,
        Commands::Show(a) => handle_show(a, &config).await,
        Commands::Chat(a) => handle_chat(a, &config).await,
        Commands::Alerts(a) => handle_alerts(a, &config).await,
        Commands::Health(a) => handle_health(a, &config).await,
        Commands::Config(a) => handle_config(a, &config).await,
    };

    std::process::exit(exit_code);
}

fn logging_config(args: &CliArgs) -> LoggingConfig {
    let mut config = LoggingConfig::from_env();
    if let Some(level) = &args.log_level {
        config.level = logging::parse_level(level);
    } else if args.verbose {
        config.level = Level::DEBUG;
    } else if args.quiet {
        config.level = Level::ERROR;
    }
    config
}
