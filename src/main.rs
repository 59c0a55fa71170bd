use color_eyre::eyre::Result;
use tap_me::{
    app,
    config::{
        self,
        CliCommand,
    },
    telemetry,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let app_config = match config::parse_cli_args(std::env::args().skip(1))? {
        CliCommand::Run(app_config) => app_config,
        CliCommand::Help => {
            println!("{}", config::USAGE);
            return Ok(());
        }
    };
    let _log_guard = telemetry::init_tracing(&app_config.log_dir)?;
    tracing::info!("starting tap-me client");
    app::run_app(app_config).await
}
