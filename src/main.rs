use omnifocus_mcp::cli::{Cli, Commands, Transport};
use omnifocus_mcp::config::BridgeConfig;
use omnifocus_mcp::logging::init_logger;
use omnifocus_mcp::mcp::OmniFocusMcpServer;
use omnifocus_mcp::omnifocus::OmniFocusClient;
use std::process::ExitCode;
use std::sync::Arc;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();

    if let Err(err) = init_logger(cli.log_level.as_deref(), cli.log_file.clone()) {
        eprintln!("Failed to initialize logging: {err}");
        return ExitCode::from(1);
    }

    match main_impl(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(1)
        }
    }
}

async fn main_impl(cli: Cli) -> Result<ExitCode, String> {
    let config = BridgeConfig::load(cli.config.as_deref()).map_err(|e| format!("{e:#}"))?;

    match cli.command() {
        Commands::Serve { transport } => handle_serve(config, transport).await,
        Commands::Check => handle_check(config).await,
        Commands::Config => handle_config(&config),
    }
}

async fn handle_serve(config: BridgeConfig, transport: Transport) -> Result<ExitCode, String> {
    tracing::debug!(?transport, timeout_ms = config.executor.timeout_ms, "MCP serve starting");
    let client = Arc::new(OmniFocusClient::from_config(&config));
    let server = OmniFocusMcpServer::new(client);

    match transport {
        Transport::Stdio => match server.run().await {
            Ok(()) => {
                tracing::info!("MCP server stopped gracefully");
                Ok(ExitCode::from(0))
            }
            Err(e) => Err(format!("MCP server error: {e}")),
        },
    }
}

async fn handle_check(config: BridgeConfig) -> Result<ExitCode, String> {
    let client = OmniFocusClient::from_config(&config);
    match client.get_database_summary().await {
        Ok(summary) => {
            let text = serde_json::to_string_pretty(&summary)
                .map_err(|e| format!("Failed to render summary: {e}"))?;
            println!("{text}");
            Ok(ExitCode::from(0))
        }
        Err(err) => {
            eprintln!("{}", err.user_message());
            Ok(ExitCode::from(1))
        }
    }
}

fn handle_config(config: &BridgeConfig) -> Result<ExitCode, String> {
    let text = config.to_toml().map_err(|e| format!("{e:#}"))?;
    print!("{text}");
    Ok(ExitCode::from(0))
}
