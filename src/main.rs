use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::{info, warn};
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use memory_gateway::config::{Config, Transport};
use memory_gateway::tools::{Surface, Tool, ToolCatalog, ToolGateway};
use memory_gateway::mcp::serve_http;
use memory_gateway::{HttpBackend, McpServer};

mod cli;

use cli::Cli;
use cli::commands::Commands;

fn setup_logging(level: &str) -> Result<()> {
    // stdout carries MCP traffic, so logs go to a file
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("memory-gateway")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("memory-gateway.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn parse_surface(value: Option<&str>, fallback: Surface) -> Result<Surface> {
    match value {
        Some(s) => s.parse().map_err(|e: String| eyre::eyre!(e)),
        None => Ok(fallback),
    }
}

fn build_gateway(
    config: &Config,
    surface: Surface,
    session_id: Option<String>,
    backend: Arc<HttpBackend>,
) -> Result<ToolGateway> {
    let gateway = ToolGateway::new(ToolCatalog::for_surface(surface), backend)
        .context("Tool catalog failed validation")?
        .with_session_id(session_id.or_else(|| config.server.session_id.clone()));
    Ok(gateway)
}

fn build_server(config: &Config, surface: Surface, session_id: Option<String>, backend: Arc<HttpBackend>) -> Result<McpServer> {
    let mut server = McpServer::new(build_gateway(config, surface, session_id, backend)?);
    if let Some(name) = &config.server.name {
        server = server.with_name(name.clone());
    }
    Ok(server)
}

async fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    match &cli.command {
        None => handle_serve_command(None, None, config).await,
        Some(Commands::Serve {
            surface,
            session_id,
            transport,
            host,
            port,
            admin_port,
            path,
        }) => {
            let mut config = config.clone();
            if let Some(transport) = transport {
                config.server.transport = transport.parse().map_err(|e: String| eyre::eyre!(e))?;
            }
            let http = &mut config.server.http;
            if let Some(host) = host {
                http.host = host.clone();
            }
            if let Some(port) = port {
                http.port = *port;
            }
            if let Some(admin_port) = admin_port {
                http.admin_port = *admin_port;
            }
            if let Some(path) = path {
                http.path = path.clone();
            }
            handle_serve_command(surface.as_deref(), session_id.clone(), &config).await
        }
        Some(Commands::Tools { surface }) => handle_tools_command(surface.as_deref(), config),
        Some(Commands::Call { tool, args, session_id }) => {
            handle_call_command(tool, args.as_deref(), session_id.clone(), config).await
        }
    }
}

async fn handle_serve_command(surface: Option<&str>, session_id: Option<String>, config: &Config) -> Result<()> {
    let surface = parse_surface(surface, config.server.surface)?;
    let transport = config.server.transport;
    info!(
        "Serving {} surface over {} against {}",
        surface, transport, config.backend.base_url
    );

    let backend = Arc::new(HttpBackend::new(config.backend.clone()));
    let result = match transport {
        Transport::Stdio => {
            build_server(config, surface, session_id, backend.clone())?
                .serve_stdio()
                .await
        }
        Transport::Http => {
            let http = &config.server.http;
            let path = http.mount_path();
            match surface {
                // one listener per surface, sharing the backend connection
                Surface::All => {
                    let user = build_server(config, Surface::User, session_id.clone(), backend.clone())?;
                    let admin = build_server(config, Surface::Admin, session_id, backend.clone())?;
                    tokio::try_join!(
                        serve_http(user, &http.host, http.port_for(Surface::User), &path),
                        serve_http(admin, &http.host, http.port_for(Surface::Admin), &path),
                    )
                    .map(|_| ())
                }
                single => {
                    let server = build_server(config, single, session_id, backend.clone())?;
                    serve_http(server, &http.host, http.port_for(single), &path).await
                }
            }
        }
    };
    backend.close().await;
    result.context("MCP server failed")
}

fn contract_label(tool: &Tool) -> ColoredString {
    let label = tool.contract.label();
    match label {
        "read-only" => label.green(),
        "idempotent" => label.cyan(),
        "destructive" => label.red().bold(),
        _ => label.yellow(),
    }
}

fn handle_tools_command(surface: Option<&str>, config: &Config) -> Result<()> {
    let surface = parse_surface(surface, config.server.surface)?;
    let catalog = ToolCatalog::for_surface(surface);
    catalog.validate().context("Tool catalog failed validation")?;

    println!("{} ({} tools)", format!("Surface: {}", surface).bold(), catalog.len());
    for tool in catalog.all() {
        println!(
            "  {:<28} {:<12} {}",
            tool.name.cyan(),
            contract_label(tool),
            tool.route.to_string().dimmed()
        );
        println!("      {}", tool.description);
    }
    Ok(())
}

async fn handle_call_command(tool: &str, args: Option<&str>, session_id: Option<String>, config: &Config) -> Result<()> {
    let arguments: Value = match args {
        Some(text) => serde_json::from_str(text).context("--args must be a JSON object")?,
        None => Value::Object(Default::default()),
    };

    let backend = Arc::new(HttpBackend::new(config.backend.clone()));
    let gateway = build_gateway(config, Surface::All, session_id, backend.clone())?;
    info!("Calling {} with {}", tool, arguments);

    let result = gateway.call(tool, &arguments).await;
    backend.close().await;

    match result {
        Ok(text) => {
            println!("{}", text);
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {}", "Error:".red(), e.tool_message());
            Err(e).context(format!("Tool {} failed", tool))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let loaded = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    let config = loaded.config;

    let level = if cli.is_verbose() {
        "debug".to_string()
    } else {
        config.log_level.clone().unwrap_or_else(|| "info".to_string())
    };
    setup_logging(&level).context("Failed to setup logging")?;

    match &loaded.source {
        Some(path) => info!("Loaded config from {}", path.display()),
        None => info!("No config file found, using defaults"),
    }
    for warning in &loaded.warnings {
        warn!("{}", warning);
    }

    run_application(&cli, &config).await.context("Application failed")?;

    Ok(())
}
