//! Entry point for the parrot API and web services.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use parrot_stack::api::{create_router, with_metrics, AppState, API_PREFIX};
use parrot_stack::config::Config;
use parrot_stack::error::ServiceError;
use parrot_stack::metrics;
use parrot_stack::ratelimit::{spawn_sweeper, TieredRateLimiter};
use parrot_stack::utils::shutdown_signal;
use parrot_stack::web::{self, WebState};

/// Echo API and web health services.
#[derive(Parser, Debug)]
#[command(name = "parrot-stack")]
#[command(about = "Echo API with tiered rate limiting, plus a web health service")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the API service (default).
    Api {
        /// Listen port, overrides PORT.
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run the web service.
    Web {
        /// Listen port, overrides WEB_PORT.
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check configuration validity.
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Load configuration before logging so LOG_FORMAT applies
    let loaded = Config::load();
    init_logging(args.verbose, loaded.as_ref().ok());

    let mut config = loaded.map_err(|e| {
        error!("Failed to load configuration: {}", e);
        ServiceError::from(e)
    })?;

    match args.command.unwrap_or(Command::Api { port: None }) {
        Command::Api { port } => {
            if let Some(port) = port {
                config.port = port;
            }
            cmd_api(config).await
        }
        Command::Web { port } => {
            if let Some(port) = port {
                config.web_port = port;
            }
            cmd_web(config).await
        }
        Command::CheckConfig => cmd_check_config(&config),
    }
}

fn init_logging(verbose: bool, config: Option<&Config>) {
    let filter = if verbose {
        EnvFilter::new("parrot_stack=debug,tower_http=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(config.map(|c| c.rust_log.as_str()).unwrap_or("info"))
        })
    };

    let json = config.is_some_and(Config::json_logs);
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

fn validate(config: &Config) -> Result<(), ServiceError> {
    config.validate().map_err(|e| {
        error!("Invalid configuration: {}", e);
        ServiceError::InvalidConfig(e)
    })
}

fn bind_addr(host: &str, port: u16) -> Result<SocketAddr, ServiceError> {
    host.parse::<IpAddr>()
        .map(|ip| SocketAddr::new(ip, port))
        .map_err(|e| ServiceError::BindAddress {
            addr: format!("{}:{}", host, port),
            reason: e.to_string(),
        })
}

/// Run the API service.
async fn cmd_api(config: Config) -> anyhow::Result<()> {
    validate(&config)?;

    let limiter = Arc::new(TieredRateLimiter::with_defaults());
    for tier in limiter.tiers() {
        info!(
            tier = %tier.name,
            window_secs = tier.window.as_secs(),
            limit = tier.limit,
            "Rate limit tier"
        );
    }
    if !config.rate_limit_health {
        warn!("Health routes are exempt from rate limiting");
    }

    let sweeper = spawn_sweeper(limiter.clone(), config.sweep_interval());

    let mut router = create_router(AppState::from_config(&config, limiter));
    if config.metrics_enabled {
        let handle = metrics::init_metrics()?;
        router = with_metrics(router, handle);
        info!("Metrics exposed on /metrics");
    }

    let addr = bind_addr(&config.host, config.port)?;
    let listener = TcpListener::bind(addr).await?;
    info!(
        address = %addr,
        prefix = API_PREFIX,
        origins = ?config.cors_origins(),
        "API service listening"
    );

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    sweeper.abort();
    info!("API service stopped");
    Ok(())
}

/// Run the web service.
async fn cmd_web(config: Config) -> anyhow::Result<()> {
    validate(&config)?;

    let router = web::create_router(WebState::from_config(&config));

    let addr = bind_addr(&config.host, config.web_port)?;
    let listener = TcpListener::bind(addr).await?;
    info!(
        address = %addr,
        environment = %config.app_env,
        "Web service listening"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Web service stopped");
    Ok(())
}

/// Check configuration validity.
fn cmd_check_config(config: &Config) -> anyhow::Result<()> {
    println!("======================================================================");
    println!("PARROT STACK - CONFIGURATION CHECK");
    println!("======================================================================");

    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    print!("Checking bind addresses... ");
    bind_addr(&config.host, config.port)?;
    bind_addr(&config.host, config.web_port)?;
    println!("OK");

    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  API: {}:{}{}", config.host, config.port, API_PREFIX);
    println!("  Web: {}:{}{}", config.host, config.web_port, web::HEALTH_PATH);
    println!("  Environment: {}", config.app_env);
    println!("  CORS Origins: {}", config.cors_origins().join(", "));
    println!("  Body Limit: {} bytes", config.body_limit_bytes);
    println!("  Trust X-Forwarded-For: {}", config.trust_forwarded_for);
    println!("  Rate Limit Health Routes: {}", config.rate_limit_health);
    println!("  Metrics: {}", if config.metrics_enabled { "Enabled" } else { "Disabled" });
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}
