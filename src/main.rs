//! imgproxy gateway - redirects originals and streams signed thumbnails.
//!
//! This binary parses configuration, then starts the HTTP server or runs one
//! of the operator subcommands.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use imgproxy_gateway::{
    config::{CheckConfig, Cli, Command, GatewayConfig, ServeConfig, SignConfig, SignOutputFormat},
    imgproxy::{parse_width, ImgproxyClient, ProcessingPath},
    server::{create_router, AppState, RouterConfig},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::Sign(config) => run_sign(config),
        Command::Check(config) => run_check(config).await,
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.verbose);

    // Configuration must be complete before anything is bound
    let gateway = match GatewayConfig::from_args(&config.gateway) {
        Ok(gateway) => gateway,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("imgproxy-gateway v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Object store prefix: {}", gateway.object_store_prefix);
    info!("  imgproxy URL: {}", gateway.imgproxy_url);
    info!("  Allowed widths: {:?}", gateway.allowed_widths.as_slice());
    info!("  Upstream timeout: {}s", gateway.upstream_timeout.as_secs());

    let state = match AppState::new(gateway) {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to create imgproxy client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let router = create_router(state, RouterConfig::default().with_tracing(!config.no_tracing));

    let addr = config.bind_address();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    info!("imgproxy-gateway listening on port {}", config.port);

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "imgproxy_gateway=debug,tower_http=debug"
    } else {
        "imgproxy_gateway=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

// =============================================================================
// Sign Command
// =============================================================================

fn run_sign(config: SignConfig) -> ExitCode {
    let gateway = match GatewayConfig::from_args(&config.gateway) {
        Ok(gateway) => gateway,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let width = match parse_width(&config.width).filter(|w| gateway.allowed_widths.contains(*w)) {
        Some(width) => width,
        None => {
            eprintln!("Error: Invalid width requested: {}", config.width);
            eprintln!("Allowed widths: {:?}", gateway.allowed_widths.as_slice());
            return ExitCode::FAILURE;
        }
    };

    let path = if config.path.starts_with('/') {
        config.path.clone()
    } else {
        format!("/{}", config.path)
    };

    let processing_path =
        ProcessingPath::thumbnail(&gateway.object_store_prefix, &path, width).to_string();
    let signature = match gateway.signer.sign(&processing_path) {
        Ok(signature) => signature,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let signed_path = format!("/{}{}", signature, processing_path);
    let url = format!("{}{}", gateway.imgproxy_url, signed_path);

    match config.format {
        SignOutputFormat::Signature => println!("{}", signature),
        SignOutputFormat::Path => println!("{}", signed_path),
        SignOutputFormat::Url => println!("{}", url),
        SignOutputFormat::Json => {
            let json = serde_json::json!({
                "signature": signature,
                "path": processing_path,
                "signed_path": signed_path,
                "url": url,
                "width": width,
            });
            match serde_json::to_string_pretty(&json) {
                Ok(text) => println!("{}", text),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return ExitCode::FAILURE;
                }
            }
        }
    }

    ExitCode::SUCCESS
}

// =============================================================================
// Check Command
// =============================================================================

async fn run_check(config: CheckConfig) -> ExitCode {
    if config.verbose {
        init_logging(true);
    }

    println!("imgproxy gateway configuration check");
    println!("════════════════════════════════════");
    println!();

    let gateway = match GatewayConfig::from_args(&config.gateway) {
        Ok(gateway) => gateway,
        Err(e) => {
            println!("✗ {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("✓ Key: {} bytes", gateway.signer.key().len());
    println!("✓ Salt: {} bytes", gateway.signer.salt().len());
    println!("✓ Allowed widths: {:?}", gateway.allowed_widths.as_slice());
    println!("✓ Object store prefix: {}", gateway.object_store_prefix);
    println!("✓ imgproxy URL: {}", gateway.imgproxy_url);

    if config.probe {
        println!();
        print!("Probing imgproxy... ");

        let client =
            match ImgproxyClient::new(gateway.imgproxy_url.clone(), gateway.upstream_timeout) {
                Ok(client) => client,
                Err(e) => {
                    println!("✗ failed");
                    println!("  Error: {}", e);
                    return ExitCode::FAILURE;
                }
            };

        match client.health().await {
            Ok(status) if status.is_success() => println!("✓ {}", status),
            Ok(status) => {
                println!("✗ {}", status);
                return ExitCode::FAILURE;
            }
            Err(e) => {
                println!("✗ failed");
                println!();
                println!("  Error: {}", e);
                println!("  Is imgproxy running at {}?", gateway.imgproxy_url);
                return ExitCode::FAILURE;
            }
        }
    }

    println!();
    println!("════════════════════════════════════");
    println!("✓ All checks passed!");

    ExitCode::SUCCESS
}
