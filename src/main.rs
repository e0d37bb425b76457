use std::{path::Path, sync::Arc, time::Duration};

use arbor::{
    adapters::{FileRouteSource, HttpHandler, build_app},
    config::{ServerConfigValidator, loader::load_config, models::ServerConfig},
    core::{DocGenerator, RouteNode, RouteTree, Router},
    demo, metrics,
    metrics::ReloadOutcome,
    ports::RouteSource,
    tracing_setup,
    utils::GracefulShutdown,
};
use arc_swap::ArcSwap;
use clap::Parser;
use color_eyre::{
    Result,
    eyre::{Context, eyre},
};
use tracing::Instrument;

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    #[clap(subcommand)]
    command: Option<Commands>,

    #[clap(short, long, default_value = "arbor.toml")]
    config: String,
}

#[derive(Parser, Debug)]
enum Commands {
    /// Start the API server (default)
    Serve {
        #[clap(short, long, default_value = "arbor.toml")]
        config: String,
    },
    /// Validate the configuration, the structure document and handler bindings
    Validate {
        #[clap(short, long, default_value = "arbor.toml")]
        config: String,
    },
    /// Print the OpenAPI description of the configured route tree
    Openapi {
        #[clap(short, long, default_value = "arbor.toml")]
        config: String,
    },
    /// Print every route tree node with its handler and dispatch methods
    Routes {
        #[clap(short, long, default_value = "arbor.toml")]
        config: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    match args.command {
        Some(Commands::Validate { config }) => validate_command(&config).await,
        Some(Commands::Openapi { config }) => openapi_command(&config).await,
        Some(Commands::Routes { config }) => routes_command(&config).await,
        Some(Commands::Serve { config }) => serve(&config).await,
        None => serve(&args.config).await,
    }
}

/// Load the config file, falling back to defaults when it does not exist.
async fn load_server_config(config_path: &str) -> Result<ServerConfig> {
    if Path::new(config_path).exists() {
        load_config(config_path)
            .await
            .with_context(|| format!("Failed to load config from {config_path}"))
    } else {
        Ok(ServerConfig::default())
    }
}

async fn build_router(source: &dyn RouteSource, config: &ServerConfig) -> Result<Router> {
    let structure = source.load_structure().await?;
    let tree = RouteTree::parse(&structure, &config.routes.namespace)
        .with_context(|| format!("Invalid structure document {}", source.describe()))?;
    let registry = demo::registry(&config.routes.namespace);
    Ok(Router::new(tree, &registry).with_info(config.docs.clone()))
}

async fn serve(config_path: &str) -> Result<()> {
    let config = load_server_config(config_path).await?;
    ServerConfigValidator::validate(&config).map_err(|e| eyre!("{e}"))?;

    tracing_setup::init_tracing(&config.logging)
        .map_err(|e| eyre!("Failed to initialize tracing: {}", e))?;
    metrics::init_metrics()?;

    let source: Arc<dyn RouteSource> = if config.routes.watch {
        Arc::new(FileRouteSource::watching(&config.routes.structure_path)?)
    } else {
        Arc::new(FileRouteSource::new(&config.routes.structure_path))
    };

    let router = build_router(source.as_ref(), &config).await?;
    tracing::info!(
        structure = %source.describe(),
        nodes = router.tree().len(),
        "Route tree loaded"
    );

    let router_slot = Arc::new(ArcSwap::from_pointee(router));
    let handler = HttpHandler::new(router_slot.clone(), config.http.max_body_bytes);

    if config.routes.watch {
        spawn_route_watcher(source.clone(), router_slot, config.clone())?;
    }

    let graceful_shutdown = GracefulShutdown::new();
    let signal_handler_shutdown = graceful_shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = signal_handler_shutdown.run_signal_handler().await {
            tracing::error!("Signal handler error: {}", e);
        }
    });

    let app = build_app(handler, &config.http);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.listen_addr))?;

    tracing::info!(addr = %config.listen_addr, "Arbor server starting");
    println!("Arbor listening on {}", config.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let reason = graceful_shutdown.wait_for_shutdown_signal().await;
            tracing::info!(?reason, "Draining in-flight requests");
        })
        .await
        .context("Server error")?;

    tracing::info!("Graceful shutdown completed");
    Ok(())
}

/// Rebuild the router whenever the structure document changes. A document that
/// fails to parse keeps the current router in place.
fn spawn_route_watcher(
    source: Arc<dyn RouteSource>,
    router_slot: Arc<ArcSwap<Router>>,
    config: ServerConfig,
) -> Result<()> {
    let mut notify_rx = source.watch()?;
    let debounce_duration = Duration::from_millis(500);

    tokio::spawn(async move {
        tracing::info!(structure = %source.describe(), "Route watcher task started");

        while notify_rx.recv().await.is_some() {
            // let editors finish writing before reading the file
            tokio::time::sleep(debounce_duration).await;
            while notify_rx.try_recv().is_ok() {}

            let span = tracing_setup::create_reload_span(&source.describe());
            async {
                match build_router(source.as_ref(), &config).await {
                    Ok(router) => {
                        let nodes = router.tree().len();
                        router_slot.store(Arc::new(router));
                        metrics::record_route_reload(ReloadOutcome::Applied);
                        tracing::info!(nodes, "Route tree reloaded");
                    }
                    Err(e) => {
                        metrics::record_route_reload(ReloadOutcome::Rejected);
                        tracing::error!(
                            "Failed to reload route tree: {:?}. Keeping the current one.",
                            e
                        );
                    }
                }
            }
            .instrument(span)
            .await;
        }
        tracing::info!("Route watcher task is shutting down");
    });

    Ok(())
}

/// Load config and router for the offline subcommands, exiting on failure.
async fn load_for_inspection(config_path: &str) -> Result<(ServerConfig, Router)> {
    tracing_setup::init_console_tracing()?;
    let config = load_server_config(config_path).await?;
    let source = FileRouteSource::new(&config.routes.structure_path);
    let router = build_router(&source, &config).await?;
    Ok((config, router))
}

/// Validate configuration file and route tree, then exit
async fn validate_command(config_path: &str) -> Result<()> {
    println!("🔍 Validating configuration file: {config_path}");

    let config = match load_server_config(config_path).await {
        Ok(config) => {
            println!("✅ Configuration parsing: OK");
            config
        }
        Err(e) => {
            eprintln!("❌ Configuration parsing failed:");
            eprintln!("   {e:#}");
            std::process::exit(1);
        }
    };

    if let Err(e) = ServerConfigValidator::validate(&config) {
        eprintln!("❌ Configuration validation failed:");
        eprintln!("{e}");
        std::process::exit(1);
    }
    println!("✅ Configuration validation: OK");

    let source = FileRouteSource::new(&config.routes.structure_path);
    let router = match build_router(&source, &config).await {
        Ok(router) => {
            println!("✅ Structure document: OK");
            router
        }
        Err(e) => {
            eprintln!("❌ Structure document rejected:");
            eprintln!("   {e:#}");
            std::process::exit(1);
        }
    };

    let nodes = router.tree().nodes();
    let bound = nodes
        .iter()
        .filter(|node| router.binding(node).is_some())
        .count();

    println!();
    println!("📋 Summary:");
    println!("   • Listen Address: {}", config.listen_addr);
    println!("   • Structure: {}", config.routes.structure_path);
    println!("   • Namespace: {}", config.routes.namespace);
    println!("   • Nodes: {}", nodes.len());
    println!("   • Nodes with a handler: {bound}");
    println!();
    println!("🎉 Configuration is valid and ready to use!");
    Ok(())
}

async fn openapi_command(config_path: &str) -> Result<()> {
    let (_, router) = load_for_inspection(config_path).await?;
    let document = DocGenerator::new(&router).generate();
    println!(
        "{}",
        serde_json::to_string_pretty(&document).context("Failed to serialize document")?
    );
    Ok(())
}

async fn routes_command(config_path: &str) -> Result<()> {
    let (_, router) = load_for_inspection(config_path).await?;
    for child in router.tree().root().children() {
        print_routes(&router, child, "");
    }
    Ok(())
}

fn print_routes(router: &Router, node: &RouteNode, prefix: &str) {
    let path = format!("{prefix}/{}", node.name());
    let methods = router
        .metadata(node)
        .map(|meta| {
            meta.implemented
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_else(|| "-".to_string());

    println!("{path:<40} {:<36} [{methods}]", node.handler_name());

    let mut child_prefix = path;
    for param in node.params() {
        child_prefix.push_str(&format!("/{{{param}}}"));
    }
    for child in node.children() {
        print_routes(router, child, &child_prefix);
    }
}
