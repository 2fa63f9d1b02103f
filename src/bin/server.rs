use std::{
    env,
    fs::OpenOptions,
    net::SocketAddr,
    path::PathBuf,
    sync::Arc,
    time::Duration,
};

use axum::{
    Router,
    extract::{MatchedPath, Request},
};
use axum_server::Handle;
use clap::Parser;
use rusqlite::Connection;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use renoveur_rs::{
    AppState, ProviderClient, ProviderConfig, build_router, default_rules, graceful_shutdown,
    load_rules, sync_task,
};

/// The REST API server for renoveur_rs.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,

    /// The port to serve the API from.
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// The base URL of the bank-data provider API.
    #[arg(long)]
    provider_url: String,

    /// The redirect URI registered with the provider for authorization codes.
    #[arg(long)]
    redirect_uri: String,

    /// Seconds between background synchronizations of every connection, 0 to disable.
    #[arg(long, default_value_t = 0)]
    sync_interval_secs: u64,

    /// File path to a JSON file of categorization rules. The built-in rules are used if omitted.
    #[arg(long)]
    rules_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    setup_logging();

    let args = Args::parse();

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));

    let client_id = env::var("CLIENT_ID").expect("The environment variable 'CLIENT_ID' must be set");
    let client_secret =
        env::var("CLIENT_SECRET").expect("The environment variable 'CLIENT_SECRET' must be set");
    let provider_config = ProviderConfig::new(
        &args.provider_url,
        &client_id,
        &client_secret,
        &args.redirect_uri,
    );
    tracing::debug!("Using provider config {provider_config:?}");
    let provider = ProviderClient::new(provider_config).expect("Could not create provider client");

    let categorization_rules = match &args.rules_path {
        Some(path) => load_rules(path).expect("Could not load categorization rules"),
        None => default_rules(),
    };

    let conn = Connection::open(&args.db_path).expect("Could not open database");
    let state = AppState::new(conn, Arc::new(provider), categorization_rules)
        .expect("Could not initialize database");

    if args.sync_interval_secs > 0 {
        tracing::info!(
            "Synchronizing bank connections every {} seconds",
            args.sync_interval_secs
        );
        tokio::spawn(sync_task(
            state.orchestrator.clone(),
            Duration::from_secs(args.sync_interval_secs),
        ));
    }

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = add_tracing_layer(build_router(state));

    tracing::info!("HTTP server listening on {}", addr);
    axum_server::bind(addr)
        .handle(handle)
        .serve(router.into_make_service())
        .await
        .expect("Server stopped unexpectedly");
}

fn setup_logging() {
    let stdout_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open("debug.log")
        .expect("Could not create log file");

    let debug_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_ansi(false)
        .with_writer(Arc::new(log_file))
        .with_filter(filter::LevelFilter::DEBUG);

    tracing_subscriber::registry()
        .with(stdout_log)
        .with(debug_log)
        .init();
}

fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        // By default, `TraceLayer` will log 5xx responses but we're doing our specific
        // logging of errors so disable that
        .on_failure(());

    router.layer(tracing_layer)
}
