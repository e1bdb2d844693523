//! Stacks Server
//!
//! Axum server that embeds and serves the directory frontend with API
//! routes over the normalized library collection. The feed is loaded
//! once at startup and held as an immutable snapshot; a refresh re-runs
//! the whole fetch-and-normalize pipeline and swaps the snapshot.

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, Response, StatusCode, Uri},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use clap::{Parser, Subcommand};
use rust_embed::RustEmbed;
use serde::{Deserialize, Serialize};
use stacks_core::directory::LibraryDirectory;
use stacks_core::models::LibraryDisplay;
use stacks_core::registry::{RegistryClient, RegistryConfig};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use utoipa::{IntoParams, OpenApi, ToSchema};

/// Embedded frontend assets
#[derive(RustEmbed)]
#[folder = "static"]
struct Assets;

/// Lifecycle of the current directory snapshot
enum LoadState {
    /// A load is in flight and no snapshot has been applied yet
    Loading,
    /// Snapshot applied; read-only until the next refresh
    Ready(Arc<LibraryDirectory>),
    /// The last load failed with this boundary error message
    Failed(String),
}

/// Application state
struct AppState {
    directory: RwLock<LoadState>,
    /// Tags each load so a superseded load discards its result
    generation: AtomicU64,
    client: RegistryClient,
}

type SharedState = Arc<AppState>;

// === API Types ===

#[derive(Debug, Serialize, ToSchema)]
struct ApiResponse {
    success: bool,
    message: String,
}

#[derive(Serialize, ToSchema)]
struct StatusResponse {
    /// `loading`, `ready`, or `failed`
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Deserialize, IntoParams)]
struct LibraryQuery {
    /// Case-insensitive substring match against name or description
    q: Option<String>,
    /// Exact 2-letter state code filter
    state: Option<String>,
}

#[derive(Serialize, ToSchema)]
struct LibrariesResponse {
    count: usize,
    libraries: Vec<LibraryResponse>,
}

/// One normalized library record as served to the frontend
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct LibraryResponse {
    id: String,
    name: String,
    description: String,
    link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    logo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    catalog_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<String>,
}

impl From<&LibraryDisplay> for LibraryResponse {
    fn from(lib: &LibraryDisplay) -> Self {
        Self {
            id: lib.id.clone(),
            name: lib.name.clone(),
            description: lib.description.clone(),
            link: lib.link.clone(),
            logo_url: lib.logo_url.clone(),
            catalog_url: lib.catalog_url.clone(),
            state: lib.state.clone(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
struct StatesResponse {
    states: Vec<String>,
}

// === CLI ===

#[derive(Parser)]
#[command(author, version, about = "Stacks - Library directory server")]
struct Args {
    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Start the Stacks server (default)
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },
    /// Fetch the registry once and print matching libraries
    List {
        /// Case-insensitive name/description filter
        #[arg(short, long)]
        query: Option<String>,
        /// Exact 2-letter state code filter
        #[arg(short, long)]
        state: Option<String>,
        /// Emit JSON instead of a plain listing
        #[arg(long)]
        json: bool,
    },
}

// === Directory Loading ===

/// Run the full fetch-and-normalize pipeline and swap the snapshot
///
/// Each load is tagged with a generation. If another load starts while
/// this one's fetch is in flight, this one's result is stale and is
/// discarded rather than applied.
async fn load_directory(state: SharedState) {
    let generation = state.generation.fetch_add(1, Ordering::SeqCst) + 1;
    {
        let mut slot = state.directory.write().await;
        *slot = LoadState::Loading;
    }

    let result = state.client.fetch_libraries().await;

    // Check and apply under the same write lock: a superseded load must
    // not clobber a newer load's snapshot after passing the check.
    let mut slot = state.directory.write().await;
    if state.generation.load(Ordering::SeqCst) != generation {
        tracing::debug!(generation, "discarding stale registry load");
        return;
    }

    match result {
        Ok(libraries) => {
            tracing::info!(count = libraries.len(), "library directory loaded");
            *slot = LoadState::Ready(Arc::new(LibraryDirectory::new(libraries)));
        }
        Err(e) => {
            tracing::warn!(error = %e, "library directory load failed");
            *slot = LoadState::Failed(e.to_string());
        }
    }
}

/// The snapshot, or the API error to serve while there is none
async fn current_directory(
    state: &SharedState,
) -> Result<Arc<LibraryDirectory>, (StatusCode, Json<ApiResponse>)> {
    match &*state.directory.read().await {
        LoadState::Ready(directory) => Ok(directory.clone()),
        LoadState::Loading => Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse {
                success: false,
                message: "Library directory is still loading".to_string(),
            }),
        )),
        LoadState::Failed(message) => Err((
            StatusCode::BAD_GATEWAY,
            Json(ApiResponse {
                success: false,
                message: message.clone(),
            }),
        )),
    }
}

// === API Handlers ===

/// Get directory load status
#[utoipa::path(
    get,
    path = "/api/v1/status",
    tag = "directory",
    responses(
        (status = 200, description = "Current load state", body = StatusResponse)
    )
)]
async fn get_status(State(state): State<SharedState>) -> Json<StatusResponse> {
    let response = match &*state.directory.read().await {
        LoadState::Loading => StatusResponse {
            status: "loading".to_string(),
            count: None,
            error: None,
        },
        LoadState::Ready(directory) => StatusResponse {
            status: "ready".to_string(),
            count: Some(directory.len()),
            error: None,
        },
        LoadState::Failed(message) => StatusResponse {
            status: "failed".to_string(),
            count: None,
            error: Some(message.clone()),
        },
    };
    Json(response)
}

/// List libraries, optionally filtered by query and state
#[utoipa::path(
    get,
    path = "/api/v1/libraries",
    tag = "directory",
    params(LibraryQuery),
    responses(
        (status = 200, description = "Filtered library collection", body = LibrariesResponse),
        (status = 502, description = "Last feed load failed", body = ApiResponse),
        (status = 503, description = "Feed load still in flight", body = ApiResponse)
    )
)]
async fn list_libraries(
    State(state): State<SharedState>,
    Query(params): Query<LibraryQuery>,
) -> Result<Json<LibrariesResponse>, (StatusCode, Json<ApiResponse>)> {
    let directory = current_directory(&state).await?;

    let libraries: Vec<LibraryResponse> = directory
        .filter(params.q.as_deref().unwrap_or(""), params.state.as_deref())
        .into_iter()
        .map(LibraryResponse::from)
        .collect();

    Ok(Json(LibrariesResponse {
        count: libraries.len(),
        libraries,
    }))
}

/// List the distinct state codes present in the directory
#[utoipa::path(
    get,
    path = "/api/v1/states",
    tag = "directory",
    responses(
        (status = 200, description = "Distinct state codes, sorted", body = StatesResponse),
        (status = 502, description = "Last feed load failed", body = ApiResponse),
        (status = 503, description = "Feed load still in flight", body = ApiResponse)
    )
)]
async fn list_states(
    State(state): State<SharedState>,
) -> Result<Json<StatesResponse>, (StatusCode, Json<ApiResponse>)> {
    let directory = current_directory(&state).await?;
    Ok(Json(StatesResponse {
        states: directory.available_states(),
    }))
}

/// Re-run the whole fetch-and-normalize pipeline
#[utoipa::path(
    post,
    path = "/api/v1/refresh",
    tag = "directory",
    responses(
        (status = 202, description = "Reload started", body = ApiResponse)
    )
)]
async fn refresh_directory(
    State(state): State<SharedState>,
) -> (StatusCode, Json<ApiResponse>) {
    tokio::spawn(load_directory(state));
    (
        StatusCode::ACCEPTED,
        Json(ApiResponse {
            success: true,
            message: "Reload started".to_string(),
        }),
    )
}

// === OpenAPI ===

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Stacks API",
        version = "1.0.0",
        description = "API for the Stacks library directory"
    ),
    paths(get_status, list_libraries, list_states, refresh_directory),
    components(schemas(
        ApiResponse,
        StatusResponse,
        LibrariesResponse,
        LibraryResponse,
        StatesResponse
    )),
    tags(
        (name = "directory", description = "Library directory endpoints")
    )
)]
struct ApiDoc;

async fn serve_openapi() -> impl IntoResponse {
    let spec = ApiDoc::openapi().to_json().unwrap_or_default();
    Response::builder()
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(spec))
        .unwrap()
}

// === Static Assets ===

async fn serve_static(uri: Uri) -> impl IntoResponse {
    let path = uri.path().trim_start_matches('/');

    if let Some(file) = Assets::get(path) {
        let mime = mime_guess::from_path(path).first_or_octet_stream();
        return Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, mime.as_ref())
            .body(Body::from(file.data.to_vec()))
            .unwrap();
    }

    // SPA fallback; the theme query parameter is handled client-side
    if let Some(file) = Assets::get("index.html") {
        return Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "text/html")
            .body(Body::from(file.data.to_vec()))
            .unwrap();
    }

    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .body(Body::from("Not Found"))
        .unwrap()
}

// === Server Entry ===

async fn run_server(port: u16) -> anyhow::Result<()> {
    let client = RegistryClient::new(RegistryConfig::from_env())?;

    let state: SharedState = Arc::new(AppState {
        directory: RwLock::new(LoadState::Loading),
        generation: AtomicU64::new(0),
        client,
    });

    // Initial load runs in the background; the API serves 503 until it lands
    tokio::spawn(load_directory(state.clone()));

    let app = Router::new()
        .route("/api/v1/status", get(get_status))
        .route("/api/v1/libraries", get(list_libraries))
        .route("/api/v1/states", get(list_states))
        .route("/api/v1/refresh", post(refresh_directory))
        .route("/api/v1/openapi.json", get(serve_openapi))
        .fallback(get(serve_static))
        .with_state(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    tracing::info!(%addr, "stacks server running");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// === CLI Entry ===

async fn run_list(
    query: Option<String>,
    state: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let client = RegistryClient::new(RegistryConfig::from_env())?;
    let directory = LibraryDirectory::new(client.fetch_libraries().await?);
    let matches = directory.filter(query.as_deref().unwrap_or(""), state.as_deref());

    if json {
        println!("{}", serde_json::to_string_pretty(&matches)?);
        return Ok(());
    }

    for lib in &matches {
        match &lib.state {
            Some(code) => println!("{} [{}]  {}", lib.name, code, lib.link),
            None => println!("{}  {}", lib.name, lib.link),
        }
    }
    println!("\n{} of {} libraries", matches.len(), directory.len());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("stacks_server=info,stacks_core=info")
            }),
        )
        .init();

    let args = Args::parse();
    match args.command {
        Some(CliCommand::List { query, state, json }) => run_list(query, state, json).await,
        Some(CliCommand::Serve { port }) => run_server(port).await,
        None => run_server(8080).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    /// Serve one canned feed body on a throwaway local port, optionally
    /// stalling before the response to keep a fetch in flight
    async fn serve_feed(body: &str, delay: Duration) -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let body = body.to_string();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 2048];
            let _ = socket.read(&mut buf).await;
            tokio::time::sleep(delay).await;
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });
        addr
    }

    fn test_state(addr: std::net::SocketAddr) -> SharedState {
        let config = RegistryConfig {
            registry_url: "https://registry.example/libraries".to_string(),
            relay_url: format!("http://{addr}/?url="),
        };
        Arc::new(AppState {
            directory: RwLock::new(LoadState::Loading),
            generation: AtomicU64::new(0),
            client: RegistryClient::new(config).unwrap(),
        })
    }

    #[tokio::test]
    async fn test_superseded_load_discards_its_result() {
        let old_feed = r#"{"catalogs": [{"metadata": {"id": "old", "title": "Old Library"}}]}"#;
        let addr = serve_feed(old_feed, Duration::from_millis(200)).await;
        let state = test_state(addr);

        let stale = tokio::spawn(load_directory(state.clone()));
        tokio::time::sleep(Duration::from_millis(50)).await;

        // A newer load starts and applies its snapshot while the first
        // fetch is still stalled in flight
        state.generation.fetch_add(1, Ordering::SeqCst);
        {
            let mut slot = state.directory.write().await;
            *slot = LoadState::Ready(Arc::new(LibraryDirectory::new(vec![])));
        }

        stale.await.unwrap();

        match &*state.directory.read().await {
            LoadState::Ready(directory) => assert!(directory.is_empty()),
            _ => panic!("newer snapshot was replaced by a stale load"),
        };
    }

    #[tokio::test]
    async fn test_states_unavailable_until_load_lands() {
        let feed = r#"{"catalogs": [{"metadata": {"id": "x", "title": "X", "description": "Town, CA area"}}]}"#;
        let addr = serve_feed(feed, Duration::ZERO).await;
        let state = test_state(addr);

        let err = list_states(State(state.clone())).await.unwrap_err();
        assert_eq!(err.0, StatusCode::SERVICE_UNAVAILABLE);

        load_directory(state.clone()).await;

        let Json(response) = list_states(State(state.clone())).await.unwrap();
        assert_eq!(response.states, vec!["CA"]);
    }
}
