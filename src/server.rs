use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::{header, StatusCode},
    middleware,
    response::Html,
    routing::{get, post, put},
    Router,
};

// These imports are needed for static file handlers
#[cfg(debug_assertions)]
use axum::{
    http::Uri,
    response::{IntoResponse, Response},
};

#[cfg(not(debug_assertions))]
use axum::{
    http::Uri,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::api;
use crate::api::state::AppState;
use crate::config::Config;
use crate::error::TathyaError;

// Embed static files in release builds
#[cfg(not(debug_assertions))]
use rust_embed::RustEmbed;

#[cfg(not(debug_assertions))]
#[derive(RustEmbed)]
#[folder = "static/"]
struct Asset;

pub struct WebServer {
    host: String,
    port: u16,
}

impl WebServer {
    pub fn new(host: String, port: u16) -> Self {
        Self { host, port }
    }

    pub async fn start(&self) -> Result<(), TathyaError> {
        let app = self.create_router();

        let addr: SocketAddr = format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| TathyaError::Error(format!("Invalid address: {}", e)))?;

        println!("🚀 Tathya server starting on http://{}", addr);

        #[cfg(debug_assertions)]
        println!("   Running in DEVELOPMENT mode - serving assets from static/");

        #[cfg(not(debug_assertions))]
        println!("   Running in PRODUCTION mode - serving embedded assets");

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| TathyaError::Error(format!("Failed to bind to {}: {}", addr, e)))?;

        let shutdown_signal = shutdown_signal();

        log::info!("Server ready to handle requests");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown_signal.await;
                println!("\n🛑 Shutdown signal received - stopping server gracefully...");
                log::info!("Server shutdown complete");
                println!("   Server stopped");
            })
            .await
            .map_err(|e| TathyaError::Error(format!("Server error: {}", e)))?;

        Ok(())
    }

    fn create_router(&self) -> Router {
        // In-memory session store shared by login and the auth layer
        let state = AppState::new();

        // Everything below requires a valid bearer token
        let protected = Router::new()
            // Session
            .route("/api/auth/logout", post(api::auth::logout))
            .route("/api/auth/me", get(api::auth::me))

            // User administration
            .route("/api/users", get(api::users::list_users))
            .route("/api/users", post(api::users::create_user))
            .route("/api/users/{id}", put(api::users::update_user))
            .route("/api/users/{id}/password", put(api::users::reset_password))

            // Case entry and detail
            .route("/api/cases", get(api::cases::list_cases))
            .route("/api/cases", post(api::cases::create_case))
            .route("/api/cases/{id}", get(api::cases::get_case))
            .route("/api/cases/{id}", put(api::cases::update_case))
            .route("/api/cases/{id}/submit", post(api::cases::submit_case))
            .route("/api/cases/{id}/history", get(api::cases::get_history))

            // Comments and documents
            .route("/api/cases/{id}/comments", get(api::comments::list_comments))
            .route("/api/cases/{id}/comments", post(api::comments::add_comment))
            .route("/api/cases/{id}/documents", get(api::documents::list_documents))
            .route("/api/cases/{id}/documents", post(api::documents::upload_document))
            .route("/api/documents/{id}/download", get(api::documents::download_document))

            // Allocation
            .route("/api/allocation/queue", get(api::allocation::get_queue))
            .route("/api/cases/{id}/allocate", post(api::allocation::allocate_case))
            .route("/api/cases/{id}/reallocate", post(api::allocation::reallocate_case))

            // Investigation
            .route("/api/investigation/queue", get(api::investigation::get_queue))
            .route("/api/cases/{id}/investigation/start", post(api::investigation::start_investigation))
            .route("/api/cases/{id}/investigation/hold", post(api::investigation::hold_investigation))
            .route("/api/cases/{id}/investigation/resume", post(api::investigation::resume_investigation))
            .route("/api/cases/{id}/investigation/save", post(api::investigation::save_investigation))
            .route("/api/cases/{id}/investigation/submit", post(api::investigation::submit_investigation))
            .route("/api/cases/{id}/agency-requests", post(api::investigation::create_agency_request))
            .route("/api/agency-requests/{id}/response", post(api::investigation::record_agency_response))

            // Review
            .route("/api/review/queue", get(api::review::get_queue))
            .route("/api/cases/{id}/review/start", post(api::review::start_review))
            .route("/api/cases/{id}/review/send-back", post(api::review::send_back))
            .route("/api/cases/{id}/review/complete", post(api::review::complete_review))
            .route("/api/cases/{id}/review/forward", post(api::review::forward_for_approval))

            // Approval
            .route("/api/approval/queue", get(api::approval::get_queue))
            .route("/api/cases/{id}/approval/decision", post(api::approval::record_decision))

            // Legal
            .route("/api/legal/queue", get(api::legal::get_queue))
            .route("/api/cases/{id}/legal/take-up", post(api::legal::take_up))
            .route("/api/cases/{id}/legal/opinion", post(api::legal::record_opinion))

            // Stakeholder actioning
            .route("/api/actions/queue", get(api::actions::get_queue))
            .route("/api/cases/{id}/actions", post(api::actions::add_action))
            .route("/api/actions/{id}/complete", post(api::actions::complete_action))
            .route("/api/cases/{id}/actions/complete-all", post(api::actions::complete_stage))

            // Regulatory reporting
            .route("/api/regulatory/queue", get(api::regulatory::get_queue))
            .route("/api/cases/{id}/regulatory-reports", post(api::regulatory::file_report))

            // Closure
            .route("/api/closure/queue", get(api::closure::get_queue))
            .route("/api/cases/{id}/close", post(api::closure::close_case))
            .route("/api/cases/{id}/reopen", post(api::closure::reopen_case))

            // Dashboard
            .route("/api/dashboard/summary", get(api::dashboard::get_summary))
            .route("/api/dashboard/recent", get(api::dashboard::get_recent))

            // Risk assessment
            .route("/api/risk/indicators", get(api::risk::get_indicators))
            .route("/api/risk/score", post(api::risk::score))

            .route_layer(middleware::from_fn_with_state(
                state.clone(),
                api::auth::require_auth,
            ));

        let app = Router::new()
            // Health check
            .route("/health", get(health_check))

            // App info
            .route("/api/app-info", get(api::app::get_app_info))

            // Login issues the bearer token the protected routes require
            .route("/api/auth/login", post(api::auth::login))

            .merge(protected)
            .layer(DefaultBodyLimit::max(Config::get_max_upload_bytes()))
            .with_state(state);

        // Serve static files differently based on build type
        #[cfg(debug_assertions)]
        {
            app.fallback(dev_static_handler)
        }

        #[cfg(not(debug_assertions))]
        {
            app.fallback(static_handler)
        }
    }
}

async fn health_check() -> Result<(StatusCode, Html<String>), StatusCode> {
    Ok((
        StatusCode::OK,
        Html("<h1>Tathya Server</h1><p>✅ Server is running</p>".to_string()),
    ))
}

// Handler for filesystem static files (development builds only)
#[cfg(debug_assertions)]
async fn dev_static_handler(uri: Uri) -> impl IntoResponse {
    let path = uri.path().trim_start_matches('/');
    let file_path = if path.is_empty() {
        "static/index.html"
    } else {
        &format!("static/{}", path)
    };

    // Try to serve the requested file
    if let Ok(content) = std::fs::read(file_path) {
        let mime = mime_guess::from_path(file_path).first_or_octet_stream();

        return Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, mime.as_ref())
            .body(Body::from(content))
            .unwrap();
    }

    // For SPA routing: if file not found, serve index.html
    if let Ok(content) = std::fs::read("static/index.html") {
        return Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "text/html")
            .body(Body::from(content))
            .unwrap();
    }

    // If even index.html is missing, return 404
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .body(Body::from("404 Not Found"))
        .unwrap()
}

// Handler for embedded static files (production builds only)
#[cfg(not(debug_assertions))]
async fn static_handler(uri: Uri) -> impl IntoResponse {
    let path = uri.path().trim_start_matches('/');

    // Try to serve the requested file
    if let Some(content) = Asset::get(path) {
        let mime = mime_guess::from_path(path).first_or_octet_stream();

        return Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, mime.as_ref())
            .body(Body::from(content.data))
            .unwrap();
    }

    // For SPA routing: if file not found, serve index.html
    if let Some(content) = Asset::get("index.html") {
        return Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "text/html")
            .body(Body::from(content.data))
            .unwrap();
    }

    // If even index.html is missing, return 404
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .body(Body::from("404 Not Found"))
        .unwrap()
}

/// Waits for a shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            log::info!("Received SIGINT (Ctrl+C)");
        },
        _ = terminate => {
            log::info!("Received SIGTERM");
        },
    }
}
