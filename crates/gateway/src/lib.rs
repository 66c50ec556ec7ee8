//! HTTP API gateway for FinGuru.
//!
//! Exposes the session API over JSON: chat turns, profile and conversation
//! lookups, session reset, and a health report.
//!
//! Built on Axum; every handler is a thin adapter over [`SessionCoordinator`].

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Query};
use axum::http::HeaderValue;
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use finguru_agent::{ANONYMOUS_USER, SessionCoordinator, TurnOutcome};
use finguru_core::error::ProviderError;
use finguru_core::message::Turn;
use finguru_core::profile::UserProfile;
use finguru_memory::FaqIndex;

const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub coordinator: Arc<SessionCoordinator>,
    /// `None` when the FAQ collaborator is disabled.
    pub faq: Option<FaqIndex>,
    pub api_key_configured: bool,
}

type SharedState = Arc<GatewayState>;

/// Build the Axum router with all API routes.
///
/// An empty `cors_origins` list allows any origin.
pub fn build_router(state: SharedState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/api/chat", post(chat_handler))
        .route("/api/portfolio", get(portfolio_handler))
        .route("/api/conversation", get(conversation_handler))
        .route("/api/reset", post(reset_handler))
        .route("/api/health", get(health_handler))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors_layer(cors_origins))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(parsed))
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([axum::http::header::CONTENT_TYPE])
}

/// Start the gateway HTTP server.
pub async fn start(config: finguru_config::AppConfig) -> finguru_core::Result<()> {
    let router = finguru_providers::router::build_from_config(&config);
    let provider = router.default().ok_or_else(|| {
        ProviderError::NotConfigured(format!(
            "provider '{}' is not available",
            config.default_provider
        ))
    })?;

    let coordinator = Arc::new(SessionCoordinator::from_config(provider.clone(), &config));
    let model = coordinator.model().to_string();

    let faq = if config.faq.enabled {
        let mut index = FaqIndex::seeded();
        if let Some(model) = &config.faq.embedding_model {
            match index.build_embeddings(provider.as_ref(), model).await {
                Ok(count) => info!(count, model = %model, "FAQ embeddings ready"),
                Err(e) => warn!(error = %e, "FAQ embeddings unavailable, keyword lookup only"),
            }
        }
        Some(index)
    } else {
        None
    };

    if !config.has_api_key() {
        warn!("No valid API key configured; completions will fail until one is set");
    }

    let state = Arc::new(GatewayState {
        coordinator,
        faq,
        api_key_configured: config.has_api_key(),
    });
    let app = build_router(state, &config.gateway.cors_origins);

    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, model = %model, "FinGuru gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down gateway");
}

// --- Payloads ---

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Serialize)]
struct StatusMessage {
    status: &'static str,
    message: String,
}

#[derive(Serialize)]
struct ChatResponse {
    response: String,
    user_id: String,
    portfolio: UserProfile,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'static str>,
}

#[derive(Serialize)]
struct PortfolioResponse {
    status: &'static str,
    portfolio: UserProfile,
}

#[derive(Serialize)]
struct ConversationResponse {
    status: &'static str,
    conversation: Vec<Turn>,
}

#[derive(Deserialize)]
struct UserQuery {
    user_id: Option<String>,
}

impl UserQuery {
    fn user_id(&self) -> &str {
        match self.user_id.as_deref() {
            Some(id) if !id.is_empty() => id,
            _ => ANONYMOUS_USER,
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    api_status: &'static str,
    model: String,
    components: Components,
    active_sessions: usize,
    version: &'static str,
}

#[derive(Serialize)]
struct Components {
    app: &'static str,
    conversation_memory: &'static str,
    faq_database: &'static str,
    embedding_model: &'static str,
}

type ApiError<T> = (StatusCode, Json<T>);

fn bad_request(message: &str) -> ApiError<ErrorResponse> {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn not_found(message: &str) -> ApiError<StatusMessage> {
    (
        StatusCode::NOT_FOUND,
        Json(StatusMessage {
            status: "error",
            message: message.into(),
        }),
    )
}

/// String field of a JSON object, if present and a string.
fn str_field<'a>(body: &'a Value, key: &str) -> Option<&'a str> {
    body.get(key).and_then(Value::as_str)
}

fn user_id_of(body: &Value) -> String {
    match str_field(body, "user_id") {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => ANONYMOUS_USER.to_string(),
    }
}

// --- Handlers ---

async fn chat_handler(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<(StatusCode, Json<ChatResponse>), ApiError<ErrorResponse>> {
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(value @ Value::Object(_)) => value,
        _ => return Err(bad_request("Invalid JSON payload")),
    };
    if payload.as_object().is_some_and(|fields| fields.is_empty()) {
        return Err(bad_request("Invalid JSON payload"));
    }

    let input = match str_field(&payload, "user_input") {
        Some(text) if !text.is_empty() => text,
        _ => return Err(bad_request("Please provide user input")),
    };
    let user_id = user_id_of(&payload);

    let reply = state.coordinator.handle_turn(&user_id, input).await;

    let (status, error) = match reply.outcome {
        TurnOutcome::Failed => (StatusCode::INTERNAL_SERVER_ERROR, Some("Internal server error")),
        _ => (StatusCode::OK, None),
    };
    Ok((
        status,
        Json(ChatResponse {
            response: reply.response,
            user_id: reply.user_id,
            portfolio: reply.profile.unwrap_or_default(),
            error,
        }),
    ))
}

async fn portfolio_handler(
    State(state): State<SharedState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<PortfolioResponse>, ApiError<StatusMessage>> {
    let profile = state
        .coordinator
        .profile(query.user_id())
        .await
        .ok_or_else(|| not_found("No portfolio found for this user"))?;
    Ok(Json(PortfolioResponse {
        status: "success",
        portfolio: profile,
    }))
}

async fn conversation_handler(
    State(state): State<SharedState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<ConversationResponse>, ApiError<StatusMessage>> {
    let conversation = state
        .coordinator
        .history(query.user_id())
        .await
        .ok_or_else(|| not_found("No conversation found for this user"))?;
    Ok(Json(ConversationResponse {
        status: "success",
        conversation,
    }))
}

async fn reset_handler(State(state): State<SharedState>, body: Bytes) -> Json<StatusMessage> {
    // A missing or unreadable body resets the anonymous session.
    let payload: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let user_id = user_id_of(&payload);

    state.coordinator.reset(&user_id).await;
    Json(StatusMessage {
        status: "success",
        message: format!("Conversation reset for user {user_id}"),
    })
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    let (faq_database, embedding_model) = match &state.faq {
        Some(index) if index.is_embedded() => ("available", "loaded"),
        Some(_) => ("available", "not loaded"),
        None => ("unavailable", "not loaded"),
    };

    Json(HealthResponse {
        status: if state.api_key_configured { "ok" } else { "degraded" },
        api_status: if state.api_key_configured {
            "configured"
        } else {
            "error: Missing or invalid API key"
        },
        model: state.coordinator.model().to_string(),
        components: Components {
            app: "running",
            conversation_memory: "enabled",
            faq_database,
            embedding_model,
        },
        active_sessions: state.coordinator.session_count().await,
        version: env!("CARGO_PKG_VERSION"),
    })
}
