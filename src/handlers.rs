use crate::config::Config;
use crate::document::{self, DocumentKind};
use crate::errors::AppError;
use crate::models::*;
use crate::resolver::LookupResolver;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

/// Shared application state injected into handlers.
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Provider adapters and fallback logic, sharing one HTTP client.
    pub resolver: LookupResolver,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, AppError> {
        let resolver = LookupResolver::new(&config)?;
        Ok(Self { config, resolver })
    }
}

/// Lookup routes, without the health check and without rate limiting.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/cep/:cep", get(lookup_address))
        .route("/api/v1/cnpj/:cnpj", get(lookup_company))
        .route("/api/v1/geocode", get(geocode))
        .route("/api/v1/documents/validate", post(validate_document))
}

/// Health check endpoint.
///
/// Returns the service status, version, and health information.
///
/// # Returns
///
/// * `(StatusCode, Json<serde_json::Value>)` - HTTP 200 OK with health status JSON.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "rust-br-lookup-api",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// GET /api/v1/cep/:cep
///
/// Resolves an address to pre-fill address forms. Accepts masked input
/// (`01001-000`).
///
/// # Returns
///
/// * `Result<Json<AddressRecord>, AppError>` - The address, 400 for a malformed
///   CEP, 404 when the CEP does not exist, 502 when the provider is down.
pub async fn lookup_address(
    State(state): State<Arc<AppState>>,
    Path(cep): Path<String>,
) -> Result<Json<AddressRecord>, AppError> {
    tracing::info!("GET /cep/{}", cep);

    let address = state.resolver.resolve_address_by_postal_code(&cep).await?;
    Ok(Json(address))
}

/// GET /api/v1/cnpj/:cnpj
///
/// Resolves a company to pre-fill company forms. The response names the
/// registry provider that answered.
pub async fn lookup_company(
    State(state): State<Arc<AppState>>,
    Path(cnpj): Path<String>,
) -> Result<Json<CompanyLookup>, AppError> {
    tracing::info!("GET /cnpj/{}", cnpj);

    let lookup = state.resolver.resolve_company_by_tax_id(&cnpj).await?;
    Ok(Json(lookup))
}

/// GET /api/v1/geocode?q=...
///
/// Always 200; `coordinates` is null when the address could not be located.
pub async fn geocode(
    State(state): State<Arc<AppState>>,
    Query(params): Query<GeocodeParams>,
) -> Json<GeocodeResponse> {
    tracing::info!("GET /geocode - q: {}", params.q);

    let coordinates = state.resolver.geocode_free_text(&params.q).await;
    Json(GeocodeResponse { coordinates })
}

/// POST /api/v1/documents/validate
///
/// Checks a CPF or CNPJ and returns its masked form. Without an explicit
/// `kind` the algorithm is chosen from the digit count.
pub async fn validate_document(
    Json(request): Json<DocumentValidationRequest>,
) -> Result<Json<DocumentValidationResponse>, AppError> {
    let digits = document::clean_digits(&request.document);
    if digits.is_empty() {
        return Err(AppError::InvalidInput("Document is required".to_string()));
    }

    let kind = request.kind.or_else(|| document::detect_kind(&digits));

    let (valid, message) = match kind {
        Some(kind) if digits.len() != kind.length() => (
            false,
            Some(format!("{} must have {} digits", kind, kind.length())),
        ),
        Some(kind) => {
            let valid = document::validate_document(&digits, kind);
            (valid, (!valid).then(|| format!("Invalid {}", kind)))
        }
        None => (
            false,
            Some("Invalid document. Must be a CPF (11 digits) or CNPJ (14 digits).".to_string()),
        ),
    };

    let formatted = match kind {
        Some(DocumentKind::Cpf) => document::format_cpf(&digits),
        Some(DocumentKind::Cnpj) => document::format_cnpj(&digits),
        None => document::format_document(&digits),
    };

    tracing::debug!("Document validation: kind={:?} valid={}", kind, valid);

    Ok(Json(DocumentValidationResponse {
        valid,
        kind,
        digits,
        formatted,
        message,
    }))
}
