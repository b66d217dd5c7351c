//! Certificate endpoints

use std::sync::Arc;

use academy_core::is_valid_number;
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::db::repos::{CertificateRepo, HeldCertificate, VerifiedCertificate};
use crate::http::error::ApiError;
use crate::http::extractors::AuthUser;
use crate::http::server::AppState;
use crate::models::ValidationError;

/// GET /me/certificates - certificates held by the caller
async fn my_certificates(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<Vec<HeldCertificate>>, ApiError> {
    let certificates = CertificateRepo::new(&state.pool).for_user(user.id()).await?;
    Ok(Json(certificates))
}

/// GET /certificates/verify/{number} - public verification
async fn verify(
    State(state): State<Arc<AppState>>,
    Path(number): Path<String>,
) -> Result<Json<VerifiedCertificate>, ApiError> {
    let number = number.trim().to_ascii_uppercase();
    if !is_valid_number(&number) {
        return Err(ValidationError::InvalidFormat {
            field: "certificate number",
            reason: "expected CERT-YYYYMMDD-XXXXXXXX",
        }
        .into());
    }

    let certificate = CertificateRepo::new(&state.pool).verify(&number).await?;
    Ok(Json(certificate))
}

/// Certificate routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/me/certificates", get(my_certificates))
        .route("/certificates/verify/{number}", get(verify))
}
