//! Transmittal HTTP routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};

use super::EdmsState;
use crate::error::EdmsError;
use crate::models::{CreateTransmittalRequest, Transmittal};
use crate::services::TransmittalService;
use crate::AuthenticatedUser;

/// Configure transmittal routes
pub fn routes(state: EdmsState) -> Router {
    Router::new()
        .route(
            "/transmittals",
            post(create_transmittal).get(list_transmittals),
        )
        .route("/transmittals/{id}", get(get_transmittal))
        .route("/transmittals/{id}/accept", post(accept_transmittal))
        .route("/transmittals/{id}/reject", post(reject_transmittal))
        .with_state(state)
}

async fn create_transmittal(
    State(state): State<EdmsState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(req): Json<CreateTransmittalRequest>,
) -> Result<(StatusCode, Json<Transmittal>), EdmsError> {
    let transmittal = TransmittalService::new()
        .create_transmittal(&state.pool, user.0, req)
        .await?;
    Ok((StatusCode::CREATED, Json(transmittal)))
}

async fn list_transmittals(
    State(state): State<EdmsState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<Transmittal>>, EdmsError> {
    let transmittals = TransmittalService::new()
        .list_transmittals(&state.pool, user.0)
        .await?;
    Ok(Json(transmittals))
}

async fn get_transmittal(
    State(state): State<EdmsState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(transmittal_id): Path<i64>,
) -> Result<Json<Transmittal>, EdmsError> {
    let transmittal = TransmittalService::new()
        .get_transmittal(&state.pool, user.0, transmittal_id)
        .await?;
    Ok(Json(transmittal))
}

async fn accept_transmittal(
    State(state): State<EdmsState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(transmittal_id): Path<i64>,
) -> Result<Json<Transmittal>, EdmsError> {
    let transmittal = TransmittalService::new()
        .accept_transmittal(&state.pool, user.0, transmittal_id)
        .await?;
    Ok(Json(transmittal))
}

async fn reject_transmittal(
    State(state): State<EdmsState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(transmittal_id): Path<i64>,
) -> Result<Json<Transmittal>, EdmsError> {
    let transmittal = TransmittalService::new()
        .reject_transmittal(&state.pool, user.0, transmittal_id)
        .await?;
    Ok(Json(transmittal))
}
