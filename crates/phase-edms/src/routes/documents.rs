//! Document HTTP routes

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};

use super::EdmsState;
use crate::error::EdmsError;
use crate::models::{
    CreateDocumentRequest, DocumentDetail, FilterQuery, FilterResponse, NewRevisionRequest,
    Revision,
};
use crate::services::DocumentService;
use crate::AuthenticatedUser;

/// Configure document routes
pub fn routes(state: EdmsState) -> Router {
    Router::new()
        .route("/documents", post(create_document))
        .route("/documents/filter", get(filter_documents))
        .route(
            "/documents/{document_key}",
            get(get_document).delete(delete_document),
        )
        .route("/documents/{document_key}/revisions", post(create_revision))
        .with_state(state)
}

/// Create a document with its first revision
async fn create_document(
    State(state): State<EdmsState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(req): Json<CreateDocumentRequest>,
) -> Result<(StatusCode, Json<DocumentDetail>), EdmsError> {
    let service = DocumentService::new(state.index.clone());
    let detail = service.create_document(&state.pool, user.0, req).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// DataTables-style list endpoint
async fn filter_documents(
    State(state): State<EdmsState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<FilterResponse>, EdmsError> {
    let query = FilterQuery::from_params(&params, state.config.paginate_by)?;
    let service = DocumentService::new(state.index.clone());
    let response = service.filter_documents(&state.pool, user.0, &query).await?;
    Ok(Json(response))
}

async fn get_document(
    State(state): State<EdmsState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(document_key): Path<String>,
) -> Result<Json<DocumentDetail>, EdmsError> {
    let service = DocumentService::new(state.index.clone());
    let detail = service.get_document(&state.pool, user.0, &document_key).await?;
    Ok(Json(detail))
}

async fn create_revision(
    State(state): State<EdmsState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(document_key): Path<String>,
    Json(req): Json<NewRevisionRequest>,
) -> Result<(StatusCode, Json<Revision>), EdmsError> {
    let service = DocumentService::new(state.index.clone());
    let revision = service
        .create_revision(&state.pool, user.0, &document_key, req)
        .await?;
    Ok((StatusCode::CREATED, Json(revision)))
}

async fn delete_document(
    State(state): State<EdmsState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(document_key): Path<String>,
) -> Result<StatusCode, EdmsError> {
    let service = DocumentService::new(state.index.clone());
    service
        .delete_document(&state.pool, user.0, &document_key)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
