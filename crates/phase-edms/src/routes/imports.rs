//! CSV import HTTP routes

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};

use super::EdmsState;
use crate::error::EdmsError;
use crate::models::ImportBatch;
use crate::services::ImportService;
use crate::AuthenticatedUser;

/// Configure import routes
pub fn routes(state: EdmsState) -> Router {
    Router::new()
        .route("/imports", post(upload_import))
        .route("/imports/{uid}", get(get_import))
        .with_state(state)
}

/// Upload a CSV file (`category_id`, `file`) and run it as a batch
async fn upload_import(
    State(state): State<EdmsState>,
    Extension(user): Extension<AuthenticatedUser>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ImportBatch>), EdmsError> {
    let mut category_id: Option<i64> = None;
    let mut file_name = String::new();
    let mut file_data = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| EdmsError::Validation(format!("Failed to read multipart: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                file_name = field.file_name().unwrap_or("import.csv").to_string();
                file_data = field
                    .bytes()
                    .await
                    .map_err(|e| EdmsError::Validation(format!("Failed to read file: {}", e)))?
                    .to_vec();
            }
            "category_id" => {
                let text = field.text().await.map_err(|e| {
                    EdmsError::Validation(format!("Failed to read category_id: {}", e))
                })?;
                category_id = Some(text.trim().parse().map_err(|_| {
                    EdmsError::Validation(format!("Invalid category_id: {}", text))
                })?);
            }
            _ => {}
        }
    }

    let category_id = category_id
        .ok_or_else(|| EdmsError::Validation("category_id is required".to_string()))?;
    if file_name.is_empty() {
        return Err(EdmsError::Validation("No file provided".to_string()));
    }

    let service = ImportService::new(&state.config, state.index.clone());
    let batch = service
        .upload(&state.pool, user.0, category_id, &file_name, &file_data)
        .await?;
    Ok((StatusCode::CREATED, Json(batch)))
}

async fn get_import(
    State(state): State<EdmsState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(uid): Path<String>,
) -> Result<Json<ImportBatch>, EdmsError> {
    let service = ImportService::new(&state.config, state.index.clone());
    let batch = service.get_member_batch(&state.pool, user.0, &uid).await?;
    Ok(Json(batch))
}
