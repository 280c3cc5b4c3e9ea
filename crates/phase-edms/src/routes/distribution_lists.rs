//! Distribution list HTTP routes

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use super::EdmsState;
use crate::error::EdmsError;
use crate::models::{CreateDistributionListRequest, DistributionList, Revision};
use crate::services::DistributionListService;

/// Query params for listing distribution lists
#[derive(Deserialize)]
pub struct ListParams {
    pub category_id: Option<i64>,
}

/// Configure distribution list routes
pub fn routes(state: EdmsState) -> Router {
    Router::new()
        .route("/distribution-lists", post(create_list).get(list_lists))
        .route("/distribution-lists/{id}", get(get_list).delete(delete_list))
        .route(
            "/distribution-lists/{id}/apply/{revision_id}",
            post(apply_list),
        )
        .with_state(state)
}

async fn create_list(
    State(state): State<EdmsState>,
    Json(req): Json<CreateDistributionListRequest>,
) -> Result<(StatusCode, Json<DistributionList>), EdmsError> {
    let service = DistributionListService::new(state.index.clone());
    let list = service.create_list(&state.pool, req).await?;
    Ok((StatusCode::CREATED, Json(list)))
}

async fn list_lists(
    State(state): State<EdmsState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<DistributionList>>, EdmsError> {
    let service = DistributionListService::new(state.index.clone());
    let lists = service.list_lists(&state.pool, params.category_id).await?;
    Ok(Json(lists))
}

async fn get_list(
    State(state): State<EdmsState>,
    Path(list_id): Path<i64>,
) -> Result<Json<DistributionList>, EdmsError> {
    let service = DistributionListService::new(state.index.clone());
    Ok(Json(service.get_list(&state.pool, list_id).await?))
}

async fn delete_list(
    State(state): State<EdmsState>,
    Path(list_id): Path<i64>,
) -> Result<StatusCode, EdmsError> {
    let service = DistributionListService::new(state.index.clone());
    service.delete_list(&state.pool, list_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Prefill a revision's reviewers, leader and approver from a list
async fn apply_list(
    State(state): State<EdmsState>,
    Path((list_id, revision_id)): Path<(i64, i64)>,
) -> Result<Json<Revision>, EdmsError> {
    let service = DistributionListService::new(state.index.clone());
    let revision = service
        .apply_to_revision(&state.pool, list_id, revision_id)
        .await?;
    Ok(Json(revision))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use super::super::test_support::{app_for, empty_request, json_body, json_request, send, state};
    use crate::migrations::test_support::{create_category, create_user, test_pool};

    #[tokio::test]
    async fn test_list_routes() {
        let pool = test_pool().await;
        let user = create_user(&pool, "leader@phase.fr").await;
        let category = create_category(&pool, "FWF", "Deliverables").await;
        let state = state(&pool);

        let response = send(
            app_for(state.clone(), user),
            json_request(
                "POST",
                "/distribution-lists",
                json!({
                    "name": "HSE team",
                    "leader_id": user,
                    "approver_id": user,
                    "reviewers": [user],
                    "categories": [category]
                }),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let id = json_body(response).await["id"].as_i64().unwrap();

        let response = send(
            app_for(state.clone(), user),
            empty_request("GET", &format!("/distribution-lists?category_id={}", category)),
        )
        .await;
        assert_eq!(json_body(response).await.as_array().unwrap().len(), 1);

        let response = send(
            app_for(state.clone(), user),
            empty_request("POST", &format!("/distribution-lists/{}/apply/999", id)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = send(
            app_for(state.clone(), user),
            empty_request("DELETE", &format!("/distribution-lists/{}", id)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = send(
            app_for(state, user),
            empty_request("GET", &format!("/distribution-lists/{}", id)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
