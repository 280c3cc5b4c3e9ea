//! Dashboard HTTP routes

use axum::{
    extract::{Path, State},
    routing::get,
    Extension, Json, Router,
};

use super::EdmsState;
use crate::error::EdmsError;
use crate::services::{DashboardService, MonthlyStats};
use crate::AuthenticatedUser;

/// Configure dashboard routes
pub fn routes(state: EdmsState) -> Router {
    Router::new()
        .route("/dashboards/{category_id}", get(issued_documents))
        .with_state(state)
}

/// Monthly issued documents of a category
async fn issued_documents(
    State(state): State<EdmsState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(category_id): Path<i64>,
) -> Result<Json<Vec<MonthlyStats>>, EdmsError> {
    let months = DashboardService::new()
        .issued_documents(&state.pool, user.0, category_id)
        .await?;
    Ok(Json(months))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::super::test_support::{app_for, empty_request, json_body, send, state};
    use crate::migrations::test_support::{add_to_category, create_category, create_user, test_pool};

    #[tokio::test]
    async fn test_dashboard_visibility() {
        let pool = test_pool().await;
        let user = create_user(&pool, "user@phase.fr").await;
        let outsider = create_user(&pool, "outsider@phase.fr").await;
        let category = create_category(&pool, "FWF", "Deliverables").await;
        add_to_category(&pool, category, user).await;
        let state = state(&pool);

        let response = send(
            app_for(state.clone(), user),
            empty_request("GET", &format!("/dashboards/{}", category)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, serde_json::json!([]));

        let response = send(
            app_for(state, outsider),
            empty_request("GET", &format!("/dashboards/{}", category)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
