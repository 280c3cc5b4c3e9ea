//! Review workflow HTTP routes

use axum::{
    extract::{Path, State},
    response::Redirect,
    routing::{get, post},
    Extension, Form, Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::Serialize;

use super::EdmsState;
use crate::error::EdmsError;
use crate::models::{Revision, ReviewCounts, ReviewForm, ReviewRole};
use crate::services::{PendingReview, ReviewContext, ReviewService};
use crate::AuthenticatedUser;

/// Response of a cancel request
#[derive(Serialize)]
pub struct CancelResponse {
    pub cancelled: bool,
}

/// Configure review routes
pub fn routes(state: EdmsState) -> Router {
    Router::new()
        .route("/reviews/counts", get(review_counts))
        .route("/reviews/reviewers", get(reviewer_list))
        .route("/reviews/leader", get(leader_list))
        .route("/reviews/approver", get(approver_list))
        .route(
            "/reviews/{document_key}",
            get(review_page).post(post_review),
        )
        .route("/reviews/{document_key}/start", post(start_review))
        .route("/reviews/{document_key}/cancel", post(cancel_review))
        .with_state(state)
}

fn service(state: &EdmsState) -> ReviewService {
    ReviewService::new(state.config.as_ref().clone(), state.index.clone())
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

async fn review_counts(
    State(state): State<EdmsState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<ReviewCounts>, EdmsError> {
    let counts = service(&state).review_counts(&state.pool, user.0).await?;
    Ok(Json(counts))
}

async fn pending(
    state: &EdmsState,
    user: AuthenticatedUser,
    role: ReviewRole,
) -> Result<Json<Vec<PendingReview>>, EdmsError> {
    let reviews = service(state)
        .pending_reviews(&state.pool, user.0, role)
        .await?;
    Ok(Json(reviews))
}

async fn reviewer_list(
    State(state): State<EdmsState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<PendingReview>>, EdmsError> {
    pending(&state, user, ReviewRole::Reviewer).await
}

async fn leader_list(
    State(state): State<EdmsState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<PendingReview>>, EdmsError> {
    pending(&state, user, ReviewRole::Leader).await
}

async fn approver_list(
    State(state): State<EdmsState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<PendingReview>>, EdmsError> {
    pending(&state, user, ReviewRole::Approver).await
}

/// Review page of the latest revision, for its participants only
async fn review_page(
    State(state): State<EdmsState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(document_key): Path<String>,
) -> Result<Json<ReviewContext>, EdmsError> {
    let context = service(&state)
        .review_context(&state.pool, user.0, &document_key)
        .await?;
    Ok(Json(context))
}

/// Submit a review or close a step, then go back to the caller's list
async fn post_review(
    State(state): State<EdmsState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(document_key): Path<String>,
    Form(form): Form<ReviewForm>,
) -> Result<Redirect, EdmsError> {
    let target = service(&state)
        .handle_form(&state.pool, user.0, &document_key, form, today())
        .await?;
    Ok(Redirect::to(target))
}

async fn start_review(
    State(state): State<EdmsState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(document_key): Path<String>,
) -> Result<Json<Revision>, EdmsError> {
    let revision = service(&state)
        .start_review(&state.pool, user.0, &document_key, today())
        .await?;
    Ok(Json(revision))
}

async fn cancel_review(
    State(state): State<EdmsState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(document_key): Path<String>,
) -> Result<Json<CancelResponse>, EdmsError> {
    let cancelled = service(&state)
        .cancel_review(&state.pool, user.0, &document_key)
        .await?;
    Ok(Json(CancelResponse { cancelled }))
}
