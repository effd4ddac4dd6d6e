use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::swaps::{CreateSwapRequest, RespondSwapRequest, SwapList},
    error::AppResult,
    middleware::auth::AuthUser,
    models::SwapRequest,
    response::ApiResponse,
    routes::params::SwapListQuery,
    services::swap_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_swaps).post(create_swap))
        .route("/{id}/respond", post(respond_to_swap))
        .route("/{id}/complete", post(complete_swap))
        .route("/{id}/cancel", post(cancel_swap))
}

#[utoipa::path(
    get,
    path = "/api/swaps",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "Filter by status"),
    ),
    responses(
        (status = 200, description = "Swap requests involving the caller", body = ApiResponse<SwapList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Swaps"
)]
pub async fn list_swaps(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<SwapListQuery>,
) -> AppResult<Json<ApiResponse<SwapList>>> {
    let resp = swap_service::list_swaps(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/swaps",
    request_body = CreateSwapRequest,
    responses(
        (status = 200, description = "Swap proposed", body = ApiResponse<SwapRequest>),
        (status = 404, description = "Item not found"),
        (status = 409, description = "Item already committed to an active swap"),
    ),
    security(("bearer_auth" = [])),
    tag = "Swaps"
)]
pub async fn create_swap(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateSwapRequest>,
) -> AppResult<Json<ApiResponse<SwapRequest>>> {
    let resp = swap_service::create_swap_request(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/swaps/{id}/respond",
    params(
        ("id" = Uuid, Path, description = "Swap request ID")
    ),
    request_body = RespondSwapRequest,
    responses(
        (status = 200, description = "Swap accepted or rejected", body = ApiResponse<SwapRequest>),
        (status = 403, description = "Only the recipient may respond"),
        (status = 404, description = "Swap request not found"),
        (status = 409, description = "Request is not pending"),
    ),
    security(("bearer_auth" = [])),
    tag = "Swaps"
)]
pub async fn respond_to_swap(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RespondSwapRequest>,
) -> AppResult<Json<ApiResponse<SwapRequest>>> {
    let resp = swap_service::respond_to_swap(&state, &user, id, payload.action).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/swaps/{id}/complete",
    params(
        ("id" = Uuid, Path, description = "Swap request ID")
    ),
    responses(
        (status = 200, description = "Swap completed", body = ApiResponse<SwapRequest>),
        (status = 403, description = "Only a participant may complete"),
        (status = 404, description = "Swap request not found"),
        (status = 409, description = "Request is not accepted"),
    ),
    security(("bearer_auth" = [])),
    tag = "Swaps"
)]
pub async fn complete_swap(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<SwapRequest>>> {
    let resp = swap_service::complete_swap(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/swaps/{id}/cancel",
    params(
        ("id" = Uuid, Path, description = "Swap request ID")
    ),
    responses(
        (status = 200, description = "Swap withdrawn", body = ApiResponse<SwapRequest>),
        (status = 403, description = "Only the initiator may cancel"),
        (status = 404, description = "Swap request not found"),
        (status = 409, description = "Request already terminal"),
    ),
    security(("bearer_auth" = [])),
    tag = "Swaps"
)]
pub async fn cancel_swap(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<SwapRequest>>> {
    let resp = swap_service::cancel_swap(&state, &user, id).await?;
    Ok(Json(resp))
}
