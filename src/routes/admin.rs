use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch},
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::{items::ItemList, swaps::SwapList},
    error::AppResult,
    middleware::auth::AuthUser,
    models::{ClothingItem, ItemStatus},
    response::ApiResponse,
    routes::params::{AdminItemQuery, AdminSwapQuery},
    services::admin_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/items", get(list_items_for_review))
        .route("/items/{id}/status", patch(set_item_status))
        .route("/swaps", get(list_all_swaps))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ModerateItemRequest {
    pub status: ItemStatus,
}

#[utoipa::path(
    get,
    path = "/api/admin/items",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "Filter by status, default pending"),
    ),
    responses(
        (status = 200, description = "Moderation review queue", body = ApiResponse<ItemList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_items_for_review(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<AdminItemQuery>,
) -> AppResult<Json<ApiResponse<ItemList>>> {
    let resp = admin_service::list_items_for_review(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/admin/items/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Item ID")
    ),
    request_body = ModerateItemRequest,
    responses(
        (status = 200, description = "Item status updated", body = ApiResponse<ClothingItem>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn set_item_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ModerateItemRequest>,
) -> AppResult<Json<ApiResponse<ClothingItem>>> {
    let resp = admin_service::set_item_status(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/swaps",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("sort_order" = Option<String>, Query, description = "Sort order: asc, desc"),
    ),
    responses(
        (status = 200, description = "All swap requests", body = ApiResponse<SwapList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_all_swaps(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<AdminSwapQuery>,
) -> AppResult<Json<ApiResponse<SwapList>>> {
    let resp = admin_service::list_all_swaps(&state, &user, query).await?;
    Ok(Json(resp))
}
