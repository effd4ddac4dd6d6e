use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post, put},
};
use uuid::Uuid;

use crate::{
    dto::items::{CreateItemRequest, ItemList, LikeResponse, RedeemResponse, UpdateItemRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::ClothingItem,
    response::ApiResponse,
    routes::params::{ItemQuery, Pagination},
    services::item_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_items).post(create_item))
        .route("/mine", get(list_my_items))
        .route("/{id}", get(get_item))
        .route("/{id}", put(update_item))
        .route("/{id}/like", post(toggle_like))
        .route("/{id}/redeem", post(redeem_item))
}

#[utoipa::path(
    get,
    path = "/api/items",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("category" = Option<String>, Query, description = "Filter by category"),
        ("type" = Option<String>, Query, description = "Filter by garment type"),
        ("condition" = Option<String>, Query, description = "Filter by condition"),
        ("q" = Option<String>, Query, description = "Search in title and description"),
    ),
    responses(
        (status = 200, description = "Browse available items", body = ApiResponse<ItemList>)
    ),
    tag = "Items"
)]
pub async fn list_items(
    State(state): State<AppState>,
    Query(query): Query<ItemQuery>,
) -> AppResult<Json<ApiResponse<ItemList>>> {
    let resp = item_service::list_items(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/items/mine",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
    ),
    responses(
        (status = 200, description = "Caller's own listings", body = ApiResponse<ItemList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Items"
)]
pub async fn list_my_items(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<ItemList>>> {
    let resp = item_service::list_my_items(&state, &user, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/items/{id}",
    params(
        ("id" = Uuid, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Item detail", body = ApiResponse<ClothingItem>),
        (status = 404, description = "Item not found"),
    ),
    tag = "Items"
)]
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ClothingItem>>> {
    let resp = item_service::get_item(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/items",
    request_body = CreateItemRequest,
    responses(
        (status = 201, description = "Create listing", body = ApiResponse<ClothingItem>),
        (status = 400, description = "Missing required fields"),
    ),
    security(("bearer_auth" = [])),
    tag = "Items"
)]
pub async fn create_item(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateItemRequest>,
) -> AppResult<Json<ApiResponse<ClothingItem>>> {
    let resp = item_service::create_item(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/items/{id}",
    params(
        ("id" = Uuid, Path, description = "Item ID")
    ),
    request_body = UpdateItemRequest,
    responses(
        (status = 200, description = "Updated listing", body = ApiResponse<ClothingItem>),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Item not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Items"
)]
pub async fn update_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateItemRequest>,
) -> AppResult<Json<ApiResponse<ClothingItem>>> {
    let resp = item_service::update_item(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/items/{id}/like",
    params(
        ("id" = Uuid, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Toggled like", body = ApiResponse<LikeResponse>),
        (status = 404, description = "Item not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Items"
)]
pub async fn toggle_like(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<LikeResponse>>> {
    let resp = item_service::toggle_like(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/items/{id}/redeem",
    params(
        ("id" = Uuid, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Item redeemed with points", body = ApiResponse<RedeemResponse>),
        (status = 400, description = "Insufficient points or item unavailable"),
        (status = 404, description = "Item not found"),
        (status = 409, description = "Item is in an active swap"),
    ),
    security(("bearer_auth" = [])),
    tag = "Items"
)]
pub async fn redeem_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<RedeemResponse>>> {
    let resp = item_service::redeem_item(&state, &user, id).await?;
    Ok(Json(resp))
}
