use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use sea_orm::sea_query::extension::postgres::PgExpr;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::items::{CreateItemRequest, ItemList, LikeResponse, RedeemResponse, UpdateItemRequest},
    entity::{
        clothing_items::{
            ActiveModel as ItemActive, Column as ItemCol, Entity as Items, Model as ItemModel,
        },
        users::{ActiveModel as UserActive, Column as UserCol, Entity as Users},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{ClothingItem, DEFAULT_ITEM_POINTS, ItemStatus},
    response::{ApiResponse, Meta},
    routes::params::{ItemQuery, Pagination},
    state::AppState,
};

/// Public catalog browse: only `available` listings.
pub async fn list_items(state: &AppState, query: ItemQuery) -> AppResult<ApiResponse<ItemList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition =
        Condition::all().add(ItemCol::Status.eq(ItemStatus::Available.as_str()));

    if let Some(category) = query.category.as_ref().filter(|c| !c.is_empty() && c.as_str() != "all") {
        condition = condition.add(ItemCol::Category.eq(category.clone()));
    }
    if let Some(item_type) = query.item_type.as_ref().filter(|t| !t.is_empty() && t.as_str() != "all") {
        condition = condition.add(ItemCol::ItemType.eq(item_type.clone()));
    }
    if let Some(item_condition) = query.condition.as_ref().filter(|c| !c.is_empty() && c.as_str() != "all")
    {
        condition = condition.add(ItemCol::Condition.eq(item_condition.clone()));
    }
    if let Some(search) = query.q.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(ItemCol::Title).ilike(pattern.clone()))
                .add(Expr::col(ItemCol::Description).ilike(pattern)),
        );
    }

    let finder = Items::find()
        .filter(condition)
        .order_by_desc(ItemCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(item_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Items", ItemList { items }, Some(meta)))
}

/// The caller's own listings, whatever their status.
pub async fn list_my_items(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<ItemList>> {
    let (page, limit, offset) = pagination.normalize();

    let finder = Items::find()
        .filter(ItemCol::UploaderId.eq(user.user_id))
        .order_by_desc(ItemCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(item_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Items", ItemList { items }, Some(meta)))
}

/// Item detail. Each fetch counts as a view.
pub async fn get_item(state: &AppState, id: Uuid) -> AppResult<ApiResponse<ClothingItem>> {
    let item = Items::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    Items::update_many()
        .col_expr(ItemCol::Views, Expr::col(ItemCol::Views).add(1))
        .filter(ItemCol::Id.eq(id))
        .exec(&state.orm)
        .await?;

    let mut item = item_from_entity(item)?;
    item.views += 1;
    Ok(ApiResponse::success("Item", item, None))
}

pub async fn create_item(
    state: &AppState,
    user: &AuthUser,
    payload: CreateItemRequest,
) -> AppResult<ApiResponse<ClothingItem>> {
    if payload.title.trim().is_empty()
        || payload.description.trim().is_empty()
        || payload.category.trim().is_empty()
    {
        return Err(AppError::BadRequest(
            "title, description and category are required".into(),
        ));
    }
    let points = payload.points.unwrap_or(DEFAULT_ITEM_POINTS);
    if points < 0 {
        return Err(AppError::BadRequest(
            "point value must be non-negative".into(),
        ));
    }

    let uploader = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let item = ItemActive {
        id: Set(Uuid::new_v4()),
        title: Set(payload.title),
        description: Set(payload.description),
        images: Set(serde_json::json!(payload.images)),
        category: Set(payload.category),
        item_type: Set(payload.item_type),
        size: Set(payload.size),
        condition: Set(payload.condition),
        points: Set(points),
        tags: Set(serde_json::json!(payload.tags)),
        uploader_id: Set(uploader.id),
        uploader_name: Set(uploader.name),
        status: Set(ItemStatus::Available.as_str().to_owned()),
        views: Set(0),
        likes: Set(serde_json::json!([])),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "item_create",
        Some("clothing_items"),
        Some(serde_json::json!({ "item_id": item.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Item created",
        item_from_entity(item)?,
        Some(Meta::empty()),
    ))
}

/// Owner (or admin) edits descriptive fields. Status is never editable here;
/// it moves only through swap transitions and moderation.
pub async fn update_item(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateItemRequest,
) -> AppResult<ApiResponse<ClothingItem>> {
    let existing = Items::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    if existing.uploader_id != user.user_id && user.role != "admin" {
        return Err(AppError::Unauthorized);
    }

    if let Some(points) = payload.points {
        if points < 0 {
            return Err(AppError::BadRequest(
                "point value must be non-negative".into(),
            ));
        }
    }

    let mut active: ItemActive = existing.into();
    if let Some(title) = payload.title {
        active.title = Set(title);
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(images) = payload.images {
        active.images = Set(serde_json::json!(images));
    }
    if let Some(category) = payload.category {
        active.category = Set(category);
    }
    if let Some(item_type) = payload.item_type {
        active.item_type = Set(item_type);
    }
    if let Some(size) = payload.size {
        active.size = Set(size);
    }
    if let Some(condition) = payload.condition {
        active.condition = Set(condition);
    }
    if let Some(points) = payload.points {
        active.points = Set(points);
    }
    if let Some(tags) = payload.tags {
        active.tags = Set(serde_json::json!(tags));
    }
    active.updated_at = Set(Utc::now().into());

    let item = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "item_update",
        Some("clothing_items"),
        Some(serde_json::json!({ "item_id": item.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Updated",
        item_from_entity(item)?,
        Some(Meta::empty()),
    ))
}

/// Toggle the caller in the item's like set. Independent of the swap core.
pub async fn toggle_like(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<LikeResponse>> {
    let txn = state.orm.begin().await?;

    let item = Items::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut likes: Vec<Uuid> =
        serde_json::from_value(item.likes.clone()).unwrap_or_default();
    let liked = if likes.contains(&user.user_id) {
        likes.retain(|liker| *liker != user.user_id);
        false
    } else {
        likes.push(user.user_id);
        true
    };

    let mut active: ItemActive = item.into();
    active.likes = Set(serde_json::json!(likes));
    active.update(&txn).await?;

    txn.commit()
        .await
        .map_err(|_| AppError::TransactionFailed)?;

    Ok(ApiResponse::success(
        if liked { "Liked" } else { "Unliked" },
        LikeResponse { liked },
        Some(Meta::empty()),
    ))
}

/// Redeem a listing with points instead of a counter-item: deduct the item's
/// point value from the redeemer, credit the uploader, and mark the item
/// `swapped`, as one unit.
pub async fn redeem_item(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<RedeemResponse>> {
    let txn = state.orm.begin().await?;

    let item = Items::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let status: ItemStatus = item
        .status
        .parse()
        .map_err(|e: String| AppError::Internal(anyhow::anyhow!(e)))?;
    if status == ItemStatus::InNegotiation {
        return Err(AppError::Conflict(
            "Item is part of an active swap".into(),
        ));
    }
    if status != ItemStatus::Available {
        return Err(AppError::BadRequest(format!(
            "Item is not available ({status})"
        )));
    }
    if item.uploader_id == user.user_id {
        return Err(AppError::BadRequest("Cannot redeem your own item".into()));
    }

    let redeemer = Users::find_by_id(user.user_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    if redeemer.points < item.points {
        return Err(AppError::BadRequest(format!(
            "Insufficient points: need {}, have {}",
            item.points, redeemer.points
        )));
    }

    let points_spent = item.points;
    let remaining_points = redeemer.points - points_spent;
    let uploader_id = item.uploader_id;

    let mut redeemer: UserActive = redeemer.into();
    redeemer.points = Set(remaining_points);
    redeemer.updated_at = Set(Utc::now().into());
    redeemer.update(&txn).await?;

    Users::update_many()
        .col_expr(UserCol::Points, Expr::col(UserCol::Points).add(points_spent))
        .filter(UserCol::Id.eq(uploader_id))
        .exec(&txn)
        .await?;

    let mut active: ItemActive = item.into();
    active.status = Set(ItemStatus::Swapped.as_str().to_owned());
    active.updated_at = Set(Utc::now().into());
    let item = active.update(&txn).await?;

    txn.commit()
        .await
        .map_err(|_| AppError::TransactionFailed)?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "item_redeem",
        Some("clothing_items"),
        Some(serde_json::json!({ "item_id": id, "points": points_spent })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Item redeemed",
        RedeemResponse {
            item: item_from_entity(item)?,
            points_spent,
            remaining_points,
        },
        Some(Meta::empty()),
    ))
}

pub fn item_from_entity(model: ItemModel) -> AppResult<ClothingItem> {
    let status = model
        .status
        .parse()
        .map_err(|e: String| AppError::Internal(anyhow::anyhow!(e)))?;
    Ok(ClothingItem {
        id: model.id,
        title: model.title,
        description: model.description,
        images: serde_json::from_value(model.images).unwrap_or_default(),
        category: model.category,
        item_type: model.item_type,
        size: model.size,
        condition: model.condition,
        points: model.points,
        tags: serde_json::from_value(model.tags).unwrap_or_default(),
        uploader_id: model.uploader_id,
        uploader_name: model.uploader_name,
        status,
        views: model.views,
        likes: serde_json::from_value(model.likes).unwrap_or_default(),
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}
