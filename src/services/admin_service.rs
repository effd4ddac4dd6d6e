use chrono::Utc;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::{items::ItemList, swaps::SwapList},
    entity::{
        clothing_items::{ActiveModel as ItemActive, Column as ItemCol, Entity as Items},
        swap_requests::{Column as SwapCol, Entity as Swaps},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{ClothingItem, ItemStatus},
    response::{ApiResponse, Meta},
    routes::admin::ModerateItemRequest,
    routes::params::{AdminItemQuery, AdminSwapQuery, SortOrder},
    services::{item_service::item_from_entity, swap_service::swap_from_entity},
    state::AppState,
};

/// Moderation review queue. Defaults to listings awaiting approval.
pub async fn list_items_for_review(
    state: &AppState,
    user: &AuthUser,
    query: AdminItemQuery,
) -> AppResult<ApiResponse<ItemList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let status = query
        .status
        .as_ref()
        .filter(|s| !s.is_empty())
        .cloned()
        .unwrap_or_else(|| ItemStatus::Pending.as_str().to_owned());

    let finder = Items::find()
        .filter(ItemCol::Status.eq(status))
        .order_by_asc(ItemCol::CreatedAt);

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
    Ok(ApiResponse::success(
        "Items for review",
        ItemList { items },
        Some(meta),
    ))
}

/// Moderation verdict: approve, reject/remove, or re-queue a listing.
/// This is the one item-status mutation path outside swap transitions.
pub async fn set_item_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: ModerateItemRequest,
) -> AppResult<ApiResponse<ClothingItem>> {
    ensure_admin(user)?;

    let txn = state.orm.begin().await?;

    let item = Items::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: ItemActive = item.into();
    active.status = Set(payload.status.as_str().to_owned());
    active.updated_at = Set(Utc::now().into());
    let item = active.update(&txn).await?;

    txn.commit()
        .await
        .map_err(|_| AppError::TransactionFailed)?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "item_moderate",
        Some("clothing_items"),
        Some(serde_json::json!({ "item_id": id, "status": payload.status })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Item status updated",
        item_from_entity(item)?,
        Some(Meta::empty()),
    ))
}

/// Every swap request on the platform, for the admin dashboard.
pub async fn list_all_swaps(
    state: &AppState,
    user: &AuthUser,
    query: AdminSwapQuery,
) -> AppResult<ApiResponse<SwapList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(SwapCol::Status.eq(status.clone()));
    }

    let mut finder = Swaps::find().filter(condition);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(SwapCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(SwapCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let swaps = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(swap_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Swap requests",
        SwapList { items: swaps },
        Some(meta),
    ))
}
