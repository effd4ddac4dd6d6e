use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::swaps::{CreateSwapRequest, SwapAction, SwapList},
    entity::{
        clothing_items::{
            ActiveModel as ItemActive, Column as ItemCol, Entity as Items, Model as ItemModel,
        },
        swap_requests::{
            ActiveModel as SwapActive, Column as SwapCol, Entity as Swaps, Model as SwapModel,
        },
        users::{Column as UserCol, Entity as Users},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{ItemStatus, SWAP_REWARD_POINTS, SwapRequest, SwapStatus},
    response::{ApiResponse, Meta},
    routes::params::SwapListQuery,
    state::AppState,
};

/// Propose a swap: the caller offers their own item for somebody else's.
///
/// Creates the request in `pending` and moves both items to `in_negotiation`
/// in a single transaction, so an item can never be committed to two swaps.
pub async fn create_swap_request(
    state: &AppState,
    user: &AuthUser,
    payload: CreateSwapRequest,
) -> AppResult<ApiResponse<SwapRequest>> {
    if payload.from_item_id == payload.to_item_id {
        return Err(AppError::BadRequest("Cannot swap an item with itself".into()));
    }

    let txn = state.orm.begin().await?;

    // Lock the two item rows in id order so concurrent proposals over the
    // same pair cannot deadlock.
    let (first, second) = if payload.from_item_id < payload.to_item_id {
        (payload.from_item_id, payload.to_item_id)
    } else {
        (payload.to_item_id, payload.from_item_id)
    };
    let first_item = Items::find_by_id(first)
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let second_item = Items::find_by_id(second)
        .lock(LockType::Update)
        .one(&txn)
        .await?;

    let (first_item, second_item) = match (first_item, second_item) {
        (Some(a), Some(b)) => (a, b),
        _ => return Err(AppError::NotFound),
    };
    let (from_item, to_item) = if first_item.id == payload.from_item_id {
        (first_item, second_item)
    } else {
        (second_item, first_item)
    };

    if from_item.uploader_id != user.user_id {
        return Err(AppError::Unauthorized);
    }
    if to_item.uploader_id == user.user_id {
        return Err(AppError::BadRequest(
            "Cannot propose a swap for your own item".into(),
        ));
    }

    for item in [&from_item, &to_item] {
        match parse_item_status(item)? {
            ItemStatus::Available => {}
            ItemStatus::InNegotiation => {
                return Err(AppError::Conflict(format!(
                    "Item {} is already part of an active swap",
                    item.id
                )));
            }
            other => {
                return Err(AppError::BadRequest(format!(
                    "Item {} is not available ({other})",
                    item.id
                )));
            }
        }
    }

    // No duplicate active proposal over the ordered pair or its mirror.
    let active = [
        SwapStatus::Pending.as_str(),
        SwapStatus::Accepted.as_str(),
    ];
    let duplicate = Swaps::find()
        .filter(
            Condition::all()
                .add(SwapCol::Status.is_in(active))
                .add(
                    Condition::any()
                        .add(
                            Condition::all()
                                .add(SwapCol::FromItemId.eq(from_item.id))
                                .add(SwapCol::ToItemId.eq(to_item.id)),
                        )
                        .add(
                            Condition::all()
                                .add(SwapCol::FromItemId.eq(to_item.id))
                                .add(SwapCol::ToItemId.eq(from_item.id)),
                        ),
                ),
        )
        .one(&txn)
        .await?;
    if duplicate.is_some() {
        return Err(AppError::Conflict(
            "An active swap request already exists for these items".into(),
        ));
    }

    let from_user = Users::find_by_id(user.user_id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    let to_user = Users::find_by_id(to_item.uploader_id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let swap = SwapActive {
        id: Set(Uuid::new_v4()),
        from_user_id: Set(from_user.id),
        from_user_name: Set(from_user.name.clone()),
        from_item_id: Set(from_item.id),
        from_item_title: Set(from_item.title.clone()),
        from_item_image: Set(first_image(&from_item)),
        to_user_id: Set(to_user.id),
        to_user_name: Set(to_user.name.clone()),
        to_item_id: Set(to_item.id),
        to_item_title: Set(to_item.title.clone()),
        to_item_image: Set(first_image(&to_item)),
        status: Set(SwapStatus::Pending.as_str().to_owned()),
        message: Set(payload.message),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    for item in [from_item, to_item] {
        let mut active: ItemActive = item.into();
        active.status = Set(ItemStatus::InNegotiation.as_str().to_owned());
        active.updated_at = Set(Utc::now().into());
        active.update(&txn).await?;
    }

    txn.commit()
        .await
        .map_err(|_| AppError::TransactionFailed)?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "swap_propose",
        Some("swap_requests"),
        Some(serde_json::json!({ "swap_id": swap.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Swap request created",
        swap_from_entity(swap)?,
        Some(Meta::empty()),
    ))
}

/// Accept or reject a pending request. Only the recipient may respond.
///
/// Accept keeps both items `in_negotiation` until the exchange is marked
/// complete; reject returns them to `available`.
pub async fn respond_to_swap(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    action: SwapAction,
) -> AppResult<ApiResponse<SwapRequest>> {
    let target = match action {
        SwapAction::Accept => SwapStatus::Accepted,
        SwapAction::Reject => SwapStatus::Rejected,
    };

    let txn = state.orm.begin().await?;

    let swap = Swaps::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    if swap.to_user_id != user.user_id {
        return Err(AppError::Unauthorized);
    }

    let swap = transition(&txn, swap, target).await?;

    txn.commit()
        .await
        .map_err(|_| AppError::TransactionFailed)?;

    let action_name = match action {
        SwapAction::Accept => "swap_accept",
        SwapAction::Reject => "swap_reject",
    };
    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        action_name,
        Some("swap_requests"),
        Some(serde_json::json!({ "swap_id": swap.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Swap request updated",
        swap_from_entity(swap)?,
        Some(Meta::empty()),
    ))
}

/// Mark an accepted swap as physically exchanged. Either participant may
/// complete; both items become `swapped` and both users earn the fixed
/// points reward plus a swap-history increment, atomically.
pub async fn complete_swap(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<SwapRequest>> {
    let txn = state.orm.begin().await?;

    let swap = Swaps::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    if swap.from_user_id != user.user_id && swap.to_user_id != user.user_id {
        return Err(AppError::Unauthorized);
    }

    let from_user_id = swap.from_user_id;
    let to_user_id = swap.to_user_id;
    let swap = transition(&txn, swap, SwapStatus::Completed).await?;

    Users::update_many()
        .col_expr(
            UserCol::Points,
            Expr::col(UserCol::Points).add(SWAP_REWARD_POINTS),
        )
        .col_expr(
            UserCol::SwapHistory,
            Expr::col(UserCol::SwapHistory).add(1),
        )
        .filter(UserCol::Id.is_in([from_user_id, to_user_id]))
        .exec(&txn)
        .await?;

    txn.commit()
        .await
        .map_err(|_| AppError::TransactionFailed)?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "swap_complete",
        Some("swap_requests"),
        Some(serde_json::json!({ "swap_id": swap.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Swap completed",
        swap_from_entity(swap)?,
        Some(Meta::empty()),
    ))
}

/// Withdraw a request that has not reached a terminal state. Initiator only;
/// both items return to `available`.
pub async fn cancel_swap(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<SwapRequest>> {
    let txn = state.orm.begin().await?;

    let swap = Swaps::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    if swap.from_user_id != user.user_id {
        return Err(AppError::Unauthorized);
    }

    let swap = transition(&txn, swap, SwapStatus::Cancelled).await?;

    txn.commit()
        .await
        .map_err(|_| AppError::TransactionFailed)?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "swap_cancel",
        Some("swap_requests"),
        Some(serde_json::json!({ "swap_id": swap.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Swap request cancelled",
        swap_from_entity(swap)?,
        Some(Meta::empty()),
    ))
}

/// All requests where the caller is either party, newest first.
pub async fn list_swaps(
    state: &AppState,
    user: &AuthUser,
    query: SwapListQuery,
) -> AppResult<ApiResponse<SwapList>> {
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all().add(
        Condition::any()
            .add(SwapCol::FromUserId.eq(user.user_id))
            .add(SwapCol::ToUserId.eq(user.user_id)),
    );
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(SwapCol::Status.eq(status.clone()));
    }

    let finder = Swaps::find()
        .filter(condition)
        .order_by_desc(SwapCol::CreatedAt);

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

/// Apply a request-status transition and project the implied item status onto
/// both referenced items inside the caller's transaction.
async fn transition(
    txn: &sea_orm::DatabaseTransaction,
    swap: SwapModel,
    target: SwapStatus,
) -> AppResult<SwapModel> {
    let current: SwapStatus = swap
        .status
        .parse()
        .map_err(|e: String| AppError::Internal(anyhow::anyhow!(e)))?;
    if !current.can_transition_to(target) {
        return Err(AppError::InvalidTransition(format!(
            "{current} -> {target}"
        )));
    }

    let from_item_id = swap.from_item_id;
    let to_item_id = swap.to_item_id;

    let mut active: SwapActive = swap.into();
    active.status = Set(target.as_str().to_owned());
    active.updated_at = Set(Utc::now().into());
    let swap = active.update(txn).await?;

    let item_status = target.implied_item_status();
    if item_status != ItemStatus::InNegotiation {
        Items::update_many()
            .col_expr(ItemCol::Status, Expr::value(item_status.as_str()))
            .col_expr(ItemCol::UpdatedAt, Expr::value(Utc::now()))
            .filter(ItemCol::Id.is_in([from_item_id, to_item_id]))
            .exec(txn)
            .await?;
    }

    Ok(swap)
}

fn parse_item_status(item: &ItemModel) -> AppResult<ItemStatus> {
    item.status
        .parse()
        .map_err(|e: String| AppError::Internal(anyhow::anyhow!(e)))
}

fn first_image(item: &ItemModel) -> String {
    serde_json::from_value::<Vec<String>>(item.images.clone())
        .ok()
        .and_then(|images| images.into_iter().next())
        .unwrap_or_default()
}

pub fn swap_from_entity(model: SwapModel) -> AppResult<SwapRequest> {
    let status = model
        .status
        .parse()
        .map_err(|e: String| AppError::Internal(anyhow::anyhow!(e)))?;
    Ok(SwapRequest {
        id: model.id,
        from_user_id: model.from_user_id,
        from_user_name: model.from_user_name,
        from_item_id: model.from_item_id,
        from_item_title: model.from_item_title,
        from_item_image: model.from_item_image,
        to_user_id: model.to_user_id,
        to_user_name: model.to_user_name,
        to_item_id: model.to_item_id,
        to_item_title: model.to_item_title,
        to_item_image: model.to_item_image,
        status,
        message: model.message,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}
