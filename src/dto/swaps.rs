use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::SwapRequest;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSwapRequest {
    pub from_item_id: Uuid,
    pub to_item_id: Uuid,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SwapAction {
    Accept,
    Reject,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RespondSwapRequest {
    pub action: SwapAction,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SwapList {
    pub items: Vec<SwapRequest>,
}
