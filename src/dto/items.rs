use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::ClothingItem;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateItemRequest {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub images: Vec<String>,
    pub category: String,
    #[serde(rename = "type")]
    pub item_type: String,
    pub size: String,
    pub condition: String,
    pub points: Option<i32>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateItemRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub images: Option<Vec<String>>,
    pub category: Option<String>,
    #[serde(rename = "type")]
    pub item_type: Option<String>,
    pub size: Option<String>,
    pub condition: Option<String>,
    pub points: Option<i32>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ItemList {
    pub items: Vec<ClothingItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LikeResponse {
    pub liked: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RedeemResponse {
    pub item: ClothingItem,
    pub points_spent: i32,
    pub remaining_points: i32,
}
