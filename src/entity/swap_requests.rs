use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "swap_requests")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: Uuid,
    pub from_user_id: Uuid,
    pub from_user_name: String,
    pub from_item_id: Uuid,
    pub from_item_title: String,
    pub from_item_image: String,
    pub to_user_id: Uuid,
    pub to_user_name: String,
    pub to_item_id: Uuid,
    pub to_item_title: String,
    pub to_item_image: String,
    pub status: String,
    pub message: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::FromUserId",
        to = "super::users::Column::Id"
    )]
    FromUser,
    #[sea_orm(
        belongs_to = "super::clothing_items::Entity",
        from = "Column::FromItemId",
        to = "super::clothing_items::Column::Id"
    )]
    FromItem,
}

impl ActiveModelBehavior for ActiveModel {}
