use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        items::{CreateItemRequest, ItemList, LikeResponse, RedeemResponse, UpdateItemRequest},
        swaps::{CreateSwapRequest, RespondSwapRequest, SwapList},
    },
    models::{ClothingItem, ItemStatus, SwapRequest, SwapStatus, User},
    response::{ApiResponse, Meta},
    routes::{admin, auth, health, items, params, swaps},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::me,
        items::list_items,
        items::list_my_items,
        items::get_item,
        items::create_item,
        items::update_item,
        items::toggle_like,
        items::redeem_item,
        swaps::list_swaps,
        swaps::create_swap,
        swaps::respond_to_swap,
        swaps::complete_swap,
        swaps::cancel_swap,
        admin::list_items_for_review,
        admin::set_item_status,
        admin::list_all_swaps
    ),
    components(
        schemas(
            User,
            ClothingItem,
            SwapRequest,
            ItemStatus,
            SwapStatus,
            CreateItemRequest,
            UpdateItemRequest,
            ItemList,
            LikeResponse,
            RedeemResponse,
            CreateSwapRequest,
            RespondSwapRequest,
            SwapList,
            admin::ModerateItemRequest,
            params::Pagination,
            params::ItemQuery,
            params::SwapListQuery,
            Meta,
            ApiResponse<ClothingItem>,
            ApiResponse<ItemList>,
            ApiResponse<SwapRequest>,
            ApiResponse<SwapList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Items", description = "Clothing item endpoints"),
        (name = "Swaps", description = "Swap lifecycle endpoints"),
        (name = "Admin", description = "Moderation endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
