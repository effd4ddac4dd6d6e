pub mod admin_service;
pub mod auth_service;
pub mod item_service;
pub mod swap_service;
