pub mod audit_logs;
pub mod clothing_items;
pub mod swap_requests;
pub mod users;

pub use audit_logs::Entity as AuditLogs;
pub use clothing_items::Entity as ClothingItems;
pub use swap_requests::Entity as SwapRequests;
pub use users::Entity as Users;
