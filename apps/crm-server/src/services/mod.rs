pub mod activity_service;
pub mod analytics_service;
pub mod auth_service;
pub mod contact_service;
pub mod deal_service;
pub mod permission;
pub mod task_service;
