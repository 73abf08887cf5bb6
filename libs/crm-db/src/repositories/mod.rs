pub mod activity_repo;
pub mod contact_repo;
pub mod deal_repo;
pub mod org_repo;
pub mod task_repo;
pub mod user_repo;
