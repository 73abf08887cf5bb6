pub mod activity;
pub mod contact;
pub mod deal;
pub mod orgs;
pub mod task;
pub mod user;
