pub mod server;
pub mod storage;
pub mod users;
pub mod identity;
pub mod departments;
pub mod eligibility;
pub mod error;
