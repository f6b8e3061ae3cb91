pub mod cache;
pub mod profile;
pub mod user;
