// Library exports for redblack
// The binary and integration tests both drive the core through these modules

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod posts;
pub mod state;
pub mod storage;
