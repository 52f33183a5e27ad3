// Library for tests to access modules

pub mod collector;
pub mod config;
pub mod error;
pub mod history_repo;
pub mod models;
pub mod pve_repo;
pub mod routes;
pub mod series;
pub mod version;
