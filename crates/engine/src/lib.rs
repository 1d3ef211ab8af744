pub mod catalog;
pub mod config;
pub mod lineage;
pub mod routes;
pub mod store;
