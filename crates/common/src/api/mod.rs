pub mod catalog;
pub mod lineage;
