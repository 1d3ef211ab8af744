mod asset;
mod edge;
mod lineage;

pub use asset::*;
pub use edge::*;
pub use lineage::*;
