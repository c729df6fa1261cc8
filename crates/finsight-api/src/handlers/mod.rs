//! Handler modules for finsight-api.

pub mod analysis;
pub mod documents;
pub mod frameworks;
pub mod knowledge;
pub mod system;
