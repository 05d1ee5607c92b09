pub mod backup;
pub mod export;
pub mod stats;
