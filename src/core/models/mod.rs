pub mod aggregation;
pub mod chart;
pub mod credentials;
pub mod settings;
pub mod snapshot;
pub mod summary;
pub mod team;
pub mod usage;
