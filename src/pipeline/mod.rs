pub mod extract;
pub mod identity;
pub mod improvement;
pub mod listing;
pub mod navigation;
pub mod page;
pub mod plan;
pub mod strategy;
pub mod types;
