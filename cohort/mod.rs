pub mod config;
pub mod data;
pub mod export;
pub mod filter;
pub mod insight;
pub mod pipeline;
pub mod record;
pub mod summary;
