pub mod config;
pub mod sinkhorn;
