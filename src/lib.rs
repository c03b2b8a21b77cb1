pub mod config;
pub mod core;
pub mod event;
pub mod index;
pub mod stats;
pub mod storage;
