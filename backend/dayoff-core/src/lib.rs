// src/lib.rs

pub mod api;
pub mod clock;
pub mod config;
pub mod directory;
pub mod dispatch;
pub mod error;
pub mod import;
pub mod period;
pub mod quota;
pub mod reconcile;
pub mod schedule;
pub mod service;
pub mod status;
pub mod store;

mod api_tests;
