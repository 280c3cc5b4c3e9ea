//! Authentication module for the Phase server

pub mod api_key;
pub mod middleware;
pub mod service;
