pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod integrations;
pub mod middleware;
pub mod services;
pub mod state;
