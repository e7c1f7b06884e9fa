// Upstream Amplifi integration: token lifecycle, chat routing, dispatch
pub mod amplifi;

// HTTP API
pub mod api;

// Bearer token parsing and JWT sessions
pub mod auth;

// Settings from environment or TOML
pub mod config;

// Local user accounts
pub mod users;
