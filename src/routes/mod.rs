// # Routes Module
//
// HTTP route handlers for the league worker, organized by functionality.

/// Health check and monitoring endpoints
pub mod health;

/// Trade analysis lookup endpoints
pub mod analysis;
