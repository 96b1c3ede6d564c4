//! discussboard - A discussion board backend
//!
//! Members write posts and threaded comments, react and report; moderators
//! work the report queue; administrators manage accounts and board
//! settings. Everything is served as a JSON API over SQLite.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
