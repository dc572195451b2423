//! ID manager library
//!
//! Local storage for identifier strings with notes and colored search
//! tags, plus the query builder that turns an item into a web search.

pub mod app;
pub mod config;
pub mod database;
pub mod error;
pub mod services;
