pub mod api;
pub mod board;
pub mod classify;
pub mod config;
pub mod humanize;
pub mod issuer;
pub mod links;
pub mod observability;
pub mod scheduler;
