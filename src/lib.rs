//! quire serves file-backed pages and counts their views in Postgres.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
