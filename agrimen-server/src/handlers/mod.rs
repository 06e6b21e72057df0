//! HTTP handlers

pub mod batch;
pub mod health;
pub mod locales;
pub mod models;
pub mod predict;
