pub mod analysis;
pub mod app;
pub mod config;
pub mod db;
pub mod models;
