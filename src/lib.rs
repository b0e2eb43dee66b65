pub mod catalog;
pub mod config;
pub mod demo;
pub mod feed;
pub mod format;
pub mod market;
pub mod portfolio;
pub mod server;
pub mod session;
pub mod stock;
pub mod trade;
pub mod tui;
pub mod views;
