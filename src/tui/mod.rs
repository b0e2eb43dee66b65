pub mod app;
mod widgets;
