#![warn(clippy::all, rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod map;
pub mod maps_api;
pub mod offices;
pub mod session;
pub mod ui;
pub mod viewport;
