pub mod builder;
pub mod catalog;
pub mod config;
pub mod errors;
pub mod grid;
pub mod layout;
pub mod model;
pub mod routes;
pub mod signature;
pub mod state;
pub mod storage;
