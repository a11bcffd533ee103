// Library for the binary, the demos and the integration tests

pub mod alerts;
pub mod cli;
pub mod config;
pub mod context;
pub mod dashboard;
pub mod error;
pub mod maintenance;
pub mod models;
pub mod recommend;
pub mod routes;
pub mod source;
pub mod store;
pub mod worker;
