// Common library for the trigger engine: detection, rules, dispatch, and
// the clients and storage they run against.

pub mod baseline;
pub mod config;
pub mod db;
pub mod detection;
pub mod dispatch;
pub mod errors;
pub mod geocode;
pub mod localtime;
pub mod models;
pub mod pipeline;
pub mod retry;
pub mod rules;
pub mod scheduler_client;
pub mod telemetry;
pub mod weather;
