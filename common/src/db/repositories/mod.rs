// Repository layer for database operations

pub mod business;

pub use business::{BusinessRepository, BusinessStore};
