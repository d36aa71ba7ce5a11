//! API handlers module

pub mod health;
pub mod contacts;
pub mod sessions;
