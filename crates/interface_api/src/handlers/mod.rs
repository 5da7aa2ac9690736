//! Request handlers

pub mod backup;
pub mod bills;
pub mod data;
pub mod health;
pub mod settings;
