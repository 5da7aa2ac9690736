//! Request and response bodies

pub mod backup;
pub mod bills;
pub mod settings;
