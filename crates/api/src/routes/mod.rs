//! HTTP Routes

pub mod capture;
pub mod health;
