#![allow(dead_code)]

pub mod adaptive_session;
pub mod ai_provider;
pub mod analytics;
pub mod profile;
