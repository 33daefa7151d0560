//! HTTP Routes

pub mod alerts;
pub mod webhook;
