// src/services/mod.rs

pub mod access;
pub mod attempts;
pub mod scoring;
pub mod visibility;
