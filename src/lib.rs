//! medscan - medical document OCR result processing.
//!
//! Turns raw text-recognition responses into normalized per-document results,
//! extracts medical entities, aggregates confidence statistics and builds
//! batch analysis reports.

pub mod cli;
pub mod config;
pub mod models;
pub mod services;
pub mod storage;
