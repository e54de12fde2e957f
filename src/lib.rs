//! Adaptive Spanish verb conjugation drills.
//!
//! The drill pipeline runs corpus → filters → fallback → generator, with the
//! integrity guard checking every pick. Progress (mastery, spaced repetition,
//! daily challenges) lives in a local SQLite store.

pub mod analytics;
pub mod challenges;
pub mod config;
pub mod corpus;
pub mod curriculum;
pub mod db;
pub mod error;
pub mod fallback;
pub mod filters;
pub mod generator;
pub mod grading;
pub mod history;
pub mod mastery;
pub mod models;
pub mod srs;
pub mod validation;
