//! Inspect Run - one-shot AWS Inspector assessments
//!
//! Provisions the resources an Inspector assessment needs, runs it against
//! tagged instances, reports the findings as JSON and tears everything down.

pub mod cli;
pub mod config;
pub mod error;
pub mod interrupt;
pub mod runner;
pub mod service;
