//! # Prompt Template Modules
//!
//! This module organizes all prompt templates used by the `askdb` pipeline.

pub mod core;
pub mod samples;

pub use self::core::*;
pub use samples::SAMPLE_QUESTIONS;
