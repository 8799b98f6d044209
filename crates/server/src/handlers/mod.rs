//! # Route Handlers
//!
//! `general` serves the static status and sample endpoints; `query` exposes
//! the question-to-answer pipeline.

pub mod general;
pub mod query;

pub use self::{general::*, query::*};

pub use crate::{errors::AppError, state::AppState};
