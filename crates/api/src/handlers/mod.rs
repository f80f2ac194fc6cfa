//! Request handlers for the processing API.
//!
//! Each submodule provides async handler functions for one resource.
//! Handlers delegate to the job store, scheduler, and cancellation
//! controller, and map errors via [`crate::error::AppError`].

pub mod process;
pub mod upload;
