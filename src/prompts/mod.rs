//! Prompt module for LLM-based operations.
//!
//! This module provides the prompt templates sent to the completion model.

pub mod survey;

pub use survey::*;
