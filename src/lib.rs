//! sceneprompt: interview-driven prompt builder
//!
//! Walks a question graph, collects answers, refinements, weights and custom
//! elements, and assembles a positive and negative prompt for image generation.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
