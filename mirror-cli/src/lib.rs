//! # mirror-cli
//!
//! Command-line front end for the Magic Mirror.
//!
//! - `mirror console`: type to the mirror, hear it answer
//! - `mirror music <prompt>...`: play generated music until Enter
//!
//! `GEMINI_API_KEY` (or `GOOGLE_API_KEY`) must be set, directly or in a
//! `.env` file.

pub mod audio;
pub mod cli;
pub mod config;
pub mod console;
pub mod music;
