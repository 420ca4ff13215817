//! # lib-usage
//!
//! Finds every method in compiled JVM archives that calls into a given
//! package, by decoding class files and walking their bytecode directly.
//!
//! ## Architecture
//!
//! - **reader**: bounds-checked big-endian byte cursor
//! - **constant_pool**: constant-pool decoding and reference resolution
//! - **class_file**: class-file structure, methods and `Code` attributes
//! - **bytecode**: instruction-stream decoding with exact operand lengths
//! - **member**: resolved member references and their display forms
//! - **scanner**: package-prefix matching over decoded methods
//! - **aggregate**: ordered or de-duplicated result collection
//! - **archive**: `.class` extraction and digests for JAR files
//! - **discover**: archive discovery in a directory
//! - **detector**: archive → class → method pipeline with failure isolation
//! - **report**: per-archive report files
//! - **cli** / **config**: command-line surface and effective settings

pub mod aggregate;
pub mod archive;
pub mod bytecode;
pub mod class_file;
pub mod cli;
pub mod config;
pub mod constant_pool;
pub mod detector;
pub mod discover;
pub mod error;
pub mod member;
pub mod reader;
pub mod report;
pub mod scanner;

#[cfg(test)]
mod fixture;

pub use error::{Error, Result};
