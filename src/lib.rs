//! Compiles test cases written in Python docstrings into `unittest` modules.
//!
//! ```text
//! source text -> tokens -> outline -> docstrings -> TestCase -> code model -> Python
//! ```
//!
//! The entry points are [`generate_from_source`] and [`generate_from_file`].

pub use crate::config::{GeneratorConfig, InstanceMode};
pub use crate::errors::{ErrorKind, GenerationWarning, TestgenError, WarningKind};
pub use crate::pipeline::{generate_from_file, generate_from_source, Generation};

pub mod cli;
pub mod codegen;
pub mod config;
pub mod dsl;
pub mod errors;
pub mod pipeline;
pub mod source;
pub mod value;
