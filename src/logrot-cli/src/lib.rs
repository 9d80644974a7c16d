//! logrot command-line library.
//!
//! The binary in `main.rs` only wires logging and the process exit code;
//! argument definitions and the run itself live here so they can be tested
//! without spawning a process.

pub mod cli;
