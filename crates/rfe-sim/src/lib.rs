//! RF Explorer Simulation Library
//!
//! This crate provides a simulated analyzer for exercising the configuration
//! handshake without physical hardware:
//!
//! - **VirtualAnalyzer**: answers `C0` with a protocol-accurate configuration dump
//! - **run_virtual_analyzer_task**: serves a `VirtualAnalyzer` over an async stream
//!
//! Faults seen on real links can be injected: stray lines, a torn
//! transmission with a corruption marker, or a dump that never terminates.
//!
//! # Example
//!
//! ```rust
//! use rfe_sim::VirtualAnalyzer;
//!
//! let mut analyzer = VirtualAnalyzer::new();
//! analyzer.inject_line(b"#ZZtest\r\n".to_vec());
//! analyzer.process_command("C0");
//!
//! while let Some(line) = analyzer.take_output() {
//!     println!("Analyzer output: {:?}", String::from_utf8_lossy(&line));
//! }
//! ```

pub mod analyzer;
pub mod analyzer_task;

pub use analyzer::{AnalyzerProfile, VirtualAnalyzer};
pub use analyzer_task::{run_virtual_analyzer_task, TaskOptions};
