//! # codebox
//!
//! Command-line front end for the codebox execution engine.
//!
//! ```bash
//! # Run a snippet in a throwaway scratch directory
//! codebox run 'print(2 + 2)'
//!
//! # Install dependencies first and report details
//! codebox run --install requests --format detailed --file script.py
//!
//! # Keep files between runs
//! codebox run --workspace persistent 'open("notes.txt", "a").write("hi\n")'
//!
//! # JSON in, JSON out
//! echo '{"code": "print(1)", "timeout_ms": 2000}' | codebox request
//! ```
//!
//! The engine itself lives in `codebox-core`; configuration in
//! `codebox-config`; subprocess supervision in `codebox-process`.

pub mod cli;
