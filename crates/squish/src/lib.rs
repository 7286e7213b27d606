//! squish: JavaScript minification via the Google Closure Compiler.
//!
//! The library is the dispatch path: decide whether a file is eligible,
//! shell out to the compiler with the right flags under a timeout, and
//! record the outcome in an in-memory result log. The binary layers a CLI
//! and a minify-on-save file watcher on top.

pub mod compiler;
pub mod dispatch;
pub mod log;
pub mod resolve;
pub mod watch;

pub use compiler::ClosureCompiler;
pub use dispatch::{DispatchError, MinifyContext, MinifyOptions};
pub use log::{MinificationRecord, ResultLog};
pub use squish_config::{OptimizationLevel, PrefStore, Preferences};
