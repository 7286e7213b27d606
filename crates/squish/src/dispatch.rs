//! The minify dispatcher.
//!
//! `dispatch` runs a synchronous eligibility phase and, when the file is
//! accepted, spawns the actual work onto the runtime. The synchronous
//! return only ever means "accepted for processing" or "rejected" — the
//! compiler's outcome lands in the result log later, never back at the
//! caller. Failures past the accept point are diagnosed via tracing only,
//! so a save in an editor-like loop is never interrupted by a broken build.

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use squish_config::OptimizationLevel;
use tokio::task::JoinHandle;

use crate::compiler::ClosureCompiler;
use crate::log::ResultLog;
use crate::resolve::{self, Ineligible, ResolvedSource};

/// Per-invocation options. Transient: constructed per dispatch, not stored.
#[derive(Debug, Clone)]
pub struct MinifyOptions {
    pub optimization_level: OptimizationLevel,
    /// Inserted before the extension in the output name (`app.min.js`).
    pub min_suffix: String,
}

impl Default for MinifyOptions {
    fn default() -> Self {
        Self {
            optimization_level: OptimizationLevel::default(),
            min_suffix: "min".to_string(),
        }
    }
}

impl MinifyOptions {
    pub fn with_level(level: OptimizationLevel) -> Self {
        Self {
            optimization_level: level,
            ..Self::default()
        }
    }
}

/// Synchronous rejections. None of these touch the filesystem or the log.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("filename to minify required")]
    MissingFilename,
    #[error(transparent)]
    Ineligible(#[from] Ineligible),
}

/// Everything a dispatch needs, passed in explicitly. Construct one at
/// startup; tests build a fresh context per case.
pub struct MinifyContext {
    pub log: Arc<ResultLog>,
    pub compiler: ClosureCompiler,
}

impl MinifyContext {
    pub fn new(compiler: ClosureCompiler) -> Self {
        Self {
            log: Arc::new(ResultLog::new()),
            compiler,
        }
    }

    /// Start a minification attempt for one file.
    ///
    /// Returns the handle of the spawned completion task. Fire-and-forget
    /// callers drop it; tests and batch runs await it before reading the
    /// log. Must be called from within a tokio runtime.
    pub fn dispatch(
        &self,
        file_path: &str,
        options: &MinifyOptions,
    ) -> Result<JoinHandle<()>, DispatchError> {
        if file_path.is_empty() {
            return Err(DispatchError::MissingFilename);
        }

        let source = Utf8PathBuf::from(file_path);
        let resolved = resolve::resolve(&source, &options.min_suffix)?;

        let compiler = self.compiler.clone();
        let level = options.optimization_level;
        let log = Arc::clone(&self.log);

        Ok(tokio::spawn(async move {
            run_minification(compiler, level, source, resolved, log).await;
        }))
    }
}

/// The async half: readability probe, stale-output removal, compiler run,
/// log append. Appends exactly one record unless the source is unreadable.
async fn run_minification(
    compiler: ClosureCompiler,
    level: OptimizationLevel,
    source: Utf8PathBuf,
    resolved: ResolvedSource,
    log: Arc<ResultLog>,
) {
    // Readability probe. An unreadable source is dropped with a diagnostic:
    // no compiler run happened, so the log gets no record.
    if let Err(err) = tokio::fs::File::open(&source).await {
        tracing::warn!(source = %source, %err, "source not readable, skipping minification");
        return;
    }

    remove_stale_output(&resolved.output_path).await;

    let success = run_compiler(&compiler, level, &source, &resolved.output_path).await;
    if success {
        tracing::info!(output = %resolved.output_path, "created successfully");
    }
    log.append(&resolved.file_name, success);
}

/// Best-effort delete of a previous output file. Missing is fine; anything
/// else is swallowed after a diagnostic and the compiler overwrites it.
async fn remove_stale_output(output_path: &Utf8Path) {
    match tokio::fs::remove_file(output_path).await {
        Ok(()) => tracing::debug!(output = %output_path, "removed stale output"),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => {
            tracing::debug!(output = %output_path, %err, "could not remove stale output");
        }
    }
}

/// Run the compiler under its timeout. Spawn errors, non-zero exits and
/// timeouts all classify uniformly as failure; success additionally
/// requires that the output file exists afterwards.
async fn run_compiler(
    compiler: &ClosureCompiler,
    level: OptimizationLevel,
    source: &Utf8Path,
    output_path: &Utf8Path,
) -> bool {
    let mut cmd = compiler.command(level, source, output_path);

    // Dropping the output future on timeout kills the child (kill_on_drop).
    let result = tokio::time::timeout(compiler.timeout(), cmd.output()).await;

    match result {
        Err(_elapsed) => {
            tracing::error!(
                source = %source,
                timeout_ms = compiler.timeout().as_millis() as u64,
                "compiler timed out"
            );
            false
        }
        Ok(Err(err)) => {
            tracing::error!(source = %source, %err, "failed to run compiler");
            false
        }
        Ok(Ok(output)) => {
            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                tracing::error!(
                    source = %source,
                    code = ?output.status.code(),
                    %stderr,
                    "compiler exited with an error"
                );
                return false;
            }
            match tokio::fs::metadata(output_path).await {
                Ok(_) => true,
                Err(_) => {
                    tracing::error!(
                        source = %source,
                        output = %output_path,
                        "compiler exited cleanly but produced no output file"
                    );
                    false
                }
            }
        }
    }
}
