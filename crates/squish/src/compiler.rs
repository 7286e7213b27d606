//! Closure Compiler invocation: flag selection and command construction.

use std::process::Stdio;
use std::time::Duration;

use camino::Utf8Path;
use squish_config::OptimizationLevel;
use tokio::process::Command;

/// Jar file name expected next to the tool (or wherever `--base` points).
pub const COMPILER_JAR: &str = "closure-compiler.jar";

/// Wall-clock budget for one compiler run.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// `--compilation_level` value for an optimization level. Total.
pub fn compilation_level(level: OptimizationLevel) -> &'static str {
    match level {
        OptimizationLevel::Whitespace => "WHITESPACE_ONLY",
        OptimizationLevel::Simple => "SIMPLE_OPTIMIZATIONS",
        OptimizationLevel::Advanced => "ADVANCED_OPTIMIZATIONS",
    }
}

/// How to start the external compiler.
///
/// Production runs `java -jar <base>/closure-compiler.jar`; tests substitute
/// a stub script through [`ClosureCompiler::new`].
#[derive(Debug, Clone)]
pub struct ClosureCompiler {
    program: String,
    leading_args: Vec<String>,
    timeout: Duration,
}

impl ClosureCompiler {
    pub fn new(
        program: impl Into<String>,
        leading_args: Vec<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            program: program.into(),
            leading_args,
            timeout,
        }
    }

    /// The standard `java -jar` invocation against a jar in `base_dir`.
    pub fn jar(base_dir: &Utf8Path) -> Self {
        Self::new(
            "java",
            vec!["-jar".to_string(), base_dir.join(COMPILER_JAR).into_string()],
            DEFAULT_TIMEOUT,
        )
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Build the command for one minification run. Output is captured, and
    /// the child dies with the future if the timeout fires first.
    pub fn command(
        &self,
        level: OptimizationLevel,
        source: &Utf8Path,
        output: &Utf8Path,
    ) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.leading_args)
            .arg("--compilation_level")
            .arg(compilation_level(level))
            .arg("--js")
            .arg(source)
            .arg("--js_output_file")
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}
