//! End-to-end dispatcher tests against stub compiler scripts.
//!
//! Each test builds a fresh context around a small shell script standing in
//! for the Closure Compiler, so success, failure and timeout paths are all
//! exercised without a JVM.

#![cfg(unix)]

use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use squish::{ClosureCompiler, MinifyContext, MinifyOptions, OptimizationLevel};

/// Parses `--js`/`--js_output_file` and copies source to output,
/// whitespace stripped. Records its arguments beside the output.
const STUB_COMPILER: &str = r#"#!/bin/sh
dir=$(dirname "$0")
printf '%s ' "$@" > "$dir/args.txt"
src=""
out=""
while [ $# -gt 0 ]; do
    case "$1" in
        --js) src="$2"; shift 2 ;;
        --js_output_file) out="$2"; shift 2 ;;
        *) shift ;;
    esac
done
[ -n "$src" ] || exit 1
[ -n "$out" ] || exit 1
tr -d ' \n' < "$src" > "$out"
"#;

const FAILING_COMPILER: &str = "#!/bin/sh\nexit 1\n";

const HANGING_COMPILER: &str = "#!/bin/sh\nsleep 30\n";

fn write_script(dir: &Utf8Path, body: &str) -> Utf8PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.join("fake-compiler.sh");
    std::fs::write(&path, body).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

fn context_with(script: &Utf8Path, timeout_ms: u64) -> MinifyContext {
    MinifyContext::new(ClosureCompiler::new(
        script.as_str(),
        Vec::new(),
        Duration::from_millis(timeout_ms),
    ))
}

struct Fixture {
    _dir: tempfile::TempDir,
    root: Utf8PathBuf,
    ctx: MinifyContext,
}

fn fixture(compiler_body: &str) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    let script = write_script(&root, compiler_body);
    let ctx = context_with(&script, 2000);
    Fixture {
        _dir: dir,
        root,
        ctx,
    }
}

#[tokio::test]
async fn successful_run_appends_one_success_record() {
    let fx = fixture(STUB_COMPILER);
    let source = fx.root.join("app.js");
    std::fs::write(&source, "var answer = 40 + 2;\n").unwrap();

    let handle = fx
        .ctx
        .dispatch(source.as_str(), &MinifyOptions::default())
        .unwrap();
    handle.await.unwrap();

    let output = fx.root.join("app.min.js");
    assert_eq!(std::fs::read_to_string(&output).unwrap(), "varanswer=40+2;");

    let records = fx.ctx.log.read_all();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].file, "app.js");
    assert!(records[0].success);
}

#[tokio::test]
async fn optimization_level_reaches_the_compiler() {
    let fx = fixture(STUB_COMPILER);
    let source = fx.root.join("app.js");
    std::fs::write(&source, "var x;\n").unwrap();

    let options = MinifyOptions::with_level(OptimizationLevel::parse("adv"));
    fx.ctx
        .dispatch(source.as_str(), &options)
        .unwrap()
        .await
        .unwrap();

    let args = std::fs::read_to_string(fx.root.join("args.txt")).unwrap();
    assert!(args.contains("--compilation_level ADVANCED_OPTIMIZATIONS"));

    let options = MinifyOptions::with_level(OptimizationLevel::parse("white"));
    fx.ctx
        .dispatch(source.as_str(), &options)
        .unwrap()
        .await
        .unwrap();

    let args = std::fs::read_to_string(fx.root.join("args.txt")).unwrap();
    assert!(args.contains("--compilation_level WHITESPACE_ONLY"));
}

#[tokio::test]
async fn failing_compiler_appends_one_failure_record() {
    let fx = fixture(FAILING_COMPILER);
    let source = fx.root.join("broken.js");
    std::fs::write(&source, "var x = ;\n").unwrap();

    fx.ctx
        .dispatch(source.as_str(), &MinifyOptions::default())
        .unwrap()
        .await
        .unwrap();

    let records = fx.ctx.log.read_all();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].file, "broken.js");
    assert!(!records[0].success);
    assert!(!fx.root.join("broken.min.js").exists());
}

#[tokio::test]
async fn timeout_is_classified_as_failure() {
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    let script = write_script(&root, HANGING_COMPILER);
    let ctx = context_with(&script, 200);

    let source = root.join("slow.js");
    std::fs::write(&source, "var x;\n").unwrap();

    let started = Instant::now();
    ctx.dispatch(source.as_str(), &MinifyOptions::default())
        .unwrap()
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(5), "timeout did not bound the run");
    let records = ctx.log.read_all();
    assert_eq!(records.len(), 1);
    assert!(!records[0].success);
}

#[tokio::test]
async fn stale_output_is_removed_even_when_the_compile_fails() {
    let fx = fixture(FAILING_COMPILER);
    let source = fx.root.join("app.js");
    std::fs::write(&source, "var x;\n").unwrap();
    let stale = fx.root.join("app.min.js");
    std::fs::write(&stale, "left over from last time").unwrap();

    fx.ctx
        .dispatch(source.as_str(), &MinifyOptions::default())
        .unwrap()
        .await
        .unwrap();

    assert!(!stale.exists(), "stale output should have been deleted");
    assert!(!fx.ctx.log.read_all()[0].success);
}

#[tokio::test]
async fn unreadable_source_completes_without_a_record() {
    let fx = fixture(STUB_COMPILER);
    let missing = fx.root.join("missing.js");

    // Accepted synchronously: the readability probe happens async.
    let handle = fx
        .ctx
        .dispatch(missing.as_str(), &MinifyOptions::default())
        .unwrap();
    handle.await.unwrap();

    assert!(fx.ctx.log.is_empty());
    assert!(!fx.root.join("missing.min.js").exists());
}

#[tokio::test]
async fn rejected_files_never_start_the_compiler() {
    let fx = fixture(STUB_COMPILER);
    let minified = fx.root.join("app.min.js");
    std::fs::write(&minified, "already small").unwrap();
    let text = fx.root.join("notes.txt");
    std::fs::write(&text, "plain text").unwrap();

    assert!(fx
        .ctx
        .dispatch(minified.as_str(), &MinifyOptions::default())
        .is_err());
    assert!(fx
        .ctx
        .dispatch(text.as_str(), &MinifyOptions::default())
        .is_err());

    // The stub records its args on every run; no run, no file.
    assert!(!fx.root.join("args.txt").exists());
    assert!(fx.ctx.log.is_empty());
}

#[tokio::test]
async fn concurrent_dispatches_each_append_a_record() {
    let fx = fixture(STUB_COMPILER);
    let first = fx.root.join("a.js");
    let second = fx.root.join("b.jsm");
    std::fs::write(&first, "var a;\n").unwrap();
    std::fs::write(&second, "var b;\n").unwrap();

    let options = MinifyOptions::default();
    let h1 = fx.ctx.dispatch(first.as_str(), &options).unwrap();
    let h2 = fx.ctx.dispatch(second.as_str(), &options).unwrap();
    h1.await.unwrap();
    h2.await.unwrap();

    let records = fx.ctx.log.read_all();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.success));
    let mut names: Vec<&str> = records.iter().map(|r| r.file.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, ["a.js", "b.jsm"]);

    assert!(fx.root.join("a.min.js").exists());
    assert!(fx.root.join("b.min.jsm").exists());
}

#[tokio::test]
async fn erb_double_extension_round_trip() {
    let fx = fixture(STUB_COMPILER);
    let source = fx.root.join("view.js.erb");
    std::fs::write(&source, "var v = 1;\n").unwrap();

    fx.ctx
        .dispatch(source.as_str(), &MinifyOptions::default())
        .unwrap()
        .await
        .unwrap();

    assert!(fx.root.join("view.min.js.erb").exists());
    assert_eq!(fx.ctx.log.read_all()[0].file, "view.js.erb");
}
