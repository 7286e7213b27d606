//! squish CLI: minify now, minify on save, tweak preferences.

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use eyre::WrapErr;
use owo_colors::OwoColorize;
use squish::{ClosureCompiler, MinifyContext, MinifyOptions, OptimizationLevel, PrefStore};
use squish_config::PrefKey;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "squish", version, about = "JavaScript minification via the Closure Compiler")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct CompilerArgs {
    /// Directory containing closure-compiler.jar
    #[arg(long, default_value = ".")]
    base: Utf8PathBuf,

    /// Explicit path to the compiler jar (overrides --base)
    #[arg(long)]
    jar: Option<Utf8PathBuf>,

    /// Kill the compiler after this many milliseconds
    #[arg(long, default_value_t = 5000)]
    timeout_ms: u64,

    /// Suffix inserted before the extension of output files
    #[arg(long, default_value = "min")]
    suffix: String,
}

impl CompilerArgs {
    fn compiler(&self) -> ClosureCompiler {
        let compiler = match &self.jar {
            Some(jar) => ClosureCompiler::new(
                "java",
                vec!["-jar".to_string(), jar.to_string()],
                Duration::from_millis(self.timeout_ms),
            ),
            None => ClosureCompiler::jar(&self.base),
        };
        compiler.with_timeout(Duration::from_millis(self.timeout_ms))
    }
}

#[derive(Subcommand)]
enum Command {
    /// Minify one or more files now
    Minify {
        /// Files to minify
        #[arg(required = true)]
        files: Vec<String>,

        /// Optimization level for this run (white, simple, adv); defaults
        /// to the stored preference
        #[arg(long)]
        level: Option<String>,

        #[command(flatten)]
        compiler: CompilerArgs,
    },

    /// Watch a directory and minify eligible files as they are saved
    Watch {
        /// Directory to watch
        #[arg(default_value = ".")]
        dir: Utf8PathBuf,

        /// Minify every save even when the minify-on-save preference is off
        #[arg(long)]
        force: bool,

        #[command(flatten)]
        compiler: CompilerArgs,
    },

    /// Read or write preferences
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print one preference, or all of them
    Get { key: Option<String> },
    /// Set a preference (optimization-level, minify-on-save)
    Set { key: String, value: String },
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("squish=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Minify {
            files,
            level,
            compiler,
        } => run_minify(files, level, compiler).await,
        Command::Watch {
            dir,
            force,
            compiler,
        } => run_watch(dir, force, compiler).await,
        Command::Config { action } => run_config(action),
    }
}

async fn run_minify(
    files: Vec<String>,
    level: Option<String>,
    compiler: CompilerArgs,
) -> eyre::Result<()> {
    let store = PrefStore::open(Utf8Path::new("."));
    let level = match level {
        Some(value) => OptimizationLevel::parse(&value),
        None => store
            .optimization_level()
            .wrap_err("failed to read preferences")?,
    };

    let options = MinifyOptions {
        optimization_level: level,
        min_suffix: compiler.suffix.clone(),
    };
    let ctx = MinifyContext::new(compiler.compiler());

    let mut rejected = false;
    let mut handles = Vec::new();
    for file in &files {
        match ctx.dispatch(file, &options) {
            Ok(handle) => handles.push(handle),
            Err(err) => {
                eprintln!("   {} {}", "Rejected".red().bold(), err);
                rejected = true;
            }
        }
    }
    futures::future::join_all(handles).await;

    let mut failed = false;
    for record in ctx.log.read_all() {
        if record.success {
            eprintln!("   {} {}", "OK".green().bold(), record.file);
        } else {
            eprintln!("   {} {}", "FAILED".red().bold(), record.file);
            failed = true;
        }
    }

    if rejected || failed {
        eyre::bail!("some files were not minified");
    }
    Ok(())
}

async fn run_watch(dir: Utf8PathBuf, force: bool, compiler: CompilerArgs) -> eyre::Result<()> {
    let store = PrefStore::open(&dir);
    let suffix = compiler.suffix.clone();
    let ctx = MinifyContext::new(compiler.compiler());

    eprintln!(
        "   {} {} (minify-on-save: {})",
        "Watching".blue().bold(),
        dir,
        if force {
            "forced".to_string()
        } else {
            store.minify_on_save().unwrap_or_default().to_string()
        }
    );

    tokio::select! {
        result = squish::watch::watch_and_minify(&ctx, &store, &dir, &suffix, force) => result?,
        _ = tokio::signal::ctrl_c() => {}
    }

    // Session summary, oldest first.
    let records = ctx.log.read_all();
    if !records.is_empty() {
        eprintln!("   {} {} file(s) this session", "Minified".blue().bold(), records.len());
        for record in records {
            let outcome = if record.success {
                "OK".green().bold().to_string()
            } else {
                "FAILED".red().bold().to_string()
            };
            eprintln!("   {outcome} {}", record.file);
        }
    }
    Ok(())
}

fn run_config(action: ConfigAction) -> eyre::Result<()> {
    let store = PrefStore::open(Utf8Path::new("."));
    match action {
        ConfigAction::Get { key: Some(key) } => {
            let key: PrefKey = key.parse()?;
            println!("{}", store.get(key)?);
        }
        ConfigAction::Get { key: None } => {
            for key in PrefKey::ALL {
                println!("{} = {}", key.as_str(), store.get(key)?);
            }
        }
        ConfigAction::Set { key, value } => {
            let key: PrefKey = key.parse()?;
            let stored = store.set(key, &value)?;
            println!("{} = {stored}", key.as_str());
        }
    }
    Ok(())
}
