//! Minify-on-save: watch a directory tree and dispatch eligible saves.
//!
//! notify's watcher callback runs on its own thread; events are funneled
//! into the tokio world through an unbounded channel. A short per-path
//! debounce collapses the burst of events a single editor save produces.

use std::collections::HashMap;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use squish_config::PrefStore;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::dispatch::{MinifyContext, MinifyOptions};
use crate::resolve::ELIGIBLE_SUFFIXES;

/// Events for the same path within this window count as one save.
const SAVE_DEBOUNCE: Duration = Duration::from_millis(500);

/// Recursive watcher that yields saved JavaScript sources.
pub struct SaveWatcher {
    rx: mpsc::UnboundedReceiver<Utf8PathBuf>,
    last_seen: HashMap<Utf8PathBuf, Instant>,
    // Watching stops when this is dropped.
    _watcher: RecommendedWatcher,
}

impl SaveWatcher {
    pub fn new(root: &Utf8Path) -> Result<Self, notify::Error> {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            let event = match res {
                Ok(event) => event,
                Err(err) => {
                    tracing::warn!(%err, "file watcher error");
                    return;
                }
            };
            if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                return;
            }
            for path in event.paths {
                let Ok(path) = Utf8PathBuf::from_path_buf(path) else {
                    continue;
                };
                if has_eligible_suffix(&path) {
                    let _ = tx.send(path);
                }
            }
        })?;
        watcher.watch(root.as_std_path(), RecursiveMode::Recursive)?;

        Ok(Self {
            rx,
            last_seen: HashMap::new(),
            _watcher: watcher,
        })
    }

    /// Next debounced save event. `None` once the watcher is gone.
    pub async fn next_saved(&mut self) -> Option<Utf8PathBuf> {
        while let Some(path) = self.rx.recv().await {
            let now = Instant::now();
            if let Some(prev) = self.last_seen.get(&path) {
                if now.duration_since(*prev) < SAVE_DEBOUNCE {
                    continue;
                }
            }
            self.last_seen.insert(path.clone(), now);
            return Some(path);
        }
        None
    }
}

fn has_eligible_suffix(path: &Utf8Path) -> bool {
    let name = path.file_name().unwrap_or_default();
    ELIGIBLE_SUFFIXES
        .iter()
        .any(|suffix| name.ends_with(suffix) && name.len() > suffix.len())
}

/// Watch `root` and minify saved files until the watcher dies.
///
/// The minify-on-save preference is consulted through the store on every
/// event, so `squish config set minify-on-save true` in another terminal
/// takes effect without restarting the watcher. `force` bypasses it.
pub async fn watch_and_minify(
    ctx: &MinifyContext,
    store: &PrefStore,
    root: &Utf8Path,
    min_suffix: &str,
    force: bool,
) -> eyre::Result<()> {
    let mut watcher = SaveWatcher::new(root)?;
    tracing::info!(root = %root, "watching for saves");

    let own_output_marker = format!(".{min_suffix}.");

    while let Some(path) = watcher.next_saved().await {
        // Our own freshly written outputs come back as events too.
        if path
            .file_name()
            .unwrap_or_default()
            .contains(&own_output_marker)
        {
            continue;
        }

        if !force {
            match store.minify_on_save() {
                Ok(true) => {}
                Ok(false) => {
                    tracing::trace!(path = %path, "minify-on-save is off, ignoring");
                    continue;
                }
                Err(err) => {
                    tracing::warn!(%err, "could not read preferences, skipping save");
                    continue;
                }
            }
        }

        let level = store.optimization_level().unwrap_or_default();
        let options = MinifyOptions {
            optimization_level: level,
            min_suffix: min_suffix.to_string(),
        };

        // Fire-and-forget: the completion task reports into the log.
        match ctx.dispatch(path.as_str(), &options) {
            Ok(_handle) => tracing::info!(path = %path, %level, "minifying saved file"),
            Err(err) => tracing::debug!(path = %path, %err, "save not dispatched"),
        }
    }

    Ok(())
}
