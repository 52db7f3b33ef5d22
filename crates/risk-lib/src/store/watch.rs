//! Invalidate cached models when their files change on disk

use super::ArtifactStore;
use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Keeps a filesystem watcher alive for the lifetime of the value
pub struct ArtifactWatcher {
    _watcher: RecommendedWatcher,
}

impl ArtifactWatcher {
    /// Watch `dir` and drop cache entries for artifacts created, modified or removed in it
    pub fn spawn(dir: &Path, store: Arc<ArtifactStore>) -> Result<Self> {
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => handle_event(&store, &event),
            Err(e) => warn!(error = %e, "Model directory watch error"),
        })
        .context("Failed to create model directory watcher")?;

        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch model directory {:?}", dir))?;

        info!(dir = %dir.display(), "Watching model directory for artifact changes");
        Ok(Self { _watcher: watcher })
    }
}

fn handle_event(store: &ArtifactStore, event: &Event) {
    if !matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) {
        return;
    }

    for path in &event.paths {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if store.invalidate(name) {
            debug!(artifact = %name, kind = ?event.kind, "Artifact changed on disk");
        }
    }
}
