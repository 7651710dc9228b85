//! Runs listings off the render thread and hands the results back by message.

use crate::lister::{ListSource, ListingEntry};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// A finished listing, tagged with the navigation it was started for.
#[derive(Debug, Clone)]
pub struct LoadComplete {
    pub generation: u64,
    pub path: PathBuf,
    pub entries: Vec<ListingEntry>,
}

pub struct BackgroundLoader {
    source: Arc<dyn ListSource>,
    tx: mpsc::UnboundedSender<LoadComplete>,
    rx: mpsc::UnboundedReceiver<LoadComplete>,
}

impl BackgroundLoader {
    pub fn new(source: Arc<dyn ListSource>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { source, tx, rx }
    }

    /// Start listing `path` on the blocking pool. Must be called from within a
    /// tokio runtime. Nothing waits on the spawned job.
    pub fn request(&self, generation: u64, path: PathBuf) {
        let source = self.source.clone();
        let tx = self.tx.clone();

        debug!(generation, path = %path.display(), "load requested");
        tokio::task::spawn_blocking(move || {
            let entries = source.list(&path);
            let done = LoadComplete {
                generation,
                path,
                entries,
            };
            if tx.send(done).is_err() {
                warn!(generation, "load finished after the browser shut down");
            }
        });
    }

    /// Every completion received so far, oldest first. Never blocks.
    pub fn drain(&mut self) -> Vec<LoadComplete> {
        let mut done = Vec::new();
        while let Ok(message) = self.rx.try_recv() {
            done.push(message);
        }
        done
    }

    /// Wait for the next completion.
    pub async fn next(&mut self) -> Option<LoadComplete> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::Mutex;
    use std::sync::mpsc as std_mpsc;

    /// Lists instantly except for gated paths, which block until released.
    struct GatedSource {
        gates: Mutex<HashMap<PathBuf, std_mpsc::Receiver<()>>>,
    }

    impl GatedSource {
        fn new() -> Self {
            Self {
                gates: Mutex::new(HashMap::new()),
            }
        }

        fn gate(&self, path: &str) -> std_mpsc::Sender<()> {
            let (tx, rx) = std_mpsc::channel();
            self.gates.lock().unwrap().insert(PathBuf::from(path), rx);
            tx
        }
    }

    impl ListSource for GatedSource {
        fn list(&self, path: &Path) -> Vec<ListingEntry> {
            let gate = self.gates.lock().unwrap().remove(path);
            if let Some(gate) = gate {
                gate.recv().ok();
            }
            vec![ListingEntry {
                name: path.display().to_string(),
                file_name: path.as_os_str().to_os_string(),
                size_label: "0 Bytes".to_string(),
                is_dir: false,
            }]
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_completions_carry_their_tag() {
        let mut loader = BackgroundLoader::new(Arc::new(GatedSource::new()));
        loader.request(7, PathBuf::from("/a"));

        let done = loader.next().await.unwrap();
        assert_eq!(done.generation, 7);
        assert_eq!(done.path, PathBuf::from("/a"));
        assert_eq!(done.entries[0].name, "/a");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_slow_load_arrives_after_later_one() {
        let source = Arc::new(GatedSource::new());
        let release_a = source.gate("/a");
        let mut loader = BackgroundLoader::new(source);

        loader.request(1, PathBuf::from("/a"));
        loader.request(2, PathBuf::from("/b"));

        let first = loader.next().await.unwrap();
        assert_eq!(first.generation, 2);

        release_a.send(()).unwrap();
        let second = loader.next().await.unwrap();
        assert_eq!(second.generation, 1);
        assert_eq!(second.path, PathBuf::from("/a"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_drain_is_non_blocking() {
        let source = Arc::new(GatedSource::new());
        let release = source.gate("/slow");
        let mut loader = BackgroundLoader::new(source);

        loader.request(1, PathBuf::from("/slow"));
        assert!(loader.drain().is_empty());

        release.send(()).unwrap();
        let done = loader.next().await.unwrap();
        assert_eq!(done.generation, 1);
        assert!(loader.drain().is_empty());
    }
}
