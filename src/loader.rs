use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread::{self, JoinHandle};

use thiserror::Error;

use crate::glb::{decode_glb, DecodeError, MeshData};

const READ_CHUNK: usize = 64 * 1024;

/// A fully decoded model ready to be appended to the scene graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub name: String,
    pub meshes: Vec<MeshData>,
}

/// Terminal failure of a single load request. Never fatal to the viewer;
/// the scene simply never receives the model.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),
}

/// Lifecycle event of an in-flight load request.
///
/// Per request the loader emits zero or more `Progress` events followed by
/// exactly one of `Loaded` or `Failed`.
#[derive(Debug)]
pub enum LoadEvent {
    Progress {
        path: PathBuf,
        loaded: u64,
        total: u64,
    },
    Loaded {
        path: PathBuf,
        model: Model,
    },
    Failed {
        path: PathBuf,
        error: LoadError,
    },
}

/// Fire-and-forget model loader.
///
/// Each request runs on its own worker thread and reports lifecycle events
/// over a channel the caller drains from the event loop. Requests are
/// independent: there is no ordering between concurrent loads, no
/// cancellation and no timeout.
pub struct ModelLoader {
    sender: Sender<LoadEvent>,
    receiver: Receiver<LoadEvent>,
    workers: Vec<JoinHandle<()>>,
    requests: usize,
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelLoader {
    pub fn new() -> Self {
        let (sender, receiver) = channel();
        Self {
            sender,
            receiver,
            workers: Vec::new(),
            requests: 0,
        }
    }

    /// Issues a load request and returns immediately.
    pub fn request(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        let events = self.sender.clone();
        self.workers
            .push(thread::spawn(move || load_worker(path, &events)));
        self.requests += 1;
    }

    /// Drains the events that arrived since the last poll.
    pub fn poll(&mut self) -> Vec<LoadEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }

    /// Blocks until every outstanding request has settled, then drains all
    /// remaining events. Used by the headless path.
    pub fn wait_idle(&mut self) -> Vec<LoadEvent> {
        for worker in std::mem::take(&mut self.workers) {
            let _ = worker.join();
        }
        self.poll()
    }

    /// Number of requests issued over the loader's lifetime, settled or not.
    pub fn requested(&self) -> usize {
        self.requests
    }
}

impl Drop for ModelLoader {
    fn drop(&mut self) {
        for worker in std::mem::take(&mut self.workers) {
            let _ = worker.join();
        }
    }
}

fn load_worker(path: PathBuf, events: &Sender<LoadEvent>) {
    let bytes = match read_with_progress(&path, events) {
        Ok(bytes) => bytes,
        Err(error) => {
            let _ = events.send(LoadEvent::Failed {
                path,
                error: error.into(),
            });
            return;
        }
    };
    match decode_glb(&bytes) {
        Ok(meshes) => {
            let name = path.display().to_string();
            let _ = events.send(LoadEvent::Loaded {
                path,
                model: Model { name, meshes },
            });
        }
        Err(error) => {
            let _ = events.send(LoadEvent::Failed {
                path,
                error: error.into(),
            });
        }
    }
}

fn read_with_progress(path: &Path, events: &Sender<LoadEvent>) -> std::io::Result<Vec<u8>> {
    let mut file = File::open(path)?;
    let total = file.metadata()?.len();
    let mut bytes = Vec::with_capacity(total as usize);
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        let read = file.read(&mut chunk)?;
        if read == 0 {
            break;
        }
        bytes.extend_from_slice(&chunk[..read]);
        let _ = events.send(LoadEvent::Progress {
            path: path.to_path_buf(),
            loaded: bytes.len() as u64,
            total,
        });
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glb::test_glb::{triangle_glb, triangle_glb_with_indices};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_glb() -> NamedTempFile {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(&triangle_glb()).unwrap();
        tmp
    }

    fn terminal_events(events: &[LoadEvent]) -> usize {
        events
            .iter()
            .filter(|event| !matches!(event, LoadEvent::Progress { .. }))
            .count()
    }

    #[test]
    fn valid_file_reports_progress_then_loaded() {
        let tmp = write_glb();
        let mut loader = ModelLoader::new();
        loader.request(tmp.path());
        let events = loader.wait_idle();

        assert_eq!(terminal_events(&events), 1);
        assert!(!matches!(events.last().unwrap(), LoadEvent::Progress { .. }));
        let mut saw_progress = false;
        for event in &events {
            match event {
                LoadEvent::Progress { loaded, total, .. } => {
                    assert!(*loaded <= *total);
                    saw_progress = true;
                }
                LoadEvent::Loaded { model, .. } => {
                    assert_eq!(model.meshes.len(), 1);
                }
                LoadEvent::Failed { error, .. } => panic!("unexpected failure: {error}"),
            }
        }
        assert!(saw_progress);
    }

    #[test]
    fn missing_file_reports_io_failure() {
        let mut loader = ModelLoader::new();
        loader.request("/nonexistent/never.glb");
        let events = loader.wait_idle();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            LoadEvent::Failed {
                error: LoadError::Io(_),
                ..
            }
        ));
    }

    #[test]
    fn corrupt_file_reports_decode_failure() {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(b"not a glb at all").unwrap();
        let mut loader = ModelLoader::new();
        loader.request(tmp.path());
        let events = loader.wait_idle();
        assert!(events.iter().any(|event| matches!(
            event,
            LoadEvent::Failed {
                error: LoadError::Decode(_),
                ..
            }
        )));
    }

    #[test]
    fn malformed_indices_settle_as_a_decode_failure() {
        // Parses as glTF but references a vertex the position accessor does
        // not have; the request must still settle with a terminal event.
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(&triangle_glb_with_indices([0, 1, 9])).unwrap();
        let mut loader = ModelLoader::new();
        loader.request(tmp.path());
        let events = loader.wait_idle();
        assert_eq!(terminal_events(&events), 1);
        assert!(matches!(
            events.last().unwrap(),
            LoadEvent::Failed {
                error: LoadError::Decode(_),
                ..
            }
        ));
    }

    #[test]
    fn requested_count_survives_settling() {
        let mut loader = ModelLoader::new();
        loader.request("/nonexistent/a.glb");
        loader.request("/nonexistent/b.glb");
        assert_eq!(loader.requested(), 2);
        loader.wait_idle();
        assert_eq!(loader.requested(), 2);
    }

    #[test]
    fn failing_load_does_not_affect_a_concurrent_one() {
        let tmp = write_glb();
        let mut loader = ModelLoader::new();
        loader.request("/nonexistent/never.glb");
        loader.request(tmp.path());
        assert_eq!(loader.requested(), 2);

        let events = loader.wait_idle();
        assert_eq!(terminal_events(&events), 2);
        assert!(events
            .iter()
            .any(|event| matches!(event, LoadEvent::Failed { .. })));
        assert!(events.iter().any(|event| matches!(
            event,
            LoadEvent::Loaded { model, .. } if !model.meshes.is_empty()
        )));
    }
}
