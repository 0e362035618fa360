use std::sync::Arc;

use parking_lot::RwLock;

use crate::loader::Model;

/// Thread-safe, append-only container of the models loaded so far.
///
/// Load callbacks append independently and in no particular order; the
/// render loop takes cheap snapshots each frame.
#[derive(Debug, Default)]
pub struct SceneGraph {
    models: Arc<RwLock<Vec<Arc<Model>>>>,
}

impl Clone for SceneGraph {
    fn clone(&self) -> Self {
        Self {
            models: Arc::clone(&self.models),
        }
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a loaded model to the scene.
    pub fn add(&self, model: Model) {
        self.models.write().push(Arc::new(model));
    }

    /// Returns a snapshot of the current scene content.
    pub fn snapshot(&self) -> Vec<Arc<Model>> {
        self.models.read().clone()
    }

    pub fn len(&self) -> usize {
        self.models.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.read().is_empty()
    }

    /// Total number of meshes across all loaded models.
    pub fn mesh_count(&self) -> usize {
        self.models
            .read()
            .iter()
            .map(|model| model.meshes.len())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_model(name: &str) -> Model {
        Model {
            name: name.to_string(),
            meshes: Vec::new(),
        }
    }

    #[test]
    fn add_and_snapshot() {
        let scene = SceneGraph::new();
        assert!(scene.is_empty());
        scene.add(make_model("room"));
        scene.add(make_model("monkey"));
        let snapshot = scene.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].name, "room");
        assert_eq!(snapshot[1].name, "monkey");
    }

    #[test]
    fn clones_share_content() {
        let scene = SceneGraph::new();
        let handle = scene.clone();
        scene.add(make_model("room"));
        assert_eq!(handle.len(), 1);
    }

    #[test]
    fn concurrent_adds_all_land() {
        let scene = SceneGraph::new();
        let mut threads = Vec::new();
        for index in 0..8 {
            let scene = scene.clone();
            threads.push(std::thread::spawn(move || {
                scene.add(make_model(&format!("model-{index}")));
            }));
        }
        for thread in threads {
            thread.join().unwrap();
        }
        assert_eq!(scene.len(), 8);
    }
}
