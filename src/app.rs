use std::path::{Path, PathBuf};

use log::{error, info};

use crate::assets::AssetCatalog;
use crate::capability::CapabilityVerdict;
use crate::loader::{LoadEvent, ModelLoader};
use crate::scene::SceneGraph;

/// Issues one load request per asset selected for the verdict and returns
/// the requested paths. Invoked exactly once at startup; the loader runs
/// the requests independently and this returns without waiting.
pub fn request_startup_assets(
    loader: &mut ModelLoader,
    assets_dir: &Path,
    catalog: &AssetCatalog,
    verdict: CapabilityVerdict,
) -> Vec<PathBuf> {
    let mut requested = Vec::new();
    for name in catalog.select(verdict) {
        let path = assets_dir.join(name);
        loader.request(path.clone());
        requested.push(path);
    }
    requested
}

/// Folds a loader event into the scene graph.
///
/// Progress and failures are diagnostics only; a failed load leaves the
/// scene without that model and the viewer keeps running.
pub fn apply_load_event(scene: &SceneGraph, event: LoadEvent) {
    match event {
        LoadEvent::Progress {
            path,
            loaded,
            total,
        } => {
            if total > 0 {
                let percent = loaded as f64 / total as f64 * 100.0;
                info!("{}: {percent:.0}% loaded", path.display());
            }
        }
        LoadEvent::Loaded { path, model } => {
            info!(
                "{}: loaded {} mesh(es)",
                path.display(),
                model.meshes.len()
            );
            scene.add(model);
        }
        LoadEvent::Failed { path, error } => {
            error!("failed to load {}: {error}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{LoadError, Model};

    const CAPABLE: CapabilityVerdict = CapabilityVerdict {
        deferred: true,
        binary_modules: true,
    };
    const INCAPABLE: CapabilityVerdict = CapabilityVerdict {
        deferred: true,
        binary_modules: false,
    };

    #[test]
    fn capable_startup_issues_two_requests() {
        let mut loader = ModelLoader::new();
        let requested = request_startup_assets(
            &mut loader,
            Path::new("/tmp/assets"),
            &AssetCatalog::default(),
            CAPABLE,
        );
        assert_eq!(loader.requested(), 2);
        assert_eq!(
            requested,
            vec![
                PathBuf::from("/tmp/assets/monkey_compressed.glb"),
                PathBuf::from("/tmp/assets/hod_room_optimized.glb"),
            ]
        );
    }

    #[test]
    fn incapable_startup_issues_one_request() {
        let mut loader = ModelLoader::new();
        let requested = request_startup_assets(
            &mut loader,
            Path::new("/tmp/assets"),
            &AssetCatalog::default(),
            INCAPABLE,
        );
        assert_eq!(loader.requested(), 1);
        assert_eq!(requested, vec![PathBuf::from("/tmp/assets/hod_room_hires.glb")]);
    }

    #[test]
    fn loaded_event_appends_to_the_scene() {
        let scene = SceneGraph::new();
        apply_load_event(
            &scene,
            LoadEvent::Loaded {
                path: PathBuf::from("room.glb"),
                model: Model {
                    name: "room.glb".to_string(),
                    meshes: Vec::new(),
                },
            },
        );
        assert_eq!(scene.len(), 1);
    }

    #[test]
    fn failed_event_leaves_the_scene_untouched() {
        let scene = SceneGraph::new();
        apply_load_event(
            &scene,
            LoadEvent::Failed {
                path: PathBuf::from("room.glb"),
                error: LoadError::Io(std::io::Error::from(std::io::ErrorKind::NotFound)),
            },
        );
        assert!(scene.is_empty());
    }
}
