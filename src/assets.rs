use serde::{Deserialize, Serialize};

use crate::capability::CapabilityVerdict;

/// Compressed supplementary model, loaded only on capable hosts.
pub const PROP_COMPRESSED: &str = "monkey_compressed.glb";
/// Compressed environment model, loaded only on capable hosts.
pub const ROOM_COMPRESSED: &str = "hod_room_optimized.glb";
/// Uncompressed high-fidelity environment model for hosts that fail the
/// capability probe.
pub const ROOM_HIRES: &str = "hod_room_hires.glb";

/// The fixed set of model assets the viewer knows about. Changing these
/// names is the only configuration surface of the selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetCatalog {
    pub prop_compressed: String,
    pub room_compressed: String,
    pub room_hires: String,
}

impl Default for AssetCatalog {
    fn default() -> Self {
        Self {
            prop_compressed: PROP_COMPRESSED.to_string(),
            room_compressed: ROOM_COMPRESSED.to_string(),
            room_hires: ROOM_HIRES.to_string(),
        }
    }
}

impl AssetCatalog {
    /// Picks the assets to request for the given verdict.
    ///
    /// The two branches are mutually exclusive and exhaustive: capable
    /// hosts get both compressed models, everything else gets the single
    /// high-resolution fallback. The choice is made once, before any load
    /// is attempted; a later load failure never re-runs it.
    pub fn select(&self, verdict: CapabilityVerdict) -> Vec<&str> {
        if verdict.capable() {
            vec![self.prop_compressed.as_str(), self.room_compressed.as_str()]
        } else {
            vec![self.room_hires.as_str()]
        }
    }
}
