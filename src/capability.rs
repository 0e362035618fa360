use std::panic::{self, AssertUnwindSafe};

use log::info;
use serde::{Deserialize, Serialize};

/// Smallest well-formed WebAssembly binary: magic number plus version, no
/// sections. Parsing and instantiating this is the feature-B probe payload.
pub const EMPTY_MODULE_PREAMBLE: [u8; 8] = [0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00];

/// Result of probing the host for the two runtime features the asset
/// selector branches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityVerdict {
    /// A deferred computation can be constructed and driven to completion.
    pub deferred: bool,
    /// A WebAssembly module can be parsed and instantiated.
    pub binary_modules: bool,
}

impl CapabilityVerdict {
    /// Collapses both flags into the single binary verdict consumed by the
    /// asset selector.
    pub fn capable(self) -> bool {
        self.deferred && self.binary_modules
    }
}

/// Probes the host environment once at startup.
///
/// Feature absence is expected data, not an error: every detection step is
/// isolated so that failures (including panics) fold into `false` instead
/// of propagating. The raw flags are logged for diagnostics only.
pub fn probe() -> CapabilityVerdict {
    let deferred = probe_deferred();
    let binary_modules = probe_binary_modules();
    info!("deferred executor support: {deferred}");
    info!("wasm module support: {binary_modules}");
    CapabilityVerdict {
        deferred,
        binary_modules,
    }
}

fn probe_deferred() -> bool {
    isolated(|| {
        pollster::block_on(std::future::ready(()));
        true
    })
    .unwrap_or(false)
}

fn probe_binary_modules() -> bool {
    isolated(|| instantiate_module(&EMPTY_MODULE_PREAMBLE)).unwrap_or(false)
}

/// Three-step facility check: engine construction, module parsing, module
/// instantiation. Any error at any step collapses to `false`, even errors
/// that are unrelated to feature absence.
fn instantiate_module(bytes: &[u8]) -> bool {
    let engine = wasmi::Engine::default();
    let Ok(module) = wasmi::Module::new(&engine, bytes) else {
        return false;
    };
    let mut store = wasmi::Store::new(&engine, ());
    let linker = wasmi::Linker::<()>::new(&engine);
    linker
        .instantiate(&mut store, &module)
        .and_then(|pre| pre.start(&mut store))
        .is_ok()
}

fn isolated<T>(check: impl FnOnce() -> T) -> Option<T> {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let outcome = panic::catch_unwind(AssertUnwindSafe(check)).ok();
    panic::set_hook(default_hook);
    outcome
}
