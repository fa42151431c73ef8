//! Two-tier driver registry.
//!
//! Tier 1 is the static, pure-data `ModelConfig` table. Tier 2 is an
//! optional `DriverEntry` of function-hook overrides, attached to at most a
//! few dozen models whose controller needs something the generic
//! interpreter can't express. Lookup is by lowercase model name.

pub mod bytecode;
pub mod models;

use crate::error::{self, ChromaError};

pub use models::{BusyPolarity, Capabilities, ModelConfig, ResetTiming};

/// Optional Tier 2 function-hook overrides.
/// Every hook is optional; an absent hook means "use the generic
/// interpreter for this operation." Hooks are plain `fn` pointers (not
/// closures) because the table is `'static` data built once, mirroring how
/// `ModelConfig` itself is `'static` data.
pub struct DriverEntry {
    pub custom_init: Option<fn(&ModelConfig, bytecode::InitMode, &mut dyn crate::device::DeviceIo) -> Result<(), ChromaError>>,
    pub custom_display: Option<fn(&ModelConfig, &crate::pixel::Framebuffer, &mut dyn crate::device::DeviceIo) -> Result<(), ChromaError>>,
    pub custom_display_dual: Option<
        fn(
            &ModelConfig,
            &crate::pixel::Framebuffer,
            &crate::pixel::Framebuffer,
            &mut dyn crate::device::DeviceIo,
        ) -> Result<(), ChromaError>,
    >,
    pub custom_display_region: Option<
        fn(
            &ModelConfig,
            &crate::pixel::Framebuffer,
            u32,
            u32,
            u32,
            u32,
            &mut dyn crate::device::DeviceIo,
        ) -> Result<(), ChromaError>,
    >,
    pub pre_display: Option<fn(&ModelConfig, &mut dyn crate::device::DeviceIo) -> Result<(), ChromaError>>,
    pub post_display: Option<fn(&ModelConfig, &mut dyn crate::device::DeviceIo) -> Result<(), ChromaError>>,
}

impl Default for DriverEntry {
    fn default() -> Self {
        DriverEntry {
            custom_init: None,
            custom_display: None,
            custom_display_dual: None,
            custom_display_region: None,
            pre_display: None,
            post_display: None,
        }
    }
}

/// A name + optional override pair, as stored in the Tier 2 table.
pub(crate) struct OverrideEntry {
    pub(crate) model_name: &'static str,
    pub(crate) entry: DriverEntry,
}

/// Looks up a `ModelConfig` by exact lowercase name, O(1) by name.
/// `Option` return; `Display`'s caller turns a miss into
/// `ModelNotFound` with fuzzy suggestions.
pub fn lookup(model_name: &str) -> Option<&'static ModelConfig> {
    models::TABLE.iter().find(|m| m.model_name == model_name)
}

/// Looks up the optional Tier 2 overrides for a model. Most models have
/// none; `generic_init`/`generic_display`/`generic_sleep` cover them.
pub fn overrides(model_name: &str) -> Option<&'static DriverEntry> {
    models::OVERRIDES
        .iter()
        .find(|o| o.model_name == model_name)
        .map(|o| &o.entry)
}

/// All known model names, for Levenshtein-suggestion purposes on a lookup
/// miss.
pub fn model_names() -> Vec<&'static str> {
    models::TABLE.iter().map(|m| m.model_name).collect()
}

/// Resolves a model name into its Tier 1 config, or `ModelNotFound` with up
/// to 3 Levenshtein-closest suggestions.
pub fn resolve(model_name: &str) -> Result<&'static ModelConfig, ChromaError> {
    lookup(model_name).ok_or_else(|| {
        let candidates = model_names();
        let suggestions = error::suggest(model_name, &candidates, 3);
        ChromaError::ModelNotFound {
            requested: model_name.to_string(),
            suggestions,
        }
    })
}
