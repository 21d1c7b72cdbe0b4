// src/save/mod.rs
// =============================================================================
// This module puts images on disk.
//
// Submodules:
// - filename: derives a safe name whose extension matches the Content-Type
// - inline: decodes base64 data URIs and writes them directly
// - gate: the shared counter that caps how many images a run saves
// =============================================================================

mod filename;
mod gate;
mod inline;

pub use filename::{suggested_filename, ResolvedFilename};
pub use gate::{LimitGate, Reservation};
pub use inline::{inline_file_name, write_inline_image, InlineSequence, InlineTarget};
