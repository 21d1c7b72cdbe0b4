// src/extract/mod.rs
// =============================================================================
// This module finds image references in HTML.
//
// Submodules:
// - normalize: cleans one raw src/srcset value into an ImageReference
// - html: walks <img>/<source> elements and resolves their references
// =============================================================================

mod html;
mod normalize;

pub use html::discover_images;
