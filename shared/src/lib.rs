//! Shared I/O utilities for the moving-target simulation workspace.
//!
//! These are the collaborators the renderer's surrounding pipeline talks
//! to through narrow interfaces: the source-spectra catalog store
//! ([`spectra`]) and the reference-file staging utility
//! ([`reference_data`]). Nothing here touches the rendering hot path.

pub mod reference_data;
pub mod spectra;
