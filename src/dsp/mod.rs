//! DSP building blocks shared by the offline renderer and the preview graph.
//!
//! Everything here is deterministic: the same input always yields the
//! same output, which keeps offline renders reproducible.

pub mod filter;
pub mod mixer;
pub mod shaper;
