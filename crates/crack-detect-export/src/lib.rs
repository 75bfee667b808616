//! crack-detect-export: Pure output formats for crack outlines (sans-IO)
//!
//! Converts polygons into region-of-interest subset files and renders
//! outline previews. Nothing here touches the filesystem.

pub mod preview;
pub mod roi;

pub use preview::render_outline;
pub use roi::{RegionOfInterest, RoiParseError, parse_roi, to_roi};
