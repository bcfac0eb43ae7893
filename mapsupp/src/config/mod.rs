//! Configuration for the build pipeline.
//!
//! Groups everything a run needs into one immutable value constructed by the
//! caller: paths, glob patterns, the style layout and the extraction policy.
//! Command names and pattern defaults live in [`defaults`] as constants that
//! flow in through the config value; nothing here is mutable static state.
//!
//! # Example
//!
//! ```
//! use mapsupp::config::{Layout, PipelineConfig};
//!
//! let config = PipelineConfig::new("/mnt/geo/openmtbmap")
//!     .with_layout(Layout::Wide)
//!     .with_force_extract(true);
//! assert_eq!(config.layout(), Layout::Wide);
//! ```

pub mod defaults;
mod layout;
mod pipeline;

pub use layout::Layout;
pub use pipeline::PipelineConfig;
