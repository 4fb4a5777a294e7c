//! Livability CLI library.
//!
//! Rendering helpers shared by the `livability-cli` binary. Every renderer
//! writes to an arbitrary [`std::io::Write`] so the output can be checked
//! without spawning the binary.

pub mod output;

pub use output::{
    render_index, render_places_json, render_places_text, render_route, OutputFormat, PlaceRow,
};
