//! Audio files on disk, turned into the links of the demo page.

mod model;
mod scan;

pub use model::Track;
pub use scan::scan;
