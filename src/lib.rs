#![warn(clippy::all, rust_2018_idioms)]
#![allow(
    clippy::must_use_candidate,
    clippy::module_name_repetitions,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::float_cmp
)]
//! Panel guides for comic pages: the panel rectangles of every page, edited
//! by hand or detected from the page image, and stored next to the comic in a
//! `.gui` file.

pub mod batch;
pub mod detect;
pub mod editing;
pub mod geometry;
pub mod guide;
pub mod manager;
pub mod page_source;
pub mod settings;
pub mod view;

pub use batch::{BatchReport, parse_page_ranges};
pub use detect::{ContourDetector, PanelDetector};
pub use geometry::PanelRect;
pub use guide::{PageKey, PanelStore};
pub use manager::{PanelError, PanelManager};
pub use page_source::{DirectoryPageSource, PageSource, PageSourceError};
pub use settings::Settings;
pub use view::{ViewMode, Viewer, ViewerState};
