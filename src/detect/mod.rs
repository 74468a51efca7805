use image::{DynamicImage, Rgba};
use imageproc::drawing::draw_hollow_rect_mut;

use crate::geometry::PanelRect;

pub mod contour;

pub use contour::ContourDetector;

/// Finds candidate panels on a page image, in reading order.
pub trait PanelDetector {
    fn detect(&self, image: &DynamicImage) -> Vec<PanelRect>;
}

impl<F> PanelDetector for F
where
    F: Fn(&DynamicImage) -> Vec<PanelRect>,
{
    fn detect(&self, image: &DynamicImage) -> Vec<PanelRect> {
        self(image)
    }
}

/// Outlines panels on a page, e.g. for a debug preview.
pub fn draw_panels(img: &mut DynamicImage, panels: &[PanelRect]) {
    let red = Rgba([255, 0, 0, 255]);

    for rect in panels.iter().filter_map(PanelRect::to_rect) {
        draw_hollow_rect_mut(img, rect, red);
    }
}
