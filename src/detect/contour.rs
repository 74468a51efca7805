use image::{DynamicImage, GrayImage, Luma};
use imageproc::contours::{BorderType, find_contours};
use imageproc::distance_transform::Norm;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::close;
use imageproc::point::Point;
use itertools::Itertools;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::PanelDetector;
use crate::geometry::PanelRect;

/// Detects panels as the outer contours of ink on the page.
///
/// The page is binarised against its local brightness (ink is foreground),
/// small gaps in panel borders are closed, and every outer contour enclosing
/// at least `min_area_ratio` of the page becomes a panel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContourDetector {
    pub min_area_ratio: f64,
    pub close_radius: u8,
    /// Gaussian weighting of the neighbourhood a pixel is compared with.
    /// 2.0 matches an 11 pixel block.
    pub threshold_sigma: f32,
    /// How much darker than its neighbourhood a pixel must be to count as ink.
    pub threshold_offset: u8,
}

impl Default for ContourDetector {
    fn default() -> Self {
        Self {
            min_area_ratio: 0.005,
            close_radius: 1,
            threshold_sigma: 2.0,
            threshold_offset: 2,
        }
    }
}

impl PanelDetector for ContourDetector {
    fn detect(&self, image: &DynamicImage) -> Vec<PanelRect> {
        info!("detect panels...");
        let gray = image.to_luma8();
        let sigma = if self.threshold_sigma > 0.0 {
            self.threshold_sigma
        } else {
            warn!("threshold_sigma must be positive, using the default");
            Self::default().threshold_sigma
        };
        let binary = binarize(&gray, sigma, self.threshold_offset);

        let binary = if self.close_radius > 0 {
            close(&binary, Norm::LInf, self.close_radius)
        } else {
            binary
        };

        let min_area = f64::from(gray.width()) * f64::from(gray.height()) * self.min_area_ratio;

        let panels: Vec<PanelRect> = find_contours::<i32>(&binary)
            .into_iter()
            .filter(|c| c.parent.is_none() && matches!(c.border_type, BorderType::Outer))
            .filter(|c| polygon_area(&c.points) > min_area)
            .filter_map(|c| bounding_rect(&c.points))
            .sorted_by_key(|p| (p.y1, p.x1))
            .collect();
        if panels.is_empty() {
            debug!("No panel outlines on the page");
        }

        info!("detect panels done with {}", panels.len());
        panels
    }
}

/// Ink becomes 255, paper 0. A pixel is ink when it is at least `offset`
/// darker than the Gaussian-weighted mean around it, so shading and uneven
/// scans do not turn whole regions into ink.
fn binarize(gray: &GrayImage, sigma: f32, offset: u8) -> GrayImage {
    let local_mean = gaussian_blur_f32(gray, sigma);
    let mut binary = gray.clone();
    for (pixel, mean) in binary.pixels_mut().zip(local_mean.pixels()) {
        let is_ink = i16::from(pixel.0[0]) <= i16::from(mean.0[0]) - i16::from(offset);
        *pixel = if is_ink { Luma([255]) } else { Luma([0]) };
    }
    binary
}

/// Bounds in the same convention as the guide file: `x2`/`y2` are exclusive.
fn bounding_rect(points: &[Point<i32>]) -> Option<PanelRect> {
    let (x1, x2) = points.iter().map(|p| p.x).minmax().into_option()?;
    let (y1, y2) = points.iter().map(|p| p.y).minmax().into_option()?;
    Some(PanelRect::new(x1, y1, x2 + 1, y2 + 1))
}

fn polygon_area(points: &[Point<i32>]) -> f64 {
    let twice_area: i64 = points
        .iter()
        .circular_tuple_windows()
        .map(|(a, b)| i64::from(a.x) * i64::from(b.y) - i64::from(b.x) * i64::from(a.y))
        .sum();
    twice_area.abs() as f64 / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::draw_panels;
    use image::{Rgb, RgbImage};
    use imageproc::drawing::draw_hollow_rect_mut;
    use imageproc::rect::Rect;

    fn page_with_panels(rects: &[Rect]) -> DynamicImage {
        let mut page = RgbImage::from_pixel(200, 300, Rgb([255, 255, 255]));
        for rect in rects {
            draw_hollow_rect_mut(&mut page, *rect, Rgb([0, 0, 0]));
        }
        DynamicImage::ImageRgb8(page)
    }

    #[test]
    fn finds_outlined_panels_in_reading_order() {
        let page = page_with_panels(&[
            Rect::at(10, 150).of_size(180, 100),
            Rect::at(110, 10).of_size(80, 120),
            Rect::at(10, 10).of_size(80, 120),
        ]);

        let panels = ContourDetector::default().detect(&page);

        assert_eq!(
            panels,
            vec![
                PanelRect::new(10, 10, 90, 130),
                PanelRect::new(110, 10, 190, 130),
                PanelRect::new(10, 150, 190, 250),
            ]
        );
    }

    #[test]
    fn shaded_page_keeps_only_outlines() {
        // Paper brightens from 120 on the left edge to 255 on the right.
        let mut page = RgbImage::from_fn(200, 300, |x, _| {
            let shade = (120 + x * 135 / 199) as u8;
            Rgb([shade, shade, shade])
        });
        draw_hollow_rect_mut(&mut page, Rect::at(10, 10).of_size(80, 120), Rgb([0, 0, 0]));
        draw_hollow_rect_mut(&mut page, Rect::at(110, 10).of_size(80, 120), Rgb([0, 0, 0]));

        let panels = ContourDetector::default().detect(&DynamicImage::ImageRgb8(page));

        assert_eq!(
            panels,
            vec![
                PanelRect::new(10, 10, 90, 130),
                PanelRect::new(110, 10, 190, 130),
            ]
        );
    }

    #[test]
    fn small_marks_are_ignored() {
        let page = page_with_panels(&[
            Rect::at(10, 10).of_size(180, 180),
            Rect::at(20, 250).of_size(5, 5),
        ]);

        let panels = ContourDetector::default().detect(&page);

        assert_eq!(panels, vec![PanelRect::new(10, 10, 190, 190)]);
    }

    #[test]
    fn blank_page_has_no_panels() {
        let page = page_with_panels(&[]);
        assert!(ContourDetector::default().detect(&page).is_empty());
    }

    #[test]
    fn closures_are_detectors() {
        let stub = |_: &DynamicImage| vec![PanelRect::new(0, 0, 5, 5)];
        let page = page_with_panels(&[]);

        assert_eq!(stub.detect(&page), vec![PanelRect::new(0, 0, 5, 5)]);
    }

    #[test]
    fn drawn_panels_are_detected_again() {
        let expected = vec![PanelRect::new(20, 20, 180, 140)];
        let mut page = page_with_panels(&[]);
        draw_panels(&mut page, &expected);

        assert_eq!(ContourDetector::default().detect(&page), expected);
    }
}
