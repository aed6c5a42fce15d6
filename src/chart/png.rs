//! Raster rendering of the stacked-area chart.

use anyhow::{Context, Result};
use image::{ImageFormat, Rgb, RgbImage};
use std::path::Path;

use super::{edges_at, layer_color};
use crate::engine::ChartSeries;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const AXIS: Rgb<u8> = Rgb([40, 40, 40]);

/// Plot area inside the image, in pixels. `right`/`bottom` are inclusive.
#[derive(Debug, Clone, Copy)]
struct PlotArea {
    left: u32,
    top: u32,
    right: u32,
    bottom: u32,
}

impl PlotArea {
    fn for_image(width: u32, height: u32) -> Self {
        let margin_x = (width / 16).max(4);
        let margin_y = (height / 12).max(4);
        Self {
            left: margin_x,
            top: margin_y,
            right: width.saturating_sub(margin_x + 1),
            bottom: height.saturating_sub(margin_y + 1),
        }
    }

    /// Too small an image leaves no room inside the margins.
    fn is_degenerate(&self) -> bool {
        self.right <= self.left || self.bottom <= self.top
    }

    fn plot_height(&self) -> f64 {
        (self.bottom - self.top) as f64
    }

    /// Pixel row for a value on a 0..=y_max scale.
    fn row(&self, value: f64, y_max: f64) -> u32 {
        let frac = (value / y_max).clamp(0.0, 1.0);
        self.bottom - (frac * self.plot_height()).round() as u32
    }
}

/// The y extent: 100 for percentage charts, otherwise the tallest stack.
pub fn y_max(series: &ChartSeries) -> f64 {
    if series.percentages {
        100.0
    } else {
        series.max_total().max(1.0)
    }
}

/// Draw the series into a fresh image.
pub fn rasterize(series: &ChartSeries, width: u32, height: u32) -> RgbImage {
    let mut img = RgbImage::from_pixel(width, height, BACKGROUND);
    let area = PlotArea::for_image(width, height);
    if area.is_degenerate() {
        return img;
    }

    if !series.is_empty() && !series.layers.is_empty() {
        let stacked = series.stacked();
        let y_max = y_max(series);
        let columns = area.right.saturating_sub(area.left);

        for px in area.left..=area.right {
            let t = if columns == 0 { 0.0 } else { (px - area.left) as f64 / columns as f64 };
            let edges = edges_at(series, &stacked, t);
            let mut lower = 0.0;
            for (layer, &upper) in edges.iter().enumerate() {
                let (r, g, b) = layer_color(layer);
                let top_row = area.row(upper, y_max);
                let bottom_row = area.row(lower, y_max);
                if upper > lower {
                    for py in top_row..=bottom_row {
                        img.put_pixel(px, py, Rgb([r, g, b]));
                    }
                }
                lower = upper;
            }
        }
    }

    draw_frame(&mut img, area);
    img
}

fn draw_frame(img: &mut RgbImage, area: PlotArea) {
    for x in area.left..=area.right {
        img.put_pixel(x, area.bottom, AXIS);
        img.put_pixel(x, area.top, AXIS);
    }
    for y in area.top..=area.bottom {
        img.put_pixel(area.left, y, AXIS);
        img.put_pixel(area.right, y, AXIS);
    }
}

/// Render to a PNG file, creating the parent directory if needed.
pub fn render(series: &ChartSeries, path: &Path, width: u32, height: u32) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
    }
    rasterize(series, width, height)
        .save_with_format(path, ImageFormat::Png)
        .with_context(|| format!("Failed to write chart: {}", path.display()))?;
    tracing::info!(path = %path.display(), width, height, "chart written");
    Ok(())
}
