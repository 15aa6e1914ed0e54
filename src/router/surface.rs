// SPDX-License-Identifier: GPL-3.0-only

//! 2D drawing for the projector overlay
//!
//! Strokes are centred on the geometry, so a 5 px border on the image edge
//! leaves about 3 px visible inside the image.

use crate::constants::overlay;
use image::{Rgba, RgbaImage};

/// Minimal canvas the overlay is drawn on
pub trait DrawingSurface {
    /// Surface size in pixels
    fn size(&self) -> (u32, u32);

    fn clear(&mut self, color: [u8; 4]);

    fn stroke_rect(&mut self, x: i32, y: i32, width: u32, height: u32, stroke: u32, color: [u8; 4]);

    fn stroke_circle(&mut self, cx: i32, cy: i32, radius: u32, stroke: u32, color: [u8; 4]);

    fn fill_circle(&mut self, cx: i32, cy: i32, radius: u32, color: [u8; 4]);
}

/// Draw the blob overlay: black background, white border, one marker per blob
///
/// Each `(x, y)` pair gets an outlined ring and a filled center dot. A
/// trailing unpaired value is ignored. Returns the number of markers drawn.
pub fn draw_blob_overlay(surface: &mut dyn DrawingSurface, descriptors: &[i32]) -> usize {
    let (width, height) = surface.size();
    surface.clear(overlay::BACKGROUND);
    surface.stroke_rect(
        0,
        0,
        width,
        height,
        overlay::STROKE_WIDTH,
        overlay::FOREGROUND,
    );

    let mut markers = 0;
    for center in descriptors.chunks_exact(2) {
        let (x, y) = (center[0], center[1]);
        surface.stroke_circle(
            x,
            y,
            overlay::OUTER_RING_RADIUS,
            overlay::STROKE_WIDTH,
            overlay::FOREGROUND,
        );
        surface.fill_circle(x, y, overlay::CENTER_DOT_RADIUS, overlay::FOREGROUND);
        markers += 1;
    }
    markers
}

/// Clamp the half-open span `[start, end)` to `[0, limit)`
fn clip(start: f32, end: f32, limit: u32) -> std::ops::Range<u32> {
    let lo = start.floor().max(0.0) as u32;
    let hi = (end.ceil().max(0.0) as u32).min(limit);
    lo.min(hi)..hi
}

/// Visit every pixel whose center lies at a distance in `[inner, outer]`
/// from `(cx, cy)`
fn for_each_in_ring(
    (width, height): (u32, u32),
    (cx, cy): (i32, i32),
    inner: f32,
    outer: f32,
    mut visit: impl FnMut(u32, u32),
) {
    let (cx, cy) = (cx as f32, cy as f32);
    let inner_sq = if inner > 0.0 { inner * inner } else { -1.0 };
    let outer_sq = outer * outer;
    for y in clip(cy - outer, cy + outer + 1.0, height) {
        let dy = y as f32 + 0.5 - cy;
        for x in clip(cx - outer, cx + outer + 1.0, width) {
            let dx = x as f32 + 0.5 - cx;
            let d = dx * dx + dy * dy;
            if d <= outer_sq && d >= inner_sq {
                visit(x, y);
            }
        }
    }
}

impl DrawingSurface for RgbaImage {
    fn size(&self) -> (u32, u32) {
        self.dimensions()
    }

    fn clear(&mut self, color: [u8; 4]) {
        for pixel in self.pixels_mut() {
            *pixel = Rgba(color);
        }
    }

    fn stroke_rect(&mut self, x: i32, y: i32, width: u32, height: u32, stroke: u32, color: [u8; 4]) {
        let half = stroke as f32 / 2.0;
        let (left, top) = (x as f32, y as f32);
        let (right, bottom) = (left + width as f32, top + height as f32);
        let (img_w, img_h) = self.dimensions();

        for py in clip(top - half, bottom + half, img_h) {
            let cy = py as f32 + 0.5;
            let horizontal_edge = (cy - top).abs() <= half || (cy - bottom).abs() <= half;
            for px in clip(left - half, right + half, img_w) {
                let cx = px as f32 + 0.5;
                let vertical_edge = (cx - left).abs() <= half || (cx - right).abs() <= half;
                if horizontal_edge || vertical_edge {
                    self.put_pixel(px, py, Rgba(color));
                }
            }
        }
    }

    fn stroke_circle(&mut self, cx: i32, cy: i32, radius: u32, stroke: u32, color: [u8; 4]) {
        let half = stroke as f32 / 2.0;
        let radius = radius as f32;
        let size = self.dimensions();
        for_each_in_ring(size, (cx, cy), radius - half, radius + half, |x, y| {
            self.put_pixel(x, y, Rgba(color));
        });
    }

    fn fill_circle(&mut self, cx: i32, cy: i32, radius: u32, color: [u8; 4]) {
        let size = self.dimensions();
        for_each_in_ring(size, (cx, cy), 0.0, radius as f32, |x, y| {
            self.put_pixel(x, y, Rgba(color));
        });
    }
}
