//! PNG export of the narrative canvas.

use std::path::Path;

use image::{ImageBuffer, Rgb as Pixel, RgbImage};

use crate::narrative::{Mark, Rgb, Scene, Shape};

/// Page color behind the story.
const PAPER: Rgb = Rgb::new(0xfa, 0xfa, 0xfa);
/// Tick length of the year axis, in scene units.
const TICK_LENGTH: f64 = 6.0;

/// Export the current frame of `scene`, laid out on a `canvas` of scene
/// units, as a `width` x `height` PNG.
pub fn export_frame_png(
    scene: &Scene,
    canvas: (f64, f64),
    path: &Path,
    width: u32,
    height: u32,
) -> Result<(), image::ImageError> {
    let img = render_frame(scene, canvas, width, height);
    img.save(path)
}

/// Rasterise every mark in drawing order, alpha-blended onto the page.
pub fn render_frame(scene: &Scene, canvas: (f64, f64), width: u32, height: u32) -> RgbImage {
    let mut img: RgbImage = ImageBuffer::from_pixel(width, height, Pixel([PAPER.r, PAPER.g, PAPER.b]));
    let sx = width as f64 / canvas.0.max(1.0);
    let sy = height as f64 / canvas.1.max(1.0);
    let mut raster = Raster { img: &mut img, sx, sy };

    for mark in scene.marks() {
        if mark.opacity <= 0.0 {
            continue;
        }
        raster.draw(mark);
    }
    img
}

struct Raster<'a> {
    img: &'a mut RgbImage,
    sx: f64,
    sy: f64,
}

impl Raster<'_> {
    fn draw(&mut self, mark: &Mark) {
        match &mark.shape {
            Shape::Circle => {
                let r = mark.radius * self.sx.min(self.sy);
                let (cx, cy) = (mark.x * self.sx, mark.y * self.sy);
                self.fill(cx - r, cy - r, cx + r, cy + r, mark, |x, y| {
                    let (dx, dy) = (x - cx, y - cy);
                    dx * dx + dy * dy <= r * r
                });
            }
            Shape::Rect { width, height } => {
                let (x0, y0) = (mark.x * self.sx, mark.y * self.sy);
                let (x1, y1) = ((mark.x + width) * self.sx, (mark.y + height) * self.sy);
                self.fill(x0, y0, x1, y1, mark, |_, _| true);
            }
            Shape::Line { dx, dy, stroke } => {
                let from = (mark.x, mark.y);
                let to = (mark.x + dx, mark.y + dy);
                self.segment(from, to, *stroke, mark);
            }
            Shape::Axis { scale, ticks } => {
                let (r0, r1) = scale.range;
                self.segment((r0, mark.y), (r1, mark.y), 1.0, mark);
                for tick in scale.ticks(*ticks) {
                    let x = scale.map(tick);
                    self.segment((x, mark.y), (x, mark.y + TICK_LENGTH), 1.0, mark);
                }
            }
        }
    }

    /// Stroke a segment given in scene units.
    fn segment(&mut self, from: (f64, f64), to: (f64, f64), stroke: f64, mark: &Mark) {
        let (ax, ay) = (from.0 * self.sx, from.1 * self.sy);
        let (bx, by) = (to.0 * self.sx, to.1 * self.sy);
        let half = (stroke * self.sx.min(self.sy) / 2.0).max(0.5);
        let (vx, vy) = (bx - ax, by - ay);
        let len2 = vx * vx + vy * vy;

        self.fill(
            ax.min(bx) - half,
            ay.min(by) - half,
            ax.max(bx) + half,
            ay.max(by) + half,
            mark,
            |x, y| {
                let t = if len2 == 0.0 { 0.0 } else { (((x - ax) * vx + (y - ay) * vy) / len2).clamp(0.0, 1.0) };
                let (px, py) = (ax + t * vx - x, ay + t * vy - y);
                px * px + py * py <= half * half
            },
        );
    }

    /// Blend `mark` into every pixel of the box whose centre passes `inside`.
    fn fill(&mut self, x0: f64, y0: f64, x1: f64, y1: f64, mark: &Mark, inside: impl Fn(f64, f64) -> bool) {
        let (w, h) = (self.img.width() as i64, self.img.height() as i64);
        let px0 = (x0.floor() as i64).max(0);
        let py0 = (y0.floor() as i64).max(0);
        let px1 = (x1.ceil() as i64).min(w - 1);
        let py1 = (y1.ceil() as i64).min(h - 1);

        for py in py0..=py1 {
            for px in px0..=px1 {
                if !inside(px as f64 + 0.5, py as f64 + 0.5) {
                    continue;
                }
                let pixel = self.img.get_pixel_mut(px as u32, py as u32);
                let below = Rgb::new(pixel[0], pixel[1], pixel[2]);
                let c = mark.color.over(below, mark.opacity);
                *pixel = Pixel([c.r, c.g, c.b]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::narrative::MarkClass;

    #[test]
    fn test_circle_is_filled_and_blended() {
        let mut scene = Scene::new();
        scene.add(
            Mark::new(MarkClass::SingleCircle, Shape::Circle, 50.0, 50.0, Rgb::new(0, 0, 0))
                .radius(10.0)
                .opacity(0.5),
        );
        let img = render_frame(&scene, (100.0, 100.0), 100, 100);
        assert_eq!(img.get_pixel(50, 50), &Pixel([125, 125, 125]));
        assert_eq!(img.get_pixel(5, 5), &Pixel([PAPER.r, PAPER.g, PAPER.b]));
    }

    #[test]
    fn test_scales_to_image_size() {
        let mut scene = Scene::new();
        scene.add(Mark::new(
            MarkClass::PersonFigure,
            Shape::Rect { width: 100.0, height: 100.0 },
            100.0,
            100.0,
            Rgb::new(0x2c, 0x3e, 0x50),
        ));
        let img = render_frame(&scene, (400.0, 400.0), 200, 200);
        assert_eq!(img.get_pixel(75, 75), &Pixel([0x2c, 0x3e, 0x50]));
        assert_eq!(img.get_pixel(150, 150), &Pixel([PAPER.r, PAPER.g, PAPER.b]));
    }

    #[test]
    fn test_invisible_marks_are_skipped() {
        let mut scene = Scene::new();
        scene.add(
            Mark::new(MarkClass::WarCircle, Shape::Circle, 50.0, 50.0, Rgb::new(255, 0, 0))
                .radius(40.0)
                .opacity(0.0),
        );
        let img = render_frame(&scene, (100.0, 100.0), 100, 100);
        assert!(img.pixels().all(|p| *p == Pixel([PAPER.r, PAPER.g, PAPER.b])));
    }

    #[test]
    fn test_line_has_stroke_width() {
        let mut scene = Scene::new();
        scene.add(Mark::new(
            MarkClass::Divider,
            Shape::Line { dx: 0.0, dy: 80.0, stroke: 4.0 },
            50.0,
            10.0,
            Rgb::new(0x55, 0x55, 0x55),
        ));
        let img = render_frame(&scene, (100.0, 100.0), 100, 100);
        assert_eq!(img.get_pixel(50, 50), &Pixel([0x55, 0x55, 0x55]));
        assert_eq!(img.get_pixel(55, 50), &Pixel([PAPER.r, PAPER.g, PAPER.b]));
    }
}
