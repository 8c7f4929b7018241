//! Rasterizes a [`Scene`] into a fixed-size RGBA frame.
//!
//! Rendering is a pure function of the scene: background stretched over the
//! whole canvas, then every layer bottom to top, then the selection
//! adornment for the selected layer. The same scene always produces the
//! same pixels.

use std::sync::Arc;

use ab_glyph::{Font, OutlineCurve};
use egui::{Color32, Vec2};
use image::RgbaImage;
use log::trace;
use tiny_skia::{
    Color, FillRule, FilterQuality, LineJoin, Paint, Path, PathBuilder, Pixmap, PixmapPaint, Stroke, Transform,
};

use crate::error::RenderError;
use crate::geometry::{HANDLE_SIZE, Handle, OrientedBox, ROTATION_HANDLE_OFFSET};
use crate::layer::TextLayer;
use crate::scene::Scene;
use crate::text::{FontBook, ITALIC_SLANT, TextLayout};

/// Canvas color where no background has been loaded
pub const EMPTY_CANVAS: Color32 = Color32::from_rgb(240, 240, 240);
pub const ADORNMENT_COLOR: Color32 = Color32::from_rgb(30, 144, 255);
const ADORNMENT_STROKE_WIDTH: f32 = 1.5;
/// Synthetic bold stroke, relative to the font size
const BOLD_STROKE_RATIO: f32 = 0.04;

/// One rendered image of the scene, tagged with the scene version it shows
#[derive(Clone)]
pub struct Frame {
    scene_version: u64,
    image: Arc<RgbaImage>,
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("scene_version", &self.scene_version)
            .field("size", &self.image.dimensions())
            .finish()
    }
}

impl Frame {
    pub fn scene_version(&self) -> u64 {
        self.scene_version
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Straight (not premultiplied) RGBA pixels
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn to_color_image(&self) -> egui::ColorImage {
        let size = [self.image.width() as usize, self.image.height() as usize];
        egui::ColorImage::from_rgba_unmultiplied(size, self.image.as_raw())
    }
}

#[derive(Debug)]
pub struct Renderer {
    width: u32,
    height: u32,
    fonts: Arc<FontBook>,
}

impl Renderer {
    pub fn new(canvas_size: Vec2, fonts: Arc<FontBook>) -> Result<Self, RenderError> {
        let width = canvas_size.x.round().max(0.0) as u32;
        let height = canvas_size.y.round().max(0.0) as u32;
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidCanvasSize { width, height });
        }
        Ok(Self { width, height, fonts })
    }

    pub fn fonts(&self) -> &Arc<FontBook> {
        &self.fonts
    }

    pub fn render(&self, scene: &Scene) -> Result<Frame, RenderError> {
        let mut pixmap = Pixmap::new(self.width, self.height).ok_or(RenderError::InvalidCanvasSize {
            width: self.width,
            height: self.height,
        })?;

        self.draw_background(&mut pixmap, scene);
        for layer in scene.layers() {
            self.draw_layer(&mut pixmap, layer);
        }
        if let Some(selected) = scene.selected_layer() {
            self.draw_adornment(&mut pixmap, selected);
        }

        trace!("Rendered scene version {}", scene.version());
        Ok(Frame {
            scene_version: scene.version(),
            image: Arc::new(demultiply(&pixmap)),
        })
    }

    fn draw_background(&self, pixmap: &mut Pixmap, scene: &Scene) {
        let Some(background) = scene.background() else {
            pixmap.fill(skia_color(EMPTY_CANVAS));
            return;
        };
        pixmap.fill(Color::WHITE);
        let scale_x = self.width as f32 / background.width() as f32;
        let scale_y = self.height as f32 / background.height() as f32;
        let paint = PixmapPaint {
            quality: FilterQuality::Bilinear,
            ..Default::default()
        };
        pixmap.draw_pixmap(
            0,
            0,
            background.pixmap().as_ref(),
            &paint,
            Transform::from_scale(scale_x, scale_y),
            None,
        );
    }

    fn draw_layer(&self, pixmap: &mut Pixmap, layer: &TextLayer) {
        let layout = self.fonts.layout(layer);
        let slant = if layer.font_style.italic { ITALIC_SLANT } else { 0.0 };
        let Some(path) = glyph_path(self.fonts.face(layer.font_family), &layout, slant) else {
            return;
        };
        let transform = layer_transform(layer);

        let mut paint = Paint::default();
        paint.anti_alias = true;
        paint.set_color(skia_color(layer.fill));
        pixmap.fill_path(&path, &paint, FillRule::Winding, transform, None);

        if layer.font_style.bold {
            let stroke = Stroke {
                width: layer.font_size * BOLD_STROKE_RATIO,
                line_join: LineJoin::Round,
                ..Default::default()
            };
            pixmap.stroke_path(&path, &paint, &stroke, transform, None);
        }

        if layer.stroke_width > 0.0 && layer.stroke.a() > 0 {
            paint.set_color(skia_color(layer.stroke));
            let stroke = Stroke {
                width: layer.stroke_width,
                line_join: LineJoin::Round,
                ..Default::default()
            };
            pixmap.stroke_path(&path, &paint, &stroke, transform, None);
        }
    }

    /// Bounding box, corner handles and the rotate handle with its stem
    fn draw_adornment(&self, pixmap: &mut Pixmap, layer: &TextLayer) {
        let bounds = OrientedBox::for_layer(layer, &self.fonts);
        let transform = layer_transform(layer);
        let mut outline = Paint::default();
        outline.anti_alias = true;
        outline.set_color(skia_color(ADORNMENT_COLOR));
        let mut fill = Paint::default();
        fill.anti_alias = true;
        fill.set_color(Color::WHITE);
        let stroke = Stroke {
            width: ADORNMENT_STROKE_WIDTH,
            ..Default::default()
        };

        if let Some(rect) = tiny_skia::Rect::from_xywh(0.0, 0.0, bounds.size.x.max(1.0), bounds.size.y.max(1.0)) {
            let path = PathBuilder::from_rect(rect);
            pixmap.stroke_path(&path, &outline, &stroke, transform, None);
        }

        let top_center = bounds.handle_local(Handle::TopLeft) + Vec2::new(bounds.size.x / 2.0, 0.0);
        let mut stem = PathBuilder::new();
        stem.move_to(top_center.x, top_center.y);
        stem.line_to(top_center.x, top_center.y - ROTATION_HANDLE_OFFSET);
        if let Some(path) = stem.finish() {
            pixmap.stroke_path(&path, &outline, &stroke, transform, None);
        }

        for handle in Handle::ALL {
            let at = bounds.handle_local(handle);
            let path = if handle.is_corner() {
                tiny_skia::Rect::from_xywh(at.x - HANDLE_SIZE / 2.0, at.y - HANDLE_SIZE / 2.0, HANDLE_SIZE, HANDLE_SIZE)
                    .map(PathBuilder::from_rect)
            } else {
                PathBuilder::from_circle(at.x, at.y, HANDLE_SIZE / 2.0)
            };
            if let Some(path) = path {
                pixmap.fill_path(&path, &fill, FillRule::Winding, transform, None);
                pixmap.stroke_path(&path, &outline, &stroke, transform, None);
            }
        }
    }
}

/// Box-local coordinates to canvas: rotate about the anchor, then place it
fn layer_transform(layer: &TextLayer) -> Transform {
    Transform::from_translate(layer.position.x, layer.position.y).pre_rotate(layer.rotation)
}

/// All glyph outlines of `layout` as one path in box-local pixels
fn glyph_path(face: &impl Font, layout: &TextLayout, slant: f32) -> Option<Path> {
    let mut builder = PathBuilder::new();
    let scale = layout.scale;

    for line in &layout.lines {
        for glyph in &line.glyphs {
            let Some(outline) = face.outline(glyph.id) else {
                continue;
            };
            let origin_x = line.offset_x + glyph.x;
            // font units are y-up; shear the x axis by the height above the baseline
            let map = |p: ab_glyph::Point| {
                let up = p.y * scale;
                (origin_x + p.x * scale + up * slant, line.baseline - up)
            };

            let mut last: Option<(f32, f32)> = None;
            for curve in &outline.curves {
                let (start, end) = match curve {
                    OutlineCurve::Line(a, b) => (map(*a), map(*b)),
                    OutlineCurve::Quad(a, _, c) => (map(*a), map(*c)),
                    OutlineCurve::Cubic(a, _, _, d) => (map(*a), map(*d)),
                };
                if last != Some(start) {
                    if last.is_some() {
                        builder.close();
                    }
                    builder.move_to(start.0, start.1);
                }
                match curve {
                    OutlineCurve::Line(_, _) => builder.line_to(end.0, end.1),
                    OutlineCurve::Quad(_, b, _) => {
                        let b = map(*b);
                        builder.quad_to(b.0, b.1, end.0, end.1);
                    }
                    OutlineCurve::Cubic(_, b, c, _) => {
                        let (b, c) = (map(*b), map(*c));
                        builder.cubic_to(b.0, b.1, c.0, c.1, end.0, end.1);
                    }
                }
                last = Some(end);
            }
            if last.is_some() {
                builder.close();
            }
        }
    }

    builder.finish()
}

fn skia_color(color: Color32) -> Color {
    let [r, g, b, a] = color.to_srgba_unmultiplied();
    Color::from_rgba8(r, g, b, a)
}

fn demultiply(pixmap: &Pixmap) -> RgbaImage {
    let mut image = RgbaImage::new(pixmap.width(), pixmap.height());
    for (dst, src) in image.pixels_mut().zip(pixmap.pixels()) {
        let color = src.demultiply();
        dst.0 = [color.red(), color.green(), color.blue(), color.alpha()];
    }
    image
}
