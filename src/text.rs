//! Font faces and text layout shared by hit testing and rendering.
//!
//! Layout follows the canvas text model the editor mimics: one line per
//! `\n`, line height equal to the font size, lines aligned inside a box as
//! wide as the widest line.

use std::collections::HashMap;
use std::path::Path;

use ab_glyph::{Font, FontArc, FontVec, GlyphId};
use egui::Vec2;
use log::{debug, info, warn};

use crate::config::FontConfig;
use crate::error::FontError;
use crate::layer::{FontFamily, GenericFamily, TextAlign, TextLayer};

/// Horizontal shear applied to synthesize italics
pub const ITALIC_SLANT: f32 = 0.2;

const SANS_FACE: &str = "Ubuntu-Light";
const MONO_FACE: &str = "Hack";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionedGlyph {
    pub id: GlyphId,
    /// Pen position relative to the line start, in pixels
    pub x: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineLayout {
    pub glyphs: Vec<PositionedGlyph>,
    pub width: f32,
    /// Offset of the line start from the layer's left edge (alignment)
    pub offset_x: f32,
    /// Baseline relative to the layer's top edge
    pub baseline: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    pub lines: Vec<LineLayout>,
    /// Unrotated bounding box size
    pub size: Vec2,
    /// Font units to pixels
    pub scale: f32,
}

/// Loaded font faces, resolved per [`FontFamily`]
#[derive(Clone)]
pub struct FontBook {
    sans: FontArc,
    mono: FontArc,
    families: HashMap<FontFamily, FontArc>,
}

impl std::fmt::Debug for FontBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut overridden: Vec<_> = self.families.keys().collect();
        overridden.sort();
        f.debug_struct("FontBook")
            .field("overrides", &overridden)
            .finish_non_exhaustive()
    }
}

impl FontBook {
    /// Faces bundled with egui: a proportional face for every family and a
    /// monospace face for Courier New.
    pub fn with_defaults() -> Result<Self, FontError> {
        let definitions = egui::FontDefinitions::default();
        let load = |name: &'static str| -> Result<FontArc, FontError> {
            let data = definitions.font_data.get(name).ok_or(FontError::MissingFace(name))?;
            let face = FontVec::try_from_vec_and_index(data.font.to_vec(), data.index)
                .map_err(|_| FontError::InvalidFont(name.to_owned()))?;
            Ok(FontArc::new(face))
        };

        Ok(Self {
            sans: load(SANS_FACE)?,
            mono: load(MONO_FACE)?,
            families: HashMap::new(),
        })
    }

    /// Defaults, then the installed system face for every family that has
    /// one, then any font files named in the config. A bad override is
    /// logged and skipped so the editor still starts.
    pub fn from_config(config: &FontConfig) -> Result<Self, FontError> {
        let mut book = Self::with_system_fonts()?;
        for (family, path) in &config.files {
            match load_font_file(path) {
                Ok(face) => {
                    info!("Loaded font for {}: {}", family.label(), path.display());
                    book.families.insert(*family, face);
                }
                Err(err) => warn!("Skipping font for {}: {err}", family.label()),
            }
        }
        Ok(book)
    }

    /// Defaults with every family resolved by name against the installed fonts
    pub fn with_system_fonts() -> Result<Self, FontError> {
        let mut book = Self::with_defaults()?;
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        debug!("Font database has {} faces", db.len());
        book.resolve_installed(&db);
        Ok(book)
    }

    fn resolve_installed(&mut self, db: &fontdb::Database) {
        for family in FontFamily::ALL {
            if self.families.contains_key(&family) {
                continue;
            }
            match face_from_db(db, family_candidates(family)) {
                Some(face) => {
                    self.families.insert(family, face);
                }
                None => info!("No installed face for {}, using the bundled fallback", family.label()),
            }
        }
    }

    /// Whether `family` has its own face rather than the generic fallback
    pub fn is_resolved(&self, family: FontFamily) -> bool {
        self.families.contains_key(&family)
    }

    pub fn insert(&mut self, family: FontFamily, face: FontArc) {
        self.families.insert(family, face);
    }

    pub fn face(&self, family: FontFamily) -> &FontArc {
        if let Some(face) = self.families.get(&family) {
            return face;
        }
        match family.generic() {
            GenericFamily::Monospace => &self.mono,
            GenericFamily::SansSerif | GenericFamily::Serif => &self.sans,
        }
    }

    pub fn layout(&self, layer: &TextLayer) -> TextLayout {
        layout_text(self.face(layer.font_family), &layer.content, layer.font_size, layer.align)
    }

    /// Unrotated size of the layer's box
    pub fn measure(&self, layer: &TextLayer) -> Vec2 {
        self.layout(layer).size
    }
}

/// Installed family names to try, best match first. Metric-compatible
/// replacements follow the proprietary name.
fn family_candidates(family: FontFamily) -> &'static [&'static str] {
    match family {
        FontFamily::Impact => &["Impact", "Anton", "Oswald", "League Gothic"],
        FontFamily::Arial => &["Arial", "Liberation Sans", "Arimo", "Helvetica"],
        FontFamily::ComicSans => &["Comic Sans MS", "Comic Neue", "Comic Relief"],
        FontFamily::CourierNew => &["Courier New", "Liberation Mono", "Cousine", "Courier", "DejaVu Sans Mono"],
        FontFamily::TimesNewRoman => &["Times New Roman", "Liberation Serif", "Tinos", "Times", "DejaVu Serif"],
        FontFamily::Verdana => &["Verdana", "DejaVu Sans"],
    }
}

/// First of `names` with a regular face in `db`
fn face_from_db(db: &fontdb::Database, names: &[&str]) -> Option<FontArc> {
    names.iter().find_map(|name| {
        let families = [fontdb::Family::Name(name)];
        let query = fontdb::Query {
            families: &families,
            ..fontdb::Query::default()
        };
        let id = db.query(&query)?;
        let face = db.with_face_data(id, |data, index| FontVec::try_from_vec_and_index(data.to_vec(), index))?;
        match face {
            Ok(face) => {
                debug!("Resolved font family '{name}'");
                Some(FontArc::new(face))
            }
            Err(_) => {
                warn!("Installed face for '{name}' could not be parsed");
                None
            }
        }
    })
}

fn load_font_file(path: &Path) -> Result<FontArc, FontError> {
    let bytes = std::fs::read(path)?;
    FontArc::try_from_vec(bytes).map_err(|_| FontError::InvalidFont(path.display().to_string()))
}

pub fn layout_text(face: &FontArc, content: &str, font_size: f32, align: TextAlign) -> TextLayout {
    let units_per_em = face.units_per_em().filter(|u| *u > 0.0).unwrap_or(1000.0);
    let scale = font_size / units_per_em;
    let ascent = face.ascent_unscaled() * scale;
    let descent = face.descent_unscaled() * scale;
    let baseline_in_line = (font_size + ascent + descent) / 2.0;

    let mut lines: Vec<LineLayout> = content
        .split('\n')
        .enumerate()
        .map(|(index, line)| {
            let mut glyphs = Vec::new();
            let mut pen = 0.0;
            let mut previous: Option<GlyphId> = None;
            for ch in line.chars() {
                let ch = if ch == '\t' { ' ' } else { ch };
                if ch.is_control() {
                    continue;
                }
                let id = face.glyph_id(ch);
                if let Some(prev) = previous {
                    pen += face.kern_unscaled(prev, id) * scale;
                }
                glyphs.push(PositionedGlyph { id, x: pen });
                pen += face.h_advance_unscaled(id) * scale;
                previous = Some(id);
            }
            LineLayout {
                glyphs,
                width: pen,
                offset_x: 0.0,
                baseline: index as f32 * font_size + baseline_in_line,
            }
        })
        .collect();

    let width = lines.iter().map(|line| line.width).fold(0.0, f32::max);
    for line in &mut lines {
        line.offset_x = match align {
            TextAlign::Left => 0.0,
            TextAlign::Center => (width - line.width) / 2.0,
            TextAlign::Right => width - line.width,
        };
    }

    let height = lines.len() as f32 * font_size;
    TextLayout { lines, size: Vec2::new(width, height), scale }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{LayerDefaults, create_layer};

    fn book() -> FontBook {
        FontBook::with_defaults().expect("egui default fonts")
    }

    fn layer_with(content: &str, size: f32, align: TextAlign) -> TextLayer {
        let mut layer = create_layer(&LayerDefaults::default(), 0, Vec2::new(600.0, 600.0));
        layer.content = content.to_owned();
        layer.font_size = size;
        layer.align = align;
        layer
    }

    #[test]
    fn test_height_is_lines_times_size() {
        let book = book();
        let size = book.measure(&layer_with("one\ntwo\nthree", 20.0, TextAlign::Left));
        assert_eq!(size.y, 60.0);
        assert!(size.x > 0.0);
    }

    #[test]
    fn test_width_scales_with_font_size() {
        let book = book();
        let small = book.measure(&layer_with("HELLO", 20.0, TextAlign::Center));
        let large = book.measure(&layer_with("HELLO", 40.0, TextAlign::Center));
        assert!((large.x - small.x * 2.0).abs() < 0.01);
    }

    #[test]
    fn test_alignment_offsets() {
        let book = book();
        let layout = book.layout(&layer_with("WIDE LINE\nx", 30.0, TextAlign::Right));
        let short = &layout.lines[1];
        assert!((short.offset_x + short.width - layout.size.x).abs() < 0.001);

        let layout = book.layout(&layer_with("WIDE LINE\nx", 30.0, TextAlign::Center));
        let short = &layout.lines[1];
        assert!((short.offset_x * 2.0 + short.width - layout.size.x).abs() < 0.001);
    }

    #[test]
    fn test_empty_content_has_one_empty_line() {
        let layout = book().layout(&layer_with("", 32.0, TextAlign::Center));
        assert_eq!(layout.lines.len(), 1);
        assert_eq!(layout.size, Vec2::new(0.0, 32.0));
    }

    fn bundled_db() -> fontdb::Database {
        let definitions = egui::FontDefinitions::default();
        let mut db = fontdb::Database::new();
        for name in [SANS_FACE, MONO_FACE] {
            db.load_font_data(definitions.font_data[name].font.to_vec());
        }
        db
    }

    #[test]
    fn test_face_from_db_takes_first_installed_name() {
        let db = bundled_db();
        assert!(face_from_db(&db, &["No Such Family"]).is_none());

        let hack = face_from_db(&db, &["No Such Family", "Hack"]).expect("Hack is loaded");
        let narrow = layout_text(&hack, "iiii", 20.0, TextAlign::Left).size.x;
        let wide = layout_text(&hack, "MMMM", 20.0, TextAlign::Left).size.x;
        assert!((narrow - wide).abs() < 0.01);
    }

    #[test]
    fn test_resolution_keeps_overrides_and_skips_missing_families() {
        let db = bundled_db();
        let mut book = book();
        book.insert(FontFamily::Verdana, face_from_db(&db, &["Hack"]).expect("Hack is loaded"));
        book.resolve_installed(&db);
        assert!(book.is_resolved(FontFamily::Verdana));
        assert!(!book.is_resolved(FontFamily::Impact));

        let mut verdana = layer_with("iiii", 20.0, TextAlign::Left);
        verdana.font_family = FontFamily::Verdana;
        let mut impact = verdana.clone();
        impact.font_family = FontFamily::Impact;
        assert!((book.measure(&verdana).x - book.measure(&impact).x).abs() > 1.0);
    }

    #[test]
    fn test_installed_families_lay_out_differently() {
        let book = FontBook::with_system_fonts().expect("fonts");
        let (a, b) = (FontFamily::Arial, FontFamily::TimesNewRoman);
        if !(book.is_resolved(a) && book.is_resolved(b)) {
            return;
        }
        let mut first = layer_with("Meme Text", 40.0, TextAlign::Left);
        first.font_family = a;
        let mut second = first.clone();
        second.font_family = b;
        assert_ne!(book.layout(&first), book.layout(&second));
    }

    #[test]
    fn test_courier_falls_back_to_monospace() {
        let book = book();
        let mut a = layer_with("iiii", 20.0, TextAlign::Left);
        let mut b = layer_with("MMMM", 20.0, TextAlign::Left);
        a.font_family = FontFamily::CourierNew;
        b.font_family = FontFamily::CourierNew;
        assert!((book.measure(&a).x - book.measure(&b).x).abs() < 0.01);
    }
}
