use egui::{Color32, Pos2, Vec2};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Placeholder content for freshly created text layers
pub const DEFAULT_TEXT: &str = "Double-click to edit";

/// Vertical spacing between stacked new layers
const NEW_LAYER_STEP: f32 = 60.0;
const NEW_LAYER_TOP: f32 = 50.0;
const NEW_LAYER_HALF_WIDTH: f32 = 50.0;

/// A unique identifier for a text layer, stable for the layer's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerId(Uuid);

impl LayerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The fixed set of font choices offered by the editor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FontFamily {
    Impact,
    Arial,
    ComicSans,
    CourierNew,
    TimesNewRoman,
    Verdana,
}

impl FontFamily {
    pub const ALL: [FontFamily; 6] = [
        FontFamily::Impact,
        FontFamily::Arial,
        FontFamily::ComicSans,
        FontFamily::CourierNew,
        FontFamily::TimesNewRoman,
        FontFamily::Verdana,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            FontFamily::Impact => "Impact",
            FontFamily::Arial => "Arial",
            FontFamily::ComicSans => "Comic Sans MS",
            FontFamily::CourierNew => "Courier New",
            FontFamily::TimesNewRoman => "Times New Roman",
            FontFamily::Verdana => "Verdana",
        }
    }

    /// The generic family used when the named face is unavailable
    pub fn generic(&self) -> GenericFamily {
        match self {
            FontFamily::CourierNew => GenericFamily::Monospace,
            FontFamily::TimesNewRoman => GenericFamily::Serif,
            _ => GenericFamily::SansSerif,
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|family| family.label().eq_ignore_ascii_case(label.trim()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenericFamily {
    SansSerif,
    Serif,
    Monospace,
}

/// Bold and italic are independent flags; all four combinations are valid
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FontStyle {
    pub bold: bool,
    pub italic: bool,
}

impl FontStyle {
    pub const NORMAL: FontStyle = FontStyle { bold: false, italic: false };
    pub const BOLD: FontStyle = FontStyle { bold: true, italic: false };
    pub const ITALIC: FontStyle = FontStyle { bold: false, italic: true };
    pub const BOLD_ITALIC: FontStyle = FontStyle { bold: true, italic: true };

    /// Parses the composable token form ("normal", "bold", "italic", "bold italic")
    pub fn from_token(token: &str) -> Self {
        let mut style = Self::NORMAL;
        for part in token.split_whitespace() {
            match part.to_ascii_lowercase().as_str() {
                "bold" => style.bold = true,
                "italic" => style.italic = true,
                _ => {}
            }
        }
        style
    }

    pub fn token(&self) -> &'static str {
        match (self.bold, self.italic) {
            (false, false) => "normal",
            (true, false) => "bold",
            (false, true) => "italic",
            (true, true) => "bold italic",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

impl TextAlign {
    pub const ALL: [TextAlign; 3] = [TextAlign::Left, TextAlign::Center, TextAlign::Right];

    pub fn label(&self) -> &'static str {
        match self {
            TextAlign::Left => "Left",
            TextAlign::Center => "Center",
            TextAlign::Right => "Right",
        }
    }
}

/// One editable text overlay and its committed transform state
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayer {
    pub id: LayerId,
    pub content: String,
    /// Top-left anchor in canvas coordinates; rotation pivots here
    pub position: Pos2,
    pub font_size: f32,
    pub font_family: FontFamily,
    pub font_style: FontStyle,
    pub fill: Color32,
    pub stroke: Color32,
    pub stroke_width: f32,
    /// Degrees in [0, 360)
    pub rotation: f32,
    pub align: TextAlign,
}

/// Style applied to every new layer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerDefaults {
    pub content: String,
    pub font_size: f32,
    pub font_family: FontFamily,
    pub font_style: FontStyle,
    pub fill: String,
    pub stroke: String,
    pub stroke_width: f32,
    pub align: TextAlign,
}

impl Default for LayerDefaults {
    fn default() -> Self {
        Self {
            content: DEFAULT_TEXT.to_owned(),
            font_size: 32.0,
            font_family: FontFamily::Impact,
            font_style: FontStyle::NORMAL,
            fill: "#FFFFFF".to_owned(),
            stroke: "#000000".to_owned(),
            stroke_width: 2.0,
            align: TextAlign::Center,
        }
    }
}

/// Build a new layer with a fresh id. `existing` is the current layer count,
/// used to stack new layers vertically so they never land exactly on top of
/// each other.
pub fn create_layer(defaults: &LayerDefaults, existing: usize, canvas_size: Vec2) -> TextLayer {
    let position = Pos2::new(
        canvas_size.x / 2.0 - NEW_LAYER_HALF_WIDTH,
        existing as f32 * NEW_LAYER_STEP + NEW_LAYER_TOP,
    );

    TextLayer {
        id: LayerId::new(),
        content: defaults.content.clone(),
        position,
        font_size: defaults.font_size,
        font_family: defaults.font_family,
        font_style: defaults.font_style,
        fill: parse_hex_color(&defaults.fill).unwrap_or(Color32::WHITE),
        stroke: parse_hex_color(&defaults.stroke).unwrap_or(Color32::BLACK),
        stroke_width: defaults.stroke_width,
        rotation: 0.0,
        align: defaults.align,
    }
}

/// Partial update merged into a layer by [`crate::scene::Scene::update_layer`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerPatch {
    pub content: Option<String>,
    pub position: Option<Pos2>,
    pub font_size: Option<f32>,
    pub font_family: Option<FontFamily>,
    pub font_style: Option<FontStyle>,
    pub fill: Option<Color32>,
    pub stroke: Option<Color32>,
    pub stroke_width: Option<f32>,
    pub rotation: Option<f32>,
    pub align: Option<TextAlign>,
}

impl LayerPatch {
    pub fn content(text: impl Into<String>) -> Self {
        Self { content: Some(text.into()), ..Default::default() }
    }

    pub fn position(position: Pos2) -> Self {
        Self { position: Some(position), ..Default::default() }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl TextLayer {
    /// Merge `patch` into this layer. Font size is clamped to `font_range`
    /// and rotation wrapped into [0, 360).
    pub fn apply(&mut self, patch: &LayerPatch, font_range: (f32, f32)) {
        if let Some(content) = &patch.content {
            self.content.clone_from(content);
        }
        if let Some(position) = patch.position {
            self.position = position;
        }
        if let Some(size) = patch.font_size {
            self.font_size = clamp_font_size(size, font_range);
        }
        if let Some(family) = patch.font_family {
            self.font_family = family;
        }
        if let Some(style) = patch.font_style {
            self.font_style = style;
        }
        if let Some(fill) = patch.fill {
            self.fill = fill;
        }
        if let Some(stroke) = patch.stroke {
            self.stroke = stroke;
        }
        if let Some(width) = patch.stroke_width {
            self.stroke_width = width.max(0.0);
        }
        if let Some(rotation) = patch.rotation {
            self.rotation = normalize_degrees(rotation);
        }
        if let Some(align) = patch.align {
            self.align = align;
        }
    }
}

pub fn clamp_font_size(size: f32, (min, max): (f32, f32)) -> f32 {
    if size.is_finite() { size.clamp(min, max) } else { min }
}

/// Wrap an angle in degrees into [0, 360)
pub fn normalize_degrees(degrees: f32) -> f32 {
    if !degrees.is_finite() {
        return 0.0;
    }
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Parse `#RGB`, `#RRGGBB` or `#RRGGBBAA`
pub fn parse_hex_color(hex: &str) -> Option<Color32> {
    let digits = hex.trim().strip_prefix('#')?;
    let nibble = |i: usize| u8::from_str_radix(&digits[i..=i], 16).ok();
    let byte = |i: usize| u8::from_str_radix(digits.get(i..i + 2)?, 16).ok();

    if !digits.is_ascii() {
        return None;
    }

    match digits.len() {
        3 => {
            let (r, g, b) = (nibble(0)?, nibble(1)?, nibble(2)?);
            Some(Color32::from_rgb(r * 17, g * 17, b * 17))
        }
        6 => Some(Color32::from_rgb(byte(0)?, byte(2)?, byte(4)?)),
        8 => Some(Color32::from_rgba_unmultiplied(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
        _ => None,
    }
}

pub fn to_hex_color(color: Color32) -> String {
    let [r, g, b, a] = color.to_srgba_unmultiplied();
    if a == u8::MAX {
        format!("#{r:02X}{g:02X}{b:02X}")
    } else {
        format!("#{r:02X}{g:02X}{b:02X}{a:02X}")
    }
}
