//! Visual style vocabulary shared by the resolver, the store and the hosts.

use std::collections::BTreeMap;
use std::fmt;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Opaque sRGB colour, serialized as `#RRGGBB`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#RRGGBB` or the short `#RGB` form (case-insensitive).
    pub fn parse_hex(s: &str) -> Result<Self> {
        let hex = s.trim().strip_prefix('#').ok_or_else(|| anyhow!("colour must start with '#': {}", s))?;
        let channel = |h: &str| u8::from_str_radix(h, 16).map_err(|_| anyhow!("invalid colour: {}", s));
        match hex.len() {
            6 => Ok(Self::rgb(channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?)),
            3 => {
                let r = channel(&hex[0..1])?;
                let g = channel(&hex[1..2])?;
                let b = channel(&hex[2..3])?;
                Ok(Self::rgb(r * 17, g * 17, b * 17))
            }
            _ => Err(anyhow!("invalid colour: {}", s)),
        }
    }

    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl TryFrom<String> for Color {
    type Error = anyhow::Error;
    fn try_from(s: String) -> Result<Self> { Color::parse_hex(&s) }
}

impl From<Color> for String {
    fn from(c: Color) -> Self { c.to_hex() }
}

/// Automatic label colours, handed out in first-seen order and wrapped.
pub const PALETTE: [Color; 12] = [
    Color::rgb(0x60, 0x4A, 0x0E),
    Color::rgb(0xC9, 0x90, 0xC0),
    Color::rgb(0xF7, 0x97, 0x67),
    Color::rgb(0x57, 0xC7, 0xE3),
    Color::rgb(0xF1, 0x66, 0x67),
    Color::rgb(0xD9, 0xC8, 0xAE),
    Color::rgb(0x8D, 0xCC, 0x93),
    Color::rgb(0xEC, 0xB5, 0xC9),
    Color::rgb(0x4C, 0x8E, 0xDA),
    Color::rgb(0xFF, 0xC4, 0x54),
    Color::rgb(0xDA, 0x71, 0x94),
    Color::rgb(0x56, 0x94, 0x80),
];

pub fn palette_color(index: usize) -> Color {
    PALETTE[index % PALETTE.len()]
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ShapeKind {
    Circle,
    Dot,
    Square,
    Diamond,
    Triangle,
    TriangleDown,
    Star,
    Hexagon,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 8] = [
        ShapeKind::Circle,
        ShapeKind::Dot,
        ShapeKind::Square,
        ShapeKind::Diamond,
        ShapeKind::Triangle,
        ShapeKind::TriangleDown,
        ShapeKind::Star,
        ShapeKind::Hexagon,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ShapeKind::Circle => "circle",
            ShapeKind::Dot => "dot",
            ShapeKind::Square => "square",
            ShapeKind::Diamond => "diamond",
            ShapeKind::Triangle => "triangle",
            ShapeKind::TriangleDown => "triangleDown",
            ShapeKind::Star => "star",
            ShapeKind::Hexagon => "hexagon",
        }
    }
}

pub const ID_CAPTION: &str = "#id";

/// Where a node caption comes from: the entity id or one of its properties.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LabelSource {
    Id,
    Property(String),
}

impl From<String> for LabelSource {
    fn from(s: String) -> Self {
        if s == ID_CAPTION { LabelSource::Id } else { LabelSource::Property(s) }
    }
}

impl From<LabelSource> for String {
    fn from(src: LabelSource) -> Self {
        match src {
            LabelSource::Id => ID_CAPTION.to_string(),
            LabelSource::Property(key) => key,
        }
    }
}

impl fmt::Display for LabelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelSource::Id => f.write_str(ID_CAPTION),
            LabelSource::Property(key) => f.write_str(key),
        }
    }
}

/// Partial style. Unset fields fall back to computed or host defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<ShapeKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,
    #[serde(default, rename = "label", alias = "labelSource", skip_serializing_if = "Option::is_none")]
    pub label_source: Option<LabelSource>,
}

impl StyleSet {
    pub fn with_color(color: Color) -> Self {
        Self { color: Some(color), ..Self::default() }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Field-wise merge where `self` wins over `base`.
    pub fn merged_over(&self, base: &StyleSet) -> StyleSet {
        StyleSet {
            color: self.color.or(base.color),
            shape: self.shape.or(base.shape),
            size: self.size.or(base.size),
            font_size: self.font_size.or(base.font_size),
            label_source: self.label_source.clone().or_else(|| base.label_source.clone()),
        }
    }

    /// Copy of `self` with one field replaced.
    pub fn applied(&self, edit: &StyleEdit) -> StyleSet {
        let mut out = self.clone();
        match edit {
            StyleEdit::Color(c) => out.color = Some(*c),
            StyleEdit::Shape(s) => out.shape = Some(*s),
            StyleEdit::Size(v) => out.size = Some(*v),
            StyleEdit::FontSize(v) => out.font_size = Some(*v),
            StyleEdit::Label(src) => out.label_source = Some(src.clone()),
        }
        out
    }
}

/// A single user edit of one style field for one label.
#[derive(Clone, Debug, PartialEq)]
pub enum StyleEdit {
    Color(Color),
    Shape(ShapeKind),
    Size(f32),
    FontSize(f32),
    Label(LabelSource),
}

/// Per primary-label style overrides. The only persisted entity.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelStyleOverrides(BTreeMap<String, StyleSet>);

impl LabelStyleOverrides {
    pub fn new() -> Self { Self::default() }

    pub fn get(&self, label: &str) -> Option<&StyleSet> { self.0.get(label) }
    pub fn contains(&self, label: &str) -> bool { self.0.contains_key(label) }
    pub fn insert(&mut self, label: impl Into<String>, style: StyleSet) { self.0.insert(label.into(), style); }
    pub fn remove(&mut self, label: &str) -> Option<StyleSet> { self.0.remove(label) }
    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StyleSet)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Drop every label for which `keep` is false; returns the dropped labels.
    pub fn prune(&mut self, keep: impl Fn(&str) -> bool) -> Vec<String> {
        let stale: Vec<String> = self.0.keys().filter(|l| !keep(l)).cloned().collect();
        for label in &stale {
            self.0.remove(label);
        }
        stale
    }
}
