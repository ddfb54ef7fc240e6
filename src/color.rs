use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};
use rfm_dashboard::Label;

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Color mapping: label → Color32
// ---------------------------------------------------------------------------

/// Maps every segment or cluster label to a distinct colour.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<Label, Color32>,
    default_color: Color32,
}

impl ColorMap {
    /// Build a colour map for the labels in display order.
    pub fn new(labels: &[Label]) -> Self {
        let palette = generate_palette(labels.len());
        let mapping = labels.iter().cloned().zip(palette).collect();

        ColorMap {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    /// Look up the colour for a given label.
    pub fn color_for(&self, label: &Label) -> Color32 {
        self.mapping
            .get(label)
            .copied()
            .unwrap_or(self.default_color)
    }
}
