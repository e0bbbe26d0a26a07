use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Mix, Srgb};

/// Header and time-series colour (#004080).
pub const BRAND_BLUE: Color32 = Color32::from_rgb(0x00, 0x40, 0x80);

/// Histogram colour.
pub const TEAL: Color32 = Color32::from_rgb(0x00, 0x80, 0x80);

fn to_color32(rgb: Srgb) -> Color32 {
    Color32::from_rgb(
        (rgb.red.clamp(0.0, 1.0) * 255.0).round() as u8,
        (rgb.green.clamp(0.0, 1.0) * 255.0).round() as u8,
        (rgb.blue.clamp(0.0, 1.0) * 255.0).round() as u8,
    )
}

// ---------------------------------------------------------------------------
// Ranking palette
// ---------------------------------------------------------------------------

/// `n` shades of blue, darkest first, so the top of a ranking stands out.
pub fn blues_gradient(n: usize) -> Vec<Color32> {
    let dark: Hsl = Hsl::new(212.0, 0.85, 0.25);
    let light: Hsl = Hsl::new(205.0, 0.70, 0.80);
    match n {
        0 => Vec::new(),
        1 => vec![to_color32(dark.into_color())],
        _ => (0..n)
            .map(|i| {
                let t = i as f32 / (n - 1) as f32;
                to_color32(dark.mix(light, t).into_color())
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lightness(c: Color32) -> u32 {
        c.r() as u32 + c.g() as u32 + c.b() as u32
    }

    #[test]
    fn gradient_gets_lighter() {
        let colors = blues_gradient(10);
        assert_eq!(colors.len(), 10);
        assert!(colors.windows(2).all(|w| lightness(w[0]) <= lightness(w[1])));
        assert!(colors.iter().all(|c| c.b() >= c.r()));
    }

    #[test]
    fn degenerate_sizes() {
        assert!(blues_gradient(0).is_empty());
        assert_eq!(blues_gradient(1).len(), 1);
    }
}
