//! SVG markup for generated overlays.
//!
//! Rounded-corner masks, border strokes and text watermarks are described as
//! small SVG documents sized to the current image, then rasterized by the
//! backend (see [`ImageBackend::rasterize_svg`](super::ImageBackend::rasterize_svg)).
//! Building markup is pure string work and is tested here; rasterization is not.

use super::params::Color;

const SVG_NS: &str = "http://www.w3.org/2000/svg";

/// Escape the five XML-reserved characters.
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Opaque rounded rectangle covering the whole canvas; used with `dest-in`.
pub fn rounded_mask(width: u32, height: u32, radius: u32) -> String {
    format!(
        r#"<svg width="{width}" height="{height}" xmlns="{SVG_NS}"><rect x="0" y="0" width="{width}" height="{height}" rx="{radius}" ry="{radius}" fill="white"/></svg>"#
    )
}

/// Stroked rounded rectangle inset by half the stroke, so the stroke is
/// centered on the image edge and fully visible.
pub fn border_stroke(
    width: u32,
    height: u32,
    radius: u32,
    stroke_width: u32,
    color: Color,
) -> String {
    let inset = stroke_width as f64 / 2.0;
    let inner_w = width.saturating_sub(stroke_width);
    let inner_h = height.saturating_sub(stroke_width);
    format!(
        r#"<svg width="{width}" height="{height}" xmlns="{SVG_NS}"><rect x="{inset}" y="{inset}" width="{inner_w}" height="{inner_h}" rx="{radius}" ry="{radius}" fill="none" stroke="{stroke}" stroke-opacity="{opacity}" stroke-width="{stroke_width}"/></svg>"#,
        stroke = color.to_hex(),
        opacity = color.opacity(),
    )
}

/// Centered bold text, rotated -30° about the canvas center. The color's own
/// alpha is multiplied into `opacity`.
pub fn text_watermark(
    width: u32,
    height: u32,
    text: &str,
    font_size: u32,
    color: Color,
    opacity: f32,
) -> String {
    let cx = width as f64 / 2.0;
    let cy = height as f64 / 2.0;
    format!(
        r#"<svg width="{width}" height="{height}" xmlns="{SVG_NS}"><text x="50%" y="50%" text-anchor="middle" dominant-baseline="middle" font-family="Arial, sans-serif" font-size="{font_size}px" font-weight="bold" fill="{fill}" fill-opacity="{opacity}" transform="rotate(-30 {cx} {cy})">{text}</text></svg>"#,
        fill = color.to_hex(),
        opacity = opacity * color.opacity(),
        text = escape_xml(text),
    )
}
