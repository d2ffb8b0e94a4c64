//! Human-readable rendering of channel values and change reports
//!
//! Fingerprints are useless to a reviewer, so before/after values in a
//! [`PropertyChange`](crate::types::PropertyChange) are rendered from the raw
//! channel payloads in [`ChannelValues`](crate::channel::ChannelValues)
//! through a fixed formatting table:
//!
//! | Channel | Payload | Rendered |
//! |---|---|---|
//! | fills, strokes | `[{type, color{r,g,b}, opacity}]` | `#1A73E8, Linear gradient` |
//! | effects | `[{type, radius}]` | `Drop shadow (blur 4)` |
//! | layout | `{layoutMode, itemSpacing, padding*}` | `Horizontal, gap 8, padding 12/16/12/16` |
//! | geometry | `{width, height, cornerRadius}` | `120x40, radius 8` |
//! | appearance | `{opacity, blendMode, visible}` | `50% opacity, MULTIPLY, hidden` |
//! | border | `{strokeWeight, strokeAlign}` | `1px INSIDE` |
//! | typography | `{fontFamily, fontStyle, fontSize, lineHeight}` | `Inter Bold 16px / 24px` |
//! | variable definition | `{valuesByMode}` | `Light: #FFFFFF, Dark: #000000` |
//! | everything else | any | compact JSON, or `N items` for long arrays |
//!
//! When an element carries no payload for a channel the fingerprint is shown
//! instead, prefixed with `#` so it cannot be mistaken for a value.

use crate::channel::Channel;
use crate::types::ChangeReport;
use serde_json::{Map, Value};
use std::fmt::Write;

const MAX_RAW_LEN: usize = 60;

/// Render one side of a channel change
///
/// Returns `None` when the channel is absent on that side.
pub fn format_channel(channel: Channel, value: Option<&Value>, hash: Option<&str>) -> Option<String> {
    match (value, hash) {
        (Some(value), _) => Some(render(channel, value)),
        (None, Some(hash)) => Some(format!("#{}", hash)),
        (None, None) => None,
    }
}

fn render(channel: Channel, value: &Value) -> String {
    let rendered = match channel {
        Channel::Fills | Channel::Strokes => format_paints(value),
        Channel::Effects => format_effects(value),
        Channel::Layout => value.as_object().map(format_layout),
        Channel::Geometry => value.as_object().and_then(format_geometry),
        Channel::Appearance => value.as_object().map(format_appearance),
        Channel::Border => value.as_object().and_then(format_border),
        Channel::Typography => value.as_object().and_then(format_typography),
        Channel::VariableDefinition => value.as_object().and_then(format_variable_values),
        Channel::Structure
        | Channel::ComponentProperties
        | Channel::Overrides
        | Channel::ExposedProperties
        | Channel::VariableUsage
        | Channel::Interactions => None,
    };
    rendered.unwrap_or_else(|| format_raw(value))
}

/// Render an RGB(A) color object with channels in `0.0..=1.0` as hex
pub fn color_hex(color: &Map<String, Value>) -> Option<String> {
    let channel = |key: &str| -> Option<u8> {
        let v = color.get(key)?.as_f64()?;
        Some((v.clamp(0.0, 1.0) * 255.0).round() as u8)
    };
    let (r, g, b) = (channel("r")?, channel("g")?, channel("b")?);
    let mut hex = format!("#{:02X}{:02X}{:02X}", r, g, b);
    if let Some(a) = channel("a").filter(|&a| a != 255) {
        let _ = write!(hex, "{:02X}", a);
    }
    Some(hex)
}

fn format_paints(value: &Value) -> Option<String> {
    let paints = value.as_array()?;
    if paints.is_empty() {
        return Some("None".to_string());
    }
    let rendered = paints
        .iter()
        .map(|paint| {
            let paint = paint.as_object()?;
            let kind = paint.get("type").and_then(Value::as_str).unwrap_or("SOLID");
            let base = match kind {
                "SOLID" => color_hex(paint.get("color")?.as_object()?)?,
                "IMAGE" => "Image".to_string(),
                "VIDEO" => "Video".to_string(),
                other => title_case(other),
            };
            let opacity = paint.get("opacity").and_then(Value::as_f64).filter(|&o| o < 1.0);
            Some(match opacity {
                Some(o) => format!("{} {}%", base, percent(o)),
                None => base,
            })
        })
        .collect::<Option<Vec<_>>>()?;
    Some(rendered.join(", "))
}

fn format_effects(value: &Value) -> Option<String> {
    let effects = value.as_array()?;
    if effects.is_empty() {
        return Some("None".to_string());
    }
    let rendered = effects
        .iter()
        .map(|effect| {
            let effect = effect.as_object()?;
            let kind = title_case(effect.get("type")?.as_str()?);
            Some(match effect.get("radius").and_then(Value::as_f64) {
                Some(radius) => format!("{} (blur {})", kind, number(radius)),
                None => kind,
            })
        })
        .collect::<Option<Vec<_>>>()?;
    Some(rendered.join(", "))
}

fn format_layout(layout: &Map<String, Value>) -> String {
    let mode = layout
        .get("layoutMode")
        .and_then(Value::as_str)
        .unwrap_or("NONE");
    if mode == "NONE" {
        return "No auto layout".to_string();
    }
    let mut parts = vec![title_case(mode)];
    if let Some(gap) = layout.get("itemSpacing").and_then(Value::as_f64) {
        parts.push(format!("gap {}", number(gap)));
    }
    let padding = ["paddingTop", "paddingRight", "paddingBottom", "paddingLeft"]
        .iter()
        .map(|k| layout.get(*k).and_then(Value::as_f64))
        .collect::<Option<Vec<_>>>();
    if let Some(padding) = padding {
        let rendered = padding.into_iter().map(number).collect::<Vec<_>>();
        parts.push(format!("padding {}", rendered.join("/")));
    }
    parts.join(", ")
}

fn format_geometry(geometry: &Map<String, Value>) -> Option<String> {
    let width = geometry.get("width")?.as_f64()?;
    let height = geometry.get("height")?.as_f64()?;
    let mut out = format!("{}x{}", number(width), number(height));
    if let Some(radius) = geometry.get("cornerRadius").and_then(Value::as_f64) {
        if radius > 0.0 {
            let _ = write!(out, ", radius {}", number(radius));
        }
    }
    Some(out)
}

fn format_appearance(appearance: &Map<String, Value>) -> String {
    let mut parts = Vec::new();
    if let Some(opacity) = appearance.get("opacity").and_then(Value::as_f64) {
        parts.push(format!("{}% opacity", percent(opacity)));
    }
    if let Some(mode) = appearance.get("blendMode").and_then(Value::as_str) {
        if mode != "NORMAL" && mode != "PASS_THROUGH" {
            parts.push(mode.to_string());
        }
    }
    if appearance.get("visible").and_then(Value::as_bool) == Some(false) {
        parts.push("hidden".to_string());
    }
    if parts.is_empty() {
        "Default".to_string()
    } else {
        parts.join(", ")
    }
}

fn format_border(border: &Map<String, Value>) -> Option<String> {
    let weight = border.get("strokeWeight")?.as_f64()?;
    let mut out = format!("{}px", number(weight));
    if let Some(align) = border.get("strokeAlign").and_then(Value::as_str) {
        let _ = write!(out, " {}", align);
    }
    Some(out)
}

fn format_typography(text: &Map<String, Value>) -> Option<String> {
    let family = text.get("fontFamily")?.as_str()?;
    let size = text.get("fontSize")?.as_f64()?;
    let mut out = family.to_string();
    if let Some(style) = text.get("fontStyle").and_then(Value::as_str) {
        let _ = write!(out, " {}", style);
    }
    let _ = write!(out, " {}px", number(size));
    if let Some(line_height) = text.get("lineHeight").and_then(Value::as_f64) {
        let _ = write!(out, " / {}px", number(line_height));
    }
    Some(out)
}

fn format_variable_values(definition: &Map<String, Value>) -> Option<String> {
    let modes = definition.get("valuesByMode")?.as_object()?;
    let rendered = modes
        .iter()
        .map(|(mode, value)| {
            let shown = match value {
                Value::Object(obj) => color_hex(obj).unwrap_or_else(|| format_raw(value)),
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            format!("{}: {}", mode, shown)
        })
        .collect::<Vec<_>>();
    Some(rendered.join(", "))
}

fn format_raw(value: &Value) -> String {
    if let Some(items) = value.as_array() {
        if items.len() > 3 {
            return format!("{} items", items.len());
        }
    }
    let raw = value.to_string();
    if raw.chars().count() > MAX_RAW_LEN {
        let truncated: String = raw.chars().take(MAX_RAW_LEN).collect();
        format!("{}…", truncated)
    } else {
        raw
    }
}

fn number(n: f64) -> String {
    let rounded = format!("{:.2}", n);
    match rounded.trim_end_matches('0').trim_end_matches('.') {
        "-0" => "0".to_string(),
        trimmed => trimmed.to_string(),
    }
}

fn percent(fraction: f64) -> String {
    number((fraction * 100.0).round())
}

fn title_case(tag: &str) -> String {
    let words = tag.to_lowercase().replace('_', " ");
    let mut chars = words.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Render a change report as changelog text, one element per line
///
/// ```rust
/// use stylesnap::display::render_changelog;
/// use stylesnap::types::{ChangeReport, ElementKind, ElementRecord};
///
/// let report = ChangeReport {
///     added: vec![ElementRecord::new("2", "Input", ElementKind::Component)],
///     ..Default::default()
/// };
/// assert_eq!(render_changelog(&report), "Added\n  + Input (Component)\n");
/// ```
pub fn render_changelog(report: &ChangeReport) -> String {
    let mut out = String::new();
    if !report.has_changes() {
        out.push_str("No changes\n");
        return out;
    }
    if !report.added.is_empty() {
        out.push_str("Added\n");
        for element in &report.added {
            let _ = writeln!(out, "  + {} ({})", element.name, element.kind);
        }
    }
    if !report.modified.is_empty() {
        out.push_str("Modified\n");
        for modified in &report.modified {
            let element = &modified.element;
            let _ = writeln!(out, "  ~ {} ({}): {}", element.name, element.kind, modified.summary);
            for change in &modified.changes {
                let _ = writeln!(
                    out,
                    "      {}: {} -> {}",
                    change.label,
                    change.old_value.as_deref().unwrap_or("none"),
                    change.new_value.as_deref().unwrap_or("none"),
                );
            }
        }
    }
    if !report.removed.is_empty() {
        out.push_str("Removed\n");
        for element in &report.removed {
            let _ = writeln!(out, "  - {} ({})", element.name, element.kind);
        }
    }
    out
}
