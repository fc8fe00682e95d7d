use iced_layershell::reexport::{Anchor, KeyboardInteractivity, Layer, NewLayerShellSettings};

use crate::geometry::{WindowGeometry, WorkArea};
use crate::util;

fn make_output_option(output: Option<&str>) -> iced_layershell::reexport::OutputOption {
    match output {
        Some(name) => iced_layershell::reexport::OutputOption::OutputName(name.to_string()),
        None => iced_layershell::reexport::OutputOption::None,
    }
}

/// The companion surface: overlay layer (above normal windows), no
/// decorations, anchored bottom + left so a size change keeps both the
/// bottom edge and `x` where they are.
///
/// Exclusive zone 0: the compositor measures margins from the area left over
/// by panels, so the bottom margin sits above a taskbar instead of under it.
pub(crate) fn companion_settings(
    geometry: WindowGeometry,
    area: WorkArea,
    output: Option<&str>,
) -> NewLayerShellSettings {
    NewLayerShellSettings {
        layer: Layer::Overlay,
        anchor: Anchor::Bottom | Anchor::Left,
        keyboard_interactivity: KeyboardInteractivity::OnDemand,
        exclusive_zone: Some(0),
        size: Some((geometry.width, geometry.height)),
        margin: Some(geometry.margins(area)),
        events_transparent: false,
        output_option: make_output_option(output),
        ..Default::default()
    }
}

/// An output as reported by `cosmic-randr list` / `wlr-randr`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct OutputInfo {
    pub(crate) name: String,
    pub(crate) mode: Option<(u32, u32)>,
    pub(crate) position: (i32, i32),
    pub(crate) scale: f64,
}

impl OutputInfo {
    /// Logical rectangle of this output, if it has an active mode.
    pub(crate) fn work_area(&self) -> Option<WorkArea> {
        let (w, h) = self.mode?;
        let scale = if self.scale > 0.0 { self.scale } else { 1.0 };
        Some(WorkArea {
            x: self.position.0,
            y: self.position.1,
            width: (w as f64 / scale).round() as u32,
            height: (h as f64 / scale).round() as u32,
        })
    }
}

/// Parse randr-style listings. Output headers are unindented; their
/// properties follow on indented lines.
pub(crate) fn parse_outputs(listing: &str) -> Vec<OutputInfo> {
    let mut outputs: Vec<OutputInfo> = Vec::new();
    for raw in listing.lines() {
        let line = util::strip_ansi(raw);
        if line.trim().is_empty() {
            continue;
        }
        if !line.starts_with(' ') && !line.starts_with('\t') {
            if let Some(name) = line.split_whitespace().next() {
                outputs.push(OutputInfo {
                    name: name.to_string(),
                    mode: None,
                    position: (0, 0),
                    scale: 1.0,
                });
            }
            continue;
        }
        let Some(current) = outputs.last_mut() else {
            continue;
        };
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix("Position:") {
            let mut parts = rest.trim().split(',');
            if let (Some(x), Some(y)) = (parts.next(), parts.next()) {
                if let (Ok(x), Ok(y)) = (x.trim().parse(), y.trim().parse()) {
                    current.position = (x, y);
                }
            }
        } else if let Some(rest) = trimmed.strip_prefix("Scale:") {
            let value = rest.trim();
            current.scale = match value.strip_suffix('%') {
                Some(pct) => pct.trim().parse::<f64>().map(|p| p / 100.0).unwrap_or(1.0),
                None => value.parse().unwrap_or(1.0),
            };
        } else if trimmed.contains("current") && current.mode.is_none() {
            current.mode = parse_mode(trimmed);
        }
    }
    outputs
}

fn parse_mode(line: &str) -> Option<(u32, u32)> {
    let token = line.split_whitespace().next()?;
    let (w, h) = token.split_once('x')?;
    Some((w.parse().ok()?, h.parse().ok()?))
}

/// Pick the work area for `screen` (or the first active output).
pub(crate) fn select_work_area(outputs: &[OutputInfo], screen: Option<&str>) -> Option<WorkArea> {
    match screen {
        Some(name) => outputs
            .iter()
            .find(|o| o.name == name)
            .and_then(OutputInfo::work_area),
        None => outputs.iter().find_map(OutputInfo::work_area),
    }
}

/// Query the compositor for the primary output geometry. Tries cosmic-randr
/// first, then wlr-randr.
pub(crate) fn query_work_area(screen: Option<&str>) -> Option<WorkArea> {
    let result = std::process::Command::new("cosmic-randr")
        .arg("list")
        .output()
        .ok()
        .filter(|o| o.status.success())
        .or_else(|| {
            std::process::Command::new("wlr-randr")
                .output()
                .ok()
                .filter(|o| o.status.success())
        })?;
    let stdout = String::from_utf8_lossy(&result.stdout);
    select_work_area(&parse_outputs(&stdout), screen)
}
