use crate::geometry::ScreenRect;
use crate::model::{AnnotationKind, Color};
use crate::state::AnnotationSnapshot;

/// Pixels of this color are transparent on the layered window.
pub const OVERLAY_COLORKEY: Color = Color::rgba(255, 0, 255, 255);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawCommand {
    Underline {
        rect: ScreenRect,
        color: Color,
        thickness: f64,
    },
    Fill {
        rect: ScreenRect,
        color: Color,
    },
    Outline {
        rect: ScreenRect,
        color: Color,
    },
}

/// Commands in overlay-local space, painted in order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DrawList {
    pub width: u32,
    pub height: u32,
    pub commands: Vec<DrawCommand>,
}

impl DrawList {
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugOutlineKind {
    Raw,
    Validated,
    Converted,
}

impl DebugOutlineKind {
    pub fn color(self) -> Color {
        match self {
            Self::Raw => Color::rgba(255, 64, 64, 255),
            Self::Validated => Color::rgba(64, 200, 64, 255),
            Self::Converted => Color::rgba(64, 128, 255, 255),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebugOutline {
    /// Overlay-local space.
    pub rect: ScreenRect,
    pub kind: DebugOutlineKind,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderStyle {
    pub underline_thickness: f64,
    /// Strength of the hover tint, 0 (none) to 255 (solid).
    pub hover_tint: u8,
    pub locked_tint: u8,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            underline_thickness: 2.0,
            hover_tint: 48,
            locked_tint: 80,
        }
    }
}

/// Mix `color` toward white; colorkey transparency has no per-pixel alpha.
fn tint(color: Color, strength: u8) -> Color {
    let mix = |c: u8| -> u8 {
        let c = c as u32;
        let s = strength as u32;
        ((c * s + 255 * (255 - s)) / 255) as u8
    };
    Color::rgba(mix(color.r), mix(color.g), mix(color.b), 255)
}

pub fn build_draw_list(
    snapshot: &AnnotationSnapshot,
    size: (u32, u32),
    style: &RenderStyle,
    debug: &[DebugOutline],
) -> DrawList {
    let mut commands = Vec::new();

    if let Some(record) = snapshot.locked_record() {
        commands.push(DrawCommand::Fill {
            rect: record.draw_bounds,
            color: tint(record.color_category.color(), style.locked_tint),
        });
    }
    for kind in [
        AnnotationKind::Grammar,
        AnnotationKind::Style,
        AnnotationKind::Readability,
    ] {
        if let Some(record) = snapshot.hovered_record(kind) {
            commands.push(DrawCommand::Fill {
                rect: record.draw_bounds,
                color: tint(record.color_category.color(), style.hover_tint),
            });
        }
    }

    let thickness = style.underline_thickness.max(1.0);
    for (_, _, record) in snapshot.iter_all() {
        let draw = record.draw_bounds;
        commands.push(DrawCommand::Underline {
            rect: ScreenRect::new(
                draw.space,
                draw.x,
                draw.max_y() - thickness,
                draw.width,
                thickness,
            ),
            color: record.color_category.color(),
            thickness,
        });
    }

    commands.extend(debug.iter().map(|outline| DrawCommand::Outline {
        rect: outline.rect,
        color: outline.kind.color(),
    }));

    DrawList {
        width: size.0,
        height: size.1,
        commands,
    }
}

/// Rasterize into a tightly packed RGBA buffer cleared to [`OVERLAY_COLORKEY`].
pub fn render_to_rgba(list: &DrawList) -> Vec<u8> {
    let (width, height) = (list.width, list.height);
    let mut pixels = vec![0u8; (width as usize) * (height as usize) * 4];
    for px in pixels.chunks_exact_mut(4) {
        px.copy_from_slice(&OVERLAY_COLORKEY.to_rgba_array());
    }

    for command in &list.commands {
        match *command {
            DrawCommand::Underline { rect, color, .. } | DrawCommand::Fill { rect, color } => {
                fill_rect(&mut pixels, width, height, rect, color);
            }
            DrawCommand::Outline { rect, color } => {
                let top = ScreenRect::new(rect.space, rect.x, rect.y, rect.width, 1.0);
                let bottom =
                    ScreenRect::new(rect.space, rect.x, rect.max_y() - 1.0, rect.width, 1.0);
                let left = ScreenRect::new(rect.space, rect.x, rect.y, 1.0, rect.height);
                let right =
                    ScreenRect::new(rect.space, rect.max_x() - 1.0, rect.y, 1.0, rect.height);
                for edge in [top, bottom, left, right] {
                    fill_rect(&mut pixels, width, height, edge, color);
                }
            }
        }
    }
    pixels
}

pub fn convert_rgba_to_dib_bgra(rgba: &[u8], dib_bgra: &mut [u8]) {
    for (src, dst) in rgba.chunks_exact(4).zip(dib_bgra.chunks_exact_mut(4)) {
        dst[0] = src[2];
        dst[1] = src[1];
        dst[2] = src[0];
        dst[3] = src[3];
    }
}

fn fill_rect(pixels: &mut [u8], width: u32, height: u32, rect: ScreenRect, color: Color) {
    if !rect.is_finite() {
        return;
    }
    let x0 = rect.min_x().floor().clamp(0.0, width as f64) as u32;
    let x1 = rect.max_x().ceil().clamp(0.0, width as f64) as u32;
    let y0 = rect.min_y().floor().clamp(0.0, height as f64) as u32;
    let y1 = rect.max_y().ceil().clamp(0.0, height as f64) as u32;

    // Painting the key color would punch a hole in the window.
    let color = if color.r == OVERLAY_COLORKEY.r
        && color.g == OVERLAY_COLORKEY.g
        && color.b == OVERLAY_COLORKEY.b
    {
        Color::rgba(color.r, color.g, color.b.saturating_sub(1), color.a)
    } else {
        color
    };

    for y in y0..y1 {
        for x in x0..x1 {
            let idx = ((y * width + x) * 4) as usize;
            if idx + 3 >= pixels.len() {
                return;
            }
            pixels[idx..idx + 4].copy_from_slice(&color.to_rgba_array());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        build_draw_list, render_to_rgba, DebugOutline, DebugOutlineKind, DrawCommand, RenderStyle,
        OVERLAY_COLORKEY,
    };
    use crate::geometry::ScreenRect;
    use crate::model::{AnnotationRecord, AnnotationSource, ErrorRange};
    use crate::state::AnnotationSnapshot;

    fn record(x: f64) -> AnnotationRecord {
        let error = ErrorRange::new(0, 3, "Spelling");
        AnnotationRecord {
            hit_bounds: ScreenRect::local(x, 2.0, 20.0, 16.0),
            draw_bounds: ScreenRect::local(x, 2.0, 20.0, 10.0),
            color_category: error.category,
            source: AnnotationSource::Error(error),
        }
    }

    #[test]
    fn underline_sits_on_the_bottom_edge_of_the_draw_rect() {
        let snapshot = AnnotationSnapshot {
            grammar: vec![record(4.0)],
            ..AnnotationSnapshot::default()
        };
        let list = build_draw_list(&snapshot, (40, 20), &RenderStyle::default(), &[]);
        assert_eq!(list.commands.len(), 1);
        match list.commands[0] {
            DrawCommand::Underline { rect, .. } => {
                assert_eq!(rect, ScreenRect::local(4.0, 10.0, 20.0, 2.0));
            }
            other => panic!("unexpected {other:?}"),
        }

        let pixels = render_to_rgba(&list);
        let at = |x: u32, y: u32| {
            let idx = ((y * 40 + x) * 4) as usize;
            [pixels[idx], pixels[idx + 1], pixels[idx + 2]]
        };
        let key = [OVERLAY_COLORKEY.r, OVERLAY_COLORKEY.g, OVERLAY_COLORKEY.b];
        assert_eq!(at(0, 0), key);
        assert_ne!(at(10, 11), key);
        assert_eq!(at(10, 9), key);
    }

    #[test]
    fn hover_and_lock_fill_before_underlines() {
        let snapshot = AnnotationSnapshot {
            grammar: vec![record(0.0), record(30.0)],
            hovered_grammar_idx: Some(1),
            locked_highlight_idx: Some(0),
            ..AnnotationSnapshot::default()
        };
        let debug = [DebugOutline {
            rect: ScreenRect::local(0.0, 0.0, 10.0, 10.0),
            kind: DebugOutlineKind::Raw,
        }];
        let list = build_draw_list(&snapshot, (80, 20), &RenderStyle::default(), &debug);
        assert!(matches!(list.commands[0], DrawCommand::Fill { .. }));
        assert!(matches!(list.commands[1], DrawCommand::Fill { .. }));
        assert!(matches!(list.commands[2], DrawCommand::Underline { .. }));
        assert!(matches!(list.commands.last(), Some(DrawCommand::Outline { .. })));
    }

    #[test]
    fn rasterizing_clips_to_the_surface() {
        let snapshot = AnnotationSnapshot {
            grammar: vec![record(35.0)],
            ..AnnotationSnapshot::default()
        };
        let list = build_draw_list(&snapshot, (40, 20), &RenderStyle::default(), &[]);
        assert_eq!(render_to_rgba(&list).len(), 40 * 20 * 4);
    }
}
