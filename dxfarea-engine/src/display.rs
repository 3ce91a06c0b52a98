//! 绘制列表：把会话的当前状态转换为屏幕坐标下的绘制指令。
//!
//! `build` 是对会话的纯读取，可以在任意状态变化后重复调用。

use dxfarea_core::document::{Document, Entity, Insert, Text};
use dxfarea_core::geometry::Point2;
use dxfarea_core::style;
use glam::{DAffine2, DVec2};
use serde::Serialize;

use crate::selection::{Handle, ScreenRect};
use crate::session::{InteractionMode, Session};
use crate::viewport::CanvasSize;

pub const BACKGROUND_COLOR: &str = "#ffffff";
pub const GRID_COLOR: &str = "#f0f0f0";
pub const AXIS_COLOR: &str = "#ddd";
pub const GRID_SPACING: f64 = 50.0;
/// 单个方向上最多绘制的网格线数量。
pub const MAX_GRID_LINES: usize = 2048;
/// 实体的基础线宽（像素），再按线宽组码缩放。
pub const ENTITY_BASE_WIDTH: f64 = 2.0;
pub const MIN_FONT_SIZE: f64 = 8.0;
pub const AREA_STROKE_COLOR: &str = "#3b82f6";
pub const AREA_FILL_COLOR: &str = "rgba(59, 130, 246, 0.1)";
pub const HANDLE_STROKE_COLOR: &str = "#ffffff";
pub const HANDLE_SIZE: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Stroke {
    pub color: &'static str,
    pub width: f64,
}

impl Stroke {
    pub const fn new(color: &'static str, width: f64) -> Self {
        Self { color, width }
    }
}

/// 屏幕坐标下的绘制指令。文本的 `rotation` 为画布旋转角（弧度，顺时针为正）。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DrawCommand {
    Clear {
        width: f64,
        height: f64,
        fill: &'static str,
    },
    Line {
        from: Point2,
        to: Point2,
        stroke: Stroke,
    },
    Polyline {
        points: Vec<Point2>,
        stroke: Stroke,
    },
    Circle {
        center: Point2,
        radius: f64,
        stroke: Stroke,
    },
    Text {
        position: Point2,
        content: String,
        font_size: f64,
        rotation: f64,
        color: &'static str,
    },
    Rect {
        min: Point2,
        max: Point2,
        fill: Option<&'static str>,
        stroke: Option<Stroke>,
        dashed: bool,
    },
}

/// 生成当前会话的完整绘制列表：背景与网格、实体（块参照就地展开）、选区覆盖层。
pub fn build(session: &Session) -> Vec<DrawCommand> {
    let canvas = session.canvas();
    let mut commands = Vec::new();
    if !canvas.is_valid() {
        return commands;
    }

    push_background(&mut commands, canvas);

    if let Some(document) = session.document() {
        let world = Placement::new(session.viewport().to_affine(canvas), 0.0);
        push_document(&mut commands, document, &world);
    }

    if session.mode() == InteractionMode::Select {
        push_areas(&mut commands, session);
    }

    commands
}

fn push_background(commands: &mut Vec<DrawCommand>, canvas: CanvasSize) {
    commands.push(DrawCommand::Clear {
        width: canvas.width,
        height: canvas.height,
        fill: BACKGROUND_COLOR,
    });

    let grid = Stroke::new(GRID_COLOR, 1.0);
    if let Some(count) = grid_line_count(canvas.width) {
        for index in 0..count {
            let x = index as f64 * GRID_SPACING;
            commands.push(DrawCommand::Line {
                from: Point2::new(x, 0.0),
                to: Point2::new(x, canvas.height),
                stroke: grid,
            });
        }
    }
    if let Some(count) = grid_line_count(canvas.height) {
        for index in 0..count {
            let y = index as f64 * GRID_SPACING;
            commands.push(DrawCommand::Line {
                from: Point2::new(0.0, y),
                to: Point2::new(canvas.width, y),
                stroke: grid,
            });
        }
    }

    let axis = Stroke::new(AXIS_COLOR, 1.0);
    let center = canvas.center();
    commands.push(DrawCommand::Line {
        from: Point2::new(center.x(), 0.0),
        to: Point2::new(center.x(), canvas.height),
        stroke: axis,
    });
    commands.push(DrawCommand::Line {
        from: Point2::new(0.0, center.y()),
        to: Point2::new(canvas.width, center.y()),
        stroke: axis,
    });
}

/// 一个方向上的网格线数量，超过 [`MAX_GRID_LINES`] 时不画该方向的网格。
fn grid_line_count(extent: f64) -> Option<usize> {
    let count = (extent / GRID_SPACING).ceil();
    (count <= MAX_GRID_LINES as f64).then_some(count as usize)
}

/// 从实体局部坐标到屏幕坐标的放置方式。
#[derive(Debug, Clone, Copy)]
struct Placement {
    affine: DAffine2,
    /// 长度（半径、字高）的缩放倍数。非等比缩放时取几何平均。
    length_scale: f64,
    /// 叠加在文本上的逆时针旋转角（度）。
    rotation: f64,
}

impl Placement {
    fn new(affine: DAffine2, rotation: f64) -> Self {
        Self {
            affine,
            length_scale: affine.matrix2.determinant().abs().sqrt(),
            rotation,
        }
    }

    /// 块参照的放置：在世界坐标中依次平移、旋转、缩放。
    fn for_insert(&self, insert: &Insert) -> Option<Self> {
        if !insert.insertion_point.is_finite() {
            return None;
        }
        let angle = finite_or(insert.rotation_angle, 0.0);
        let scale = DVec2::new(non_zero_or_one(insert.scale_x), non_zero_or_one(insert.scale_y));
        let affine = self.affine
            * DAffine2::from_translation(insert.insertion_point.as_vec2())
            * DAffine2::from_angle(angle.to_radians())
            * DAffine2::from_scale(scale);
        Some(Self::new(affine, self.rotation + angle))
    }

    #[inline]
    fn project(&self, point: Point2) -> Point2 {
        Point2::from_vec(self.affine.transform_point2(point.as_vec2()))
    }
}

fn push_document(commands: &mut Vec<DrawCommand>, document: &Document, world: &Placement) {
    for entity in document.entities() {
        if let Entity::Insert(insert) = entity {
            let Some(block) = document.block(&insert.block_name) else {
                continue;
            };
            let Some(placement) = world.for_insert(insert) else {
                continue;
            };
            for child in &block.entities {
                push_entity(commands, child, &placement);
            }
        } else {
            push_entity(commands, entity, world);
        }
    }
}

fn push_entity(commands: &mut Vec<DrawCommand>, entity: &Entity, placement: &Placement) {
    let color = style::aci_color(entity.color());
    let stroke = Stroke::new(color, style::line_width(entity.line_weight(), ENTITY_BASE_WIDTH));

    match entity {
        Entity::Line(line) => {
            if !line.start.is_finite() || !line.end.is_finite() {
                return;
            }
            commands.push(DrawCommand::Line {
                from: placement.project(line.start),
                to: placement.project(line.end),
                stroke,
            });
        }
        Entity::Circle(circle) => {
            if !circle.center.is_finite() || !circle.radius.is_finite() || circle.radius == 0.0 {
                return;
            }
            commands.push(DrawCommand::Circle {
                center: placement.project(circle.center),
                radius: circle.radius.abs() * placement.length_scale,
                stroke,
            });
        }
        Entity::Polyline(polyline) => {
            let points: Vec<Point2> = polyline
                .vertices
                .iter()
                .filter(|vertex| vertex.is_finite())
                .map(|vertex| placement.project(*vertex))
                .collect();
            if points.is_empty() {
                return;
            }
            commands.push(DrawCommand::Polyline { points, stroke });
        }
        Entity::Text(text) | Entity::MText(text) => {
            if let Some(command) = text_command(text, color, placement) {
                commands.push(command);
            }
        }
        // 块内不嵌套块参照
        Entity::Insert(_) => {}
    }
}

fn text_command(text: &Text, color: &'static str, placement: &Placement) -> Option<DrawCommand> {
    if text.text.is_empty() || !text.start.is_finite() {
        return None;
    }
    let rotation = placement.rotation + finite_or(text.rotation, 0.0);
    Some(DrawCommand::Text {
        position: placement.project(text.start),
        content: text.text.clone(),
        font_size: (text.effective_height() * placement.length_scale).max(MIN_FONT_SIZE),
        rotation: -rotation.to_radians(),
        color,
    })
}

fn push_areas(commands: &mut Vec<DrawCommand>, session: &Session) {
    let selection = session.selection();
    for (index, area) in selection.areas().iter().enumerate() {
        let rect = area.screen_rect();
        commands.push(DrawCommand::Rect {
            min: rect.min,
            max: rect.max,
            fill: Some(AREA_FILL_COLOR),
            stroke: Some(Stroke::new(AREA_STROKE_COLOR, 2.0)),
            dashed: true,
        });
        if selection.active_index() == Some(index) {
            push_handles(commands, &rect);
        }
    }
}

fn push_handles(commands: &mut Vec<DrawCommand>, rect: &ScreenRect) {
    let half = HANDLE_SIZE / 2.0;
    for handle in Handle::ALL {
        let position = handle.position(rect);
        commands.push(DrawCommand::Rect {
            min: Point2::new(position.x() - half, position.y() - half),
            max: Point2::new(position.x() + half, position.y() + half),
            fill: Some(AREA_STROKE_COLOR),
            stroke: Some(Stroke::new(HANDLE_STROKE_COLOR, 1.0)),
            dashed: false,
        });
    }
}

#[inline]
fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() { value } else { fallback }
}

/// 缩放为 0 或非有限值时按 1 处理。
#[inline]
fn non_zero_or_one(value: f64) -> f64 {
    if value == 0.0 || !value.is_finite() {
        1.0
    } else {
        value
    }
}
