//! 矩形选区：创建、移动、拉伸、删除以及命中检测。
//!
//! 选区以屏幕坐标为准（拖拽过程中），每次变化后通过调用方提供的
//! 屏幕→世界变换重新计算世界坐标。

use dxfarea_core::geometry::Point2;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// 控制点命中容差（像素，逐轴比较）。
pub const HANDLE_TOLERANCE: f64 = 6.0;
/// 拉伸时允许的最小边长（像素）。
pub const MIN_AREA_SIZE: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionSettings {
    pub handle_tolerance: f64,
    pub min_size: f64,
}

impl Default for SelectionSettings {
    fn default() -> Self {
        Self {
            handle_tolerance: HANDLE_TOLERANCE,
            min_size: MIN_AREA_SIZE,
        }
    }
}

/// 选区的 8 个控制点。屏幕 Y 轴向下，因此 North 对应最小 Y。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handle {
    NorthWest,
    NorthEast,
    SouthWest,
    SouthEast,
    West,
    East,
    North,
    South,
}

impl Handle {
    /// 命中检测顺序：先四角，后四边中点。
    pub const ALL: [Handle; 8] = [
        Handle::NorthWest,
        Handle::NorthEast,
        Handle::SouthWest,
        Handle::SouthEast,
        Handle::West,
        Handle::East,
        Handle::North,
        Handle::South,
    ];

    pub fn position(self, rect: &ScreenRect) -> Point2 {
        let center = rect.center();
        match self {
            Handle::NorthWest => rect.min,
            Handle::NorthEast => Point2::new(rect.max.x(), rect.min.y()),
            Handle::SouthWest => Point2::new(rect.min.x(), rect.max.y()),
            Handle::SouthEast => rect.max,
            Handle::West => Point2::new(rect.min.x(), center.y()),
            Handle::East => Point2::new(rect.max.x(), center.y()),
            Handle::North => Point2::new(center.x(), rect.min.y()),
            Handle::South => Point2::new(center.x(), rect.max.y()),
        }
    }

    pub fn cursor(self) -> ResizeCursor {
        match self {
            Handle::NorthWest | Handle::SouthEast => ResizeCursor::NwSe,
            Handle::NorthEast | Handle::SouthWest => ResizeCursor::NeSw,
            Handle::North | Handle::South => ResizeCursor::Ns,
            Handle::West | Handle::East => ResizeCursor::Ew,
        }
    }

    /// 把指针位置应用到规范化的矩形上：角点同时改变两个轴，边中点只改变一个轴。
    fn apply(self, rect: &ScreenRect, pointer: Point2) -> (f64, f64, f64, f64) {
        let (mut min_x, mut min_y) = (rect.min.x(), rect.min.y());
        let (mut max_x, mut max_y) = (rect.max.x(), rect.max.y());
        match self {
            Handle::NorthWest => {
                min_x = pointer.x();
                min_y = pointer.y();
            }
            Handle::NorthEast => {
                max_x = pointer.x();
                min_y = pointer.y();
            }
            Handle::SouthWest => {
                min_x = pointer.x();
                max_y = pointer.y();
            }
            Handle::SouthEast => {
                max_x = pointer.x();
                max_y = pointer.y();
            }
            Handle::North => min_y = pointer.y(),
            Handle::South => max_y = pointer.y(),
            Handle::West => min_x = pointer.x(),
            Handle::East => max_x = pointer.x(),
        }
        (min_x, min_y, max_x, max_y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeCursor {
    NwSe,
    NeSw,
    Ns,
    Ew,
}

/// 指针样式提示，由宿主映射到具体的光标。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorHint {
    Grab,
    Grabbing,
    Crosshair,
    Move,
    Resize(ResizeCursor),
}

impl CursorHint {
    /// CSS `cursor` 属性的取值。
    pub fn css_name(self) -> &'static str {
        match self {
            CursorHint::Grab => "grab",
            CursorHint::Grabbing => "grabbing",
            CursorHint::Crosshair => "crosshair",
            CursorHint::Move => "move",
            CursorHint::Resize(ResizeCursor::NwSe) => "nwse-resize",
            CursorHint::Resize(ResizeCursor::NeSw) => "nesw-resize",
            CursorHint::Resize(ResizeCursor::Ns) => "ns-resize",
            CursorHint::Resize(ResizeCursor::Ew) => "ew-resize",
        }
    }
}

/// 规范化（min <= max）的屏幕矩形。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenRect {
    pub min: Point2,
    pub max: Point2,
}

impl ScreenRect {
    pub fn from_corners(a: Point2, b: Point2) -> Self {
        Self {
            min: Point2::from_vec(a.as_vec2().min(b.as_vec2())),
            max: Point2::from_vec(a.as_vec2().max(b.as_vec2())),
        }
    }

    /// 边界上的点也算在内。
    #[inline]
    pub fn contains(&self, point: Point2) -> bool {
        point.x() >= self.min.x()
            && point.x() <= self.max.x()
            && point.y() >= self.min.y()
            && point.y() <= self.max.y()
    }

    #[inline]
    pub fn center(&self) -> Point2 {
        Point2::from_vec((self.min.as_vec2() + self.max.as_vec2()) * 0.5)
    }
}

/// 对外输出的世界坐标矩形（左下角 + 宽高）。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionArea {
    pub start: Point2,
    pub end: Point2,
    pub world_start: Point2,
    pub world_end: Point2,
}

impl SelectionArea {
    fn at_point(point: Point2, to_world: &impl Fn(Point2) -> Point2) -> Self {
        let world = to_world(point);
        Self {
            start: point,
            end: point,
            world_start: world,
            world_end: world,
        }
    }

    fn set_screen(&mut self, start: Point2, end: Point2, to_world: &impl Fn(Point2) -> Point2) {
        self.start = start;
        self.end = end;
        self.world_start = to_world(start);
        self.world_end = to_world(end);
    }

    #[inline]
    pub fn screen_rect(&self) -> ScreenRect {
        ScreenRect::from_corners(self.start, self.end)
    }

    pub fn world_rect(&self) -> WorldRect {
        WorldRect {
            x: self.world_start.x().min(self.world_end.x()),
            y: self.world_start.y().min(self.world_end.y()),
            width: (self.world_end.x() - self.world_start.x()).abs(),
            height: (self.world_end.y() - self.world_start.y()).abs(),
        }
    }
}

/// 一次指针拖拽中选区所处的阶段。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Drawing,
    Moving,
    Resizing(Handle),
}

/// 按下指针时选中的行为。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressOutcome {
    Resize(Handle),
    Move(usize),
    Create(usize),
}

#[derive(Debug, Clone, Default)]
pub struct SelectionEngine {
    areas: Vec<SelectionArea>,
    active: Option<usize>,
    drag: DragState,
    last_pointer: Point2,
    settings: SelectionSettings,
}

impl SelectionEngine {
    pub fn new(settings: SelectionSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    #[inline]
    pub fn settings(&self) -> SelectionSettings {
        self.settings
    }

    #[inline]
    pub fn areas(&self) -> &[SelectionArea] {
        &self.areas
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    #[inline]
    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    #[inline]
    pub fn active_area(&self) -> Option<&SelectionArea> {
        self.active.and_then(|index| self.areas.get(index))
    }

    #[inline]
    pub fn drag_state(&self) -> DragState {
        self.drag
    }

    /// 全部选区的世界坐标矩形，按创建顺序。
    pub fn world_rects(&self) -> Vec<WorldRect> {
        self.areas.iter().map(SelectionArea::world_rect).collect()
    }

    /// 当前活动选区上被 `point` 命中的控制点。
    pub fn handle_at(&self, point: Point2) -> Option<Handle> {
        let rect = self.active_area()?.screen_rect();
        let tolerance = self.settings.handle_tolerance;
        Handle::ALL.into_iter().find(|handle| {
            let position = handle.position(&rect);
            (point.x() - position.x()).abs() <= tolerance
                && (point.y() - position.y()).abs() <= tolerance
        })
    }

    /// 包含 `point` 的选区，后创建的优先。
    pub fn area_at(&self, point: Point2) -> Option<usize> {
        self.areas
            .iter()
            .rposition(|area| area.screen_rect().contains(point))
    }

    /// 指针按下：依次尝试拉伸活动选区、移动已有选区、新建选区。
    pub fn press(&mut self, point: Point2, to_world: impl Fn(Point2) -> Point2) -> PressOutcome {
        self.last_pointer = point;

        if let Some(handle) = self.handle_at(point) {
            self.drag = DragState::Resizing(handle);
            return PressOutcome::Resize(handle);
        }

        if let Some(index) = self.area_at(point) {
            self.active = Some(index);
            self.drag = DragState::Moving;
            return PressOutcome::Move(index);
        }

        self.areas.push(SelectionArea::at_point(point, &to_world));
        let index = self.areas.len() - 1;
        self.active = Some(index);
        self.drag = DragState::Drawing;
        debug!(index, x = point.x(), y = point.y(), "新建选区");
        PressOutcome::Create(index)
    }

    /// 指针移动，返回活动选区是否被修改。
    pub fn drag(&mut self, point: Point2, to_world: impl Fn(Point2) -> Point2) -> bool {
        let delta = self.last_pointer.vector_to(point);
        self.last_pointer = point;
        let drag = self.drag;
        let min_size = self.settings.min_size;
        let Some(area) = self.active.and_then(|index| self.areas.get_mut(index)) else {
            return false;
        };

        match drag {
            DragState::Idle => false,
            DragState::Drawing => {
                area.end = point;
                area.world_end = to_world(point);
                true
            }
            DragState::Moving => {
                if delta.length_squared() == 0.0 {
                    return false;
                }
                let start = area.start.translate(delta);
                let end = area.end.translate(delta);
                area.set_screen(start, end, &to_world);
                true
            }
            DragState::Resizing(handle) => {
                let (min_x, min_y, max_x, max_y) = handle.apply(&area.screen_rect(), point);
                if (max_x - min_x).abs() < min_size || (max_y - min_y).abs() < min_size {
                    return false;
                }
                area.set_screen(
                    Point2::new(min_x, min_y),
                    Point2::new(max_x, max_y),
                    &to_world,
                );
                true
            }
        }
    }

    /// 指针抬起或离开画布：结束拖拽，活动选区保持不变。
    pub fn release(&mut self) -> bool {
        let was_dragging = self.drag != DragState::Idle;
        self.drag = DragState::Idle;
        was_dragging
    }

    /// 删除活动选区。删除后活动索引停留在原位置（即下一个选区），
    /// 删除的是最后一个时移到新的末尾，列表为空时清空。
    pub fn delete_active(&mut self) -> bool {
        let Some(index) = self.active else {
            return false;
        };
        if index >= self.areas.len() {
            self.active = None;
            return false;
        }
        self.areas.remove(index);
        self.drag = DragState::Idle;
        self.active = if self.areas.is_empty() {
            None
        } else if index >= self.areas.len() {
            Some(self.areas.len() - 1)
        } else {
            Some(index)
        };
        debug!(index, remaining = self.areas.len(), "已删除选区");
        true
    }

    /// 清空所有选区（例如载入新文档时）。
    pub fn clear(&mut self) -> bool {
        let had_areas = !self.areas.is_empty() || self.active.is_some();
        self.areas.clear();
        self.active = None;
        self.drag = DragState::Idle;
        had_areas
    }

    /// 选择模式下的指针样式。正在绘制或移动时不提示控制点。
    pub fn cursor_hint(&self, point: Point2) -> CursorHint {
        if self.active_area().is_some()
            && !matches!(self.drag, DragState::Drawing | DragState::Moving)
        {
            if let Some(handle) = self.handle_at(point) {
                return CursorHint::Resize(handle.cursor());
            }
            if self
                .active_area()
                .is_some_and(|area| area.screen_rect().contains(point))
            {
                return CursorHint::Move;
            }
        }
        if self.area_at(point).is_some() {
            CursorHint::Move
        } else {
            CursorHint::Crosshair
        }
    }
}

/// 恒等变换：屏幕坐标直接作为世界坐标。
pub fn identity(point: Point2) -> Point2 {
    point
}
