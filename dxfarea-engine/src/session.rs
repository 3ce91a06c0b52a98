//! 单个文档的交互会话：持有文档、视口、画布尺寸、交互模式与选区状态。
//!
//! 所有修改都通过 `&mut self` 同步完成，并返回 [`Changes`] 说明哪些状态需要重绘；
//! 选区列表的每次变化还会推送给可选的 [`AreaObserver`]。

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use dxfarea_core::document::Document;
use dxfarea_core::geometry::Point2;
use dxfarea_io::{ParseError, parse};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::selection::{
    CursorHint, PressOutcome, SelectionEngine, SelectionSettings, WorldRect,
};
use crate::viewport::{CanvasSize, ViewportTransform, ZoomLimits};

/// 指针拖拽的作用对象。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionMode {
    /// 拖拽平移视口。
    Pan,
    /// 拖拽创建、移动、拉伸选区。
    #[default]
    Select,
}

impl InteractionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            InteractionMode::Pan => "pan",
            InteractionMode::Select => "select",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

/// 一次修改影响到的状态，用于显式驱动重绘。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Changes {
    pub document: bool,
    pub viewport: bool,
    pub mode: bool,
    pub areas: bool,
    pub active: bool,
}

impl Changes {
    pub const NONE: Changes = Changes {
        document: false,
        viewport: false,
        mode: false,
        areas: false,
        active: false,
    };

    #[inline]
    pub fn any(&self) -> bool {
        self.document || self.viewport || self.mode || self.areas || self.active
    }

    fn viewport(changed: bool) -> Self {
        Self {
            viewport: changed,
            ..Self::NONE
        }
    }

    fn areas(changed: bool) -> Self {
        Self {
            areas: changed,
            active: changed,
            ..Self::NONE
        }
    }
}

impl BitOr for Changes {
    type Output = Changes;

    fn bitor(self, rhs: Changes) -> Changes {
        Changes {
            document: self.document || rhs.document,
            viewport: self.viewport || rhs.viewport,
            mode: self.mode || rhs.mode,
            areas: self.areas || rhs.areas,
            active: self.active || rhs.active,
        }
    }
}

impl BitOrAssign for Changes {
    fn bitor_assign(&mut self, rhs: Changes) {
        *self = *self | rhs;
    }
}

/// 选区列表或活动索引变化时收到完整的世界坐标矩形列表。
pub trait AreaObserver {
    fn areas_changed(&mut self, areas: &[WorldRect], active: Option<usize>);
}

impl<F> AreaObserver for F
where
    F: FnMut(&[WorldRect], Option<usize>),
{
    fn areas_changed(&mut self, areas: &[WorldRect], active: Option<usize>) {
        self(areas, active)
    }
}

pub struct Session {
    document: Option<Document>,
    viewport: ViewportTransform,
    canvas: CanvasSize,
    zoom_limits: ZoomLimits,
    mode: InteractionMode,
    selection: SelectionEngine,
    panning: bool,
    last_pointer: Point2,
    pointer: Option<Point2>,
    observer: Option<Box<dyn AreaObserver + Send>>,
}

impl Session {
    pub fn new(canvas: CanvasSize) -> Self {
        Self::with_settings(canvas, SelectionSettings::default(), ZoomLimits::default())
    }

    pub fn with_settings(
        canvas: CanvasSize,
        selection: SelectionSettings,
        zoom_limits: ZoomLimits,
    ) -> Self {
        Self {
            document: None,
            viewport: ViewportTransform::default(),
            canvas,
            zoom_limits,
            mode: InteractionMode::default(),
            selection: SelectionEngine::new(selection),
            panning: false,
            last_pointer: Point2::ORIGIN,
            pointer: None,
            observer: None,
        }
    }

    /// 注册选区变化的监听者，替换之前的监听者。
    pub fn set_observer(&mut self, observer: impl AreaObserver + Send + 'static) {
        self.observer = Some(Box::new(observer));
    }

    /// 解析文本并载入。解析失败时清空当前文档与选区后返回错误。
    pub fn load_text(&mut self, text: &str) -> Result<Changes, ParseError> {
        match parse(text) {
            Ok(document) => Ok(self.load_document(document)),
            Err(err) => {
                warn!(error = %err, "DXF 解析失败，清空当前文档");
                let had_document = self.document.take().is_some();
                let cleared = self.selection.clear();
                self.panning = false;
                self.finish(Changes {
                    document: had_document,
                    ..Changes::areas(cleared)
                });
                Err(err)
            }
        }
    }

    /// 替换文档：清空选区并让视口适配新文档的范围。
    pub fn load_document(&mut self, document: Document) -> Changes {
        info!(
            entities = document.entity_count(),
            blocks = document.block_count(),
            "载入文档"
        );
        self.document = Some(document);
        self.panning = false;
        let cleared = self.selection.clear();
        let changes = Changes {
            document: true,
            ..Changes::areas(cleared)
        } | self.fit_to_view();
        self.finish(changes)
    }

    /// 视口适配当前文档范围；范围退化时不变。
    pub fn fit_to_view(&mut self) -> Changes {
        let Some(document) = &self.document else {
            return Changes::NONE;
        };
        let bounds = document.bounds();
        Changes::viewport(self.viewport.fit_to_bounds(&bounds, self.canvas))
    }

    /// 更新画布像素尺寸。已有选区保持屏幕位置与世界坐标不变。
    pub fn resize_canvas(&mut self, canvas: CanvasSize) -> Changes {
        if canvas == self.canvas {
            return Changes::NONE;
        }
        debug!(width = canvas.width, height = canvas.height, "画布尺寸变化");
        self.canvas = canvas;
        Changes::viewport(true)
    }

    /// 切换交互模式，同时结束正在进行的拖拽。
    pub fn set_mode(&mut self, mode: InteractionMode) -> Changes {
        if mode == self.mode {
            return Changes::NONE;
        }
        self.end_drag();
        self.mode = mode;
        debug!(mode = mode.as_str(), "切换交互模式");
        Changes {
            mode: true,
            ..Changes::NONE
        }
    }

    /// 指针按下。只有主键参与交互。
    pub fn pointer_down(&mut self, point: Point2, button: PointerButton) -> Changes {
        self.pointer = Some(point);
        if button != PointerButton::Primary {
            return Changes::NONE;
        }

        match self.mode {
            InteractionMode::Pan => {
                self.panning = true;
                self.last_pointer = point;
                Changes::NONE
            }
            InteractionMode::Select => {
                let previous = self.selection.active_index();
                let viewport = self.viewport;
                let canvas = self.canvas;
                let outcome = self
                    .selection
                    .press(point, |p| viewport.screen_to_world(p, canvas));
                let changes = match outcome {
                    PressOutcome::Create(_) => Changes::areas(true),
                    PressOutcome::Move(index) => Changes {
                        active: previous != Some(index),
                        ..Changes::NONE
                    },
                    PressOutcome::Resize(_) => Changes::NONE,
                };
                self.finish(changes)
            }
        }
    }

    /// 指针移动：平移视口或更新活动选区。
    pub fn pointer_move(&mut self, point: Point2) -> Changes {
        self.pointer = Some(point);
        match self.mode {
            InteractionMode::Pan => {
                if !self.panning {
                    return Changes::NONE;
                }
                let delta = self.last_pointer.vector_to(point);
                self.last_pointer = point;
                Changes::viewport(self.viewport.pan(delta))
            }
            InteractionMode::Select => {
                let viewport = self.viewport;
                let canvas = self.canvas;
                let changed = self
                    .selection
                    .drag(point, |p| viewport.screen_to_world(p, canvas));
                self.finish(Changes {
                    areas: changed,
                    ..Changes::NONE
                })
            }
        }
    }

    pub fn pointer_up(&mut self) -> Changes {
        self.end_drag();
        Changes::NONE
    }

    /// 指针离开画布，等同于抬起。
    pub fn pointer_leave(&mut self) -> Changes {
        self.pointer = None;
        self.pointer_up()
    }

    /// 滚轮缩放，以指针位置为锚点。存在选区时视口固定，不响应缩放。
    pub fn wheel(&mut self, point: Point2, delta_y: f64) -> Changes {
        self.pointer = Some(point);
        if !self.selection.is_empty() {
            debug!(areas = self.selection.areas().len(), "存在选区，忽略缩放");
            return Changes::NONE;
        }
        let changed = self
            .viewport
            .zoom_at(point, delta_y, self.canvas, self.zoom_limits);
        if changed {
            debug!(scale = self.viewport.scale(), "视口缩放");
        }
        Changes::viewport(changed)
    }

    /// 删除活动选区（删除键）。
    pub fn delete_active_area(&mut self) -> Changes {
        let changed = self.selection.delete_active();
        self.finish(Changes::areas(changed))
    }

    pub fn clear_areas(&mut self) -> Changes {
        let changed = self.selection.clear();
        self.finish(Changes::areas(changed))
    }

    #[inline]
    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    #[inline]
    pub fn viewport(&self) -> &ViewportTransform {
        &self.viewport
    }

    #[inline]
    pub fn canvas(&self) -> CanvasSize {
        self.canvas
    }

    #[inline]
    pub fn zoom_limits(&self) -> ZoomLimits {
        self.zoom_limits
    }

    #[inline]
    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    #[inline]
    pub fn selection(&self) -> &SelectionEngine {
        &self.selection
    }

    #[inline]
    pub fn is_panning(&self) -> bool {
        self.panning
    }

    /// 最近一次指针位置；指针离开画布后为 `None`。
    #[inline]
    pub fn pointer(&self) -> Option<Point2> {
        self.pointer
    }

    /// 全部选区的世界坐标矩形，按创建顺序。
    pub fn world_areas(&self) -> Vec<WorldRect> {
        self.selection.world_rects()
    }

    #[inline]
    pub fn active_area_index(&self) -> Option<usize> {
        self.selection.active_index()
    }

    /// 活动选区的世界坐标矩形（工具栏中的 x/y/宽/高读数）。
    pub fn active_world_rect(&self) -> Option<WorldRect> {
        self.selection.active_area().map(|area| area.world_rect())
    }

    /// 当前指针位置下的光标样式。
    pub fn cursor_hint(&self) -> CursorHint {
        match self.pointer {
            Some(point) => self.cursor_hint_at(point),
            None => match self.mode {
                InteractionMode::Pan if self.panning => CursorHint::Grabbing,
                InteractionMode::Pan => CursorHint::Grab,
                InteractionMode::Select => CursorHint::Crosshair,
            },
        }
    }

    pub fn cursor_hint_at(&self, point: Point2) -> CursorHint {
        match self.mode {
            InteractionMode::Pan if self.panning => CursorHint::Grabbing,
            InteractionMode::Pan => CursorHint::Grab,
            InteractionMode::Select => self.selection.cursor_hint(point),
        }
    }

    #[inline]
    pub fn world_to_screen(&self, point: Point2) -> Point2 {
        self.viewport.world_to_screen(point, self.canvas)
    }

    #[inline]
    pub fn screen_to_world(&self, point: Point2) -> Point2 {
        self.viewport.screen_to_world(point, self.canvas)
    }

    fn end_drag(&mut self) {
        self.panning = false;
        self.selection.release();
    }

    fn finish(&mut self, changes: Changes) -> Changes {
        if changes.areas || changes.active {
            if let Some(observer) = self.observer.as_mut() {
                observer.areas_changed(
                    &self.selection.world_rects(),
                    self.selection.active_index(),
                );
            }
        }
        changes
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("document", &self.document.as_ref().map(Document::entity_count))
            .field("viewport", &self.viewport)
            .field("canvas", &self.canvas)
            .field("mode", &self.mode)
            .field("selection", &self.selection)
            .field("panning", &self.panning)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}
