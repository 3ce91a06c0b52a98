use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use dxfarea_core::geometry::Point2;
use dxfarea_engine::display::{self, DrawCommand};
use dxfarea_engine::selection::WorldRect;
use dxfarea_engine::session::{InteractionMode, Session};
use serde::Serialize;

/// 报告输出格式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// CLI 一次运行的输入。
#[derive(Debug, Clone, Default)]
pub struct CliOptions {
    pub path: PathBuf,
    pub script: Option<PathBuf>,
    pub format: OutputFormat,
    /// 附带输出绘制列表（仅 JSON 格式）。
    pub draw_list: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundsReport {
    pub min: Point2,
    pub max: Point2,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewportReport {
    pub scale: f64,
    pub offset: [f64; 2],
    pub canvas: [f64; 2],
}

/// 会话状态的快照，供文本或 JSON 输出。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub source: String,
    pub entity_count: usize,
    pub block_count: usize,
    pub entity_kinds: BTreeMap<&'static str, usize>,
    pub bounds: Option<BoundsReport>,
    pub viewport: ViewportReport,
    pub mode: InteractionMode,
    pub areas: Vec<WorldRect>,
    pub active_area: Option<usize>,
    pub cursor: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draw_list: Option<Vec<DrawCommand>>,
}

impl Report {
    pub fn from_session(source: &Path, session: &Session) -> Self {
        let mut entity_kinds = BTreeMap::new();
        let (entity_count, block_count, bounds) = match session.document() {
            Some(document) => {
                for entity in document.entities() {
                    *entity_kinds.entry(entity.kind_name()).or_insert(0) += 1;
                }
                let bounds = document.bounds();
                let bounds = bounds.is_finite().then(|| BoundsReport {
                    min: bounds.min(),
                    max: bounds.max(),
                });
                (document.entity_count(), document.block_count(), bounds)
            }
            None => (0, 0, None),
        };

        let viewport = session.viewport();
        let offset = viewport.offset();
        let canvas = session.canvas();
        Self {
            source: source.display().to_string(),
            entity_count,
            block_count,
            entity_kinds,
            bounds,
            viewport: ViewportReport {
                scale: viewport.scale(),
                offset: [offset.x(), offset.y()],
                canvas: [canvas.width, canvas.height],
            },
            mode: session.mode(),
            areas: session.world_areas(),
            active_area: session.active_area_index(),
            cursor: session.cursor_hint().css_name(),
            draw_list: None,
        }
    }

    /// 附带当前会话的绘制列表。
    pub fn with_draw_list(mut self, session: &Session) -> Self {
        self.draw_list = Some(display::build(session));
        self
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        // 写入 String 不会失败
        let _ = writeln!(out, "DXF 文件：{}", self.source);
        let _ = writeln!(
            out,
            "实体数={}, 块定义数={}",
            self.entity_count, self.block_count
        );
        if !self.entity_kinds.is_empty() {
            let kinds: Vec<String> = self
                .entity_kinds
                .iter()
                .map(|(kind, count)| format!("{kind}={count}"))
                .collect();
            let _ = writeln!(out, "实体类型：{}", kinds.join(", "));
        }
        match &self.bounds {
            Some(bounds) => {
                let _ = writeln!(
                    out,
                    "范围：{} - {}",
                    format_point(bounds.min),
                    format_point(bounds.max)
                );
            }
            None => {
                let _ = writeln!(out, "范围：<无有效范围>");
            }
        }
        let _ = writeln!(
            out,
            "视口：缩放={:.3}, 偏移=({:.2}, {:.2}), 画布={}x{}",
            self.viewport.scale,
            self.viewport.offset[0],
            self.viewport.offset[1],
            self.viewport.canvas[0],
            self.viewport.canvas[1]
        );
        let _ = writeln!(
            out,
            "交互模式：{}, 光标={}",
            self.mode.as_str(),
            self.cursor
        );
        if self.areas.is_empty() {
            let _ = writeln!(out, "当前没有选区。");
        } else {
            let _ = writeln!(out, "选区（{} 个）：", self.areas.len());
            for (index, area) in self.areas.iter().enumerate() {
                let marker = if self.active_area == Some(index) {
                    "*"
                } else {
                    "-"
                };
                let _ = writeln!(
                    out,
                    "  {marker} #{index} x={:.2}, y={:.2}, 宽={:.2}, 高={:.2}",
                    area.x, area.y, area.width, area.height
                );
            }
        }
        out
    }
}

fn format_point(point: Point2) -> String {
    format!("({:.2}, {:.2})", point.x(), point.y())
}

#[cfg(test)]
mod tests {
    use dxfarea_engine::session::PointerButton;
    use dxfarea_engine::viewport::CanvasSize;
    use serde_json::json;

    use super::*;

    fn session_with_area() -> Session {
        let mut session = Session::new(CanvasSize::new(800.0, 600.0));
        session
            .load_text(
                "ENTITIES\nLINE\n10\n0\n20\n0\n11\n100\n21\n50\n0\nCIRCLE\n10\n50\n20\n25\n40\n5\n0\nENDSEC\n",
            )
            .expect("parse");
        session.pointer_down(Point2::new(300.0, 350.0), PointerButton::Primary);
        session.pointer_move(Point2::new(500.0, 250.0));
        session.pointer_up();
        session
    }

    #[test]
    fn text_report_lists_areas_and_viewport() {
        let session = session_with_area();
        let text = Report::from_session(Path::new("plan.dxf"), &session).to_text();
        assert!(text.contains("DXF 文件：plan.dxf"));
        assert!(text.contains("实体数=2, 块定义数=0"));
        assert!(text.contains("实体类型：CIRCLE=1, LINE=1"));
        assert!(text.contains("范围：(0.00, 0.00) - (100.00, 50.00)"));
        assert!(text.contains("缩放=2.000"));
        assert!(text.contains("* #0 x=0.00, y=0.00, 宽=100.00, 高=50.00"));
    }

    #[test]
    fn json_report_matches_snapshot() {
        let session = session_with_area();
        let report = Report::from_session(Path::new("plan.dxf"), &session);
        let value: serde_json::Value =
            serde_json::from_str(&report.to_json().expect("serialize")).expect("parse json");
        assert_eq!(
            value,
            json!({
                "source": "plan.dxf",
                "entity_count": 2,
                "block_count": 0,
                "entity_kinds": {"CIRCLE": 1, "LINE": 1},
                "bounds": {"min": [0.0, 0.0], "max": [100.0, 50.0]},
                "viewport": {"scale": 2.0, "offset": [-50.0, -25.0], "canvas": [800.0, 600.0]},
                "mode": "select",
                "areas": [{"x": 0.0, "y": 0.0, "width": 100.0, "height": 50.0}],
                "active_area": 0,
                "cursor": "nesw-resize"
            })
        );
    }

    #[test]
    fn draw_list_is_attached_on_request() {
        let session = session_with_area();
        let report = Report::from_session(Path::new("plan.dxf"), &session).with_draw_list(&session);
        let commands = report.draw_list.as_ref().expect("draw list");
        assert!(commands.iter().any(|command| matches!(command, DrawCommand::Circle { .. })));
        let value = serde_json::to_value(&report).expect("serialize");
        assert!(value["draw_list"].is_array());
    }

    #[test]
    fn report_without_document_has_no_bounds() {
        let session = Session::new(CanvasSize::new(800.0, 600.0));
        let report = Report::from_session(Path::new("empty.dxf"), &session);
        assert_eq!(report.entity_count, 0);
        assert!(report.bounds.is_none());
        assert!(report.to_text().contains("范围：<无有效范围>"));
        assert!(report.to_text().contains("当前没有选区。"));
    }
}
