use std::fs;
use std::path::{Path, PathBuf};

use dxfarea_core::{
    document::{Block, Circle, DEFAULT_LAYER, Document, Entity, Insert, Line, Polyline, Text},
    geometry::Point2,
};
use thiserror::Error;
use tracing::{debug, warn};

/// 解析阶段唯一对外报告的错误。单条记录的格式问题不会中断解析。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("no supported entities found in DXF content")]
    NoEntities,
}

#[derive(Debug, Error)]
pub enum IoError {
    #[error("failed to read file {path:?}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse file {path:?}: {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
}

pub trait DocumentLoader {
    fn load(&self, path: &Path) -> Result<Document, IoError>;
}

pub struct DxfFacade;

impl DxfFacade {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DxfFacade {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentLoader for DxfFacade {
    fn load(&self, path: &Path) -> Result<Document, IoError> {
        let bytes = fs::read(path).map_err(|source| IoError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        // 旧版 DXF 常见 ANSI 编码，无法解码的字节以替换字符保留，不中断加载。
        let text = String::from_utf8_lossy(&bytes);
        parse(&text).map_err(|source| IoError::ParseError {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// 解析 DXF 文本，只处理 BLOCKS 与 ENTITIES 段。
///
/// 解析是尽力而为的：未识别的组码被跳过，缺失的组码保持默认值，
/// 无法解析的浮点数记为 `NaN`。只有最终一个实体都没有时才返回错误。
pub fn parse(text: &str) -> Result<Document, ParseError> {
    let document = DxfParser::new(text).parse();
    if document.entity_count() == 0 {
        warn!(lines = text.lines().count(), "DXF 内容中没有可识别的实体");
        return Err(ParseError::NoEntities);
    }
    debug!(
        entity_count = document.entity_count(),
        block_count = document.block_count(),
        "DXF 解析完成"
    );
    Ok(document)
}

struct DxfParser<'a> {
    reader: DxfReader<'a>,
    document: Document,
    in_blocks: bool,
    in_entities: bool,
    current_block: Option<Block>,
}

impl<'a> DxfParser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            reader: DxfReader::new(source),
            document: Document::new(),
            in_blocks: false,
            in_entities: false,
            current_block: None,
        }
    }

    fn parse(mut self) -> Document {
        while let Some(line) = self.reader.current() {
            match line {
                "BLOCKS" => {
                    self.in_blocks = true;
                    self.reader.advance();
                }
                "ENTITIES" => {
                    self.in_entities = true;
                    self.in_blocks = false;
                    self.reader.advance();
                }
                "ENDSEC" => {
                    self.in_entities = false;
                    self.in_blocks = false;
                    self.reader.advance();
                }
                "BLOCK" if self.in_blocks => self.begin_block(),
                "ENDBLK" if self.in_blocks => {
                    if let Some(block) = self.current_block.take() {
                        self.document.add_block(block);
                    }
                    self.reader.advance();
                }
                "INSERT" if self.in_entities => {
                    let entity = self.parse_insert();
                    self.document.add_entity(entity);
                }
                kind if is_shared_kind(kind) && self.in_blocks && self.current_block.is_some() => {
                    let entity = self.parse_entity(kind);
                    if let Some(block) = self.current_block.as_mut() {
                        block.entities.push(entity);
                    }
                }
                kind if is_shared_kind(kind) && self.in_entities => {
                    let entity = self.parse_entity(kind);
                    self.document.add_entity(entity);
                }
                _ => self.reader.advance(),
            }
        }

        if let Some(block) = self.current_block.take() {
            debug!(name = %block.name, "BLOCK 未找到 ENDBLK，丢弃该块定义");
        }
        self.document
    }

    fn begin_block(&mut self) {
        self.reader.advance();
        let mut block = Block::new(String::new());
        while let Some(pair) = self.reader.next_pair() {
            if pair.code == Some(2) {
                block.name = pair.text();
            }
        }
        if let Some(previous) = self.current_block.replace(block) {
            debug!(name = %previous.name, "BLOCK 重复开始，丢弃未结束的块定义");
        }
    }

    fn parse_entity(&mut self, kind: &str) -> Entity {
        match kind {
            "LINE" => self.parse_line(),
            "CIRCLE" => self.parse_circle(),
            "MTEXT" => Entity::MText(self.parse_text()),
            "POLYLINE" => self.parse_polyline(),
            _ => Entity::Text(self.parse_text()),
        }
    }

    fn parse_line(&mut self) -> Entity {
        self.reader.advance();
        let mut line = Line {
            start: Point2::ORIGIN,
            end: Point2::ORIGIN,
            layer: DEFAULT_LAYER.to_string(),
            color: None,
            line_type: None,
            line_weight: None,
        };
        while let Some(pair) = self.reader.next_pair() {
            match pair.code {
                Some(10) => line.start = Point2::new(pair.float(), line.start.y()),
                Some(20) => line.start = Point2::new(line.start.x(), pair.float()),
                Some(11) => line.end = Point2::new(pair.float(), line.end.y()),
                Some(21) => line.end = Point2::new(line.end.x(), pair.float()),
                Some(8) => line.layer = pair.text(),
                Some(62) => line.color = pair.int(),
                Some(6) => line.line_type = Some(pair.text()),
                Some(370) => line.line_weight = pair.int(),
                _ => {} // Z 坐标（30/31）及其余组码忽略
            }
        }
        Entity::Line(line)
    }

    fn parse_circle(&mut self) -> Entity {
        self.reader.advance();
        let mut circle = Circle {
            center: Point2::ORIGIN,
            radius: 0.0,
            layer: DEFAULT_LAYER.to_string(),
            color: None,
            line_type: None,
            line_weight: None,
        };
        while let Some(pair) = self.reader.next_pair() {
            match pair.code {
                Some(10) => circle.center = Point2::new(pair.float(), circle.center.y()),
                Some(20) => circle.center = Point2::new(circle.center.x(), pair.float()),
                Some(40) => circle.radius = pair.float(),
                Some(8) => circle.layer = pair.text(),
                Some(62) => circle.color = pair.int(),
                Some(6) => circle.line_type = Some(pair.text()),
                Some(370) => circle.line_weight = pair.int(),
                _ => {}
            }
        }
        Entity::Circle(circle)
    }

    fn parse_text(&mut self) -> Text {
        self.reader.advance();
        let mut text = Text {
            start: Point2::ORIGIN,
            text: String::new(),
            height: 1.0,
            rotation: 0.0,
            layer: DEFAULT_LAYER.to_string(),
            color: None,
        };
        while let Some(pair) = self.reader.next_pair() {
            match pair.code {
                Some(10) => text.start = Point2::new(pair.float(), text.start.y()),
                Some(20) => text.start = Point2::new(text.start.x(), pair.float()),
                Some(1) => text.text = pair.text(),
                Some(40) => text.height = pair.float(),
                Some(50) => text.rotation = pair.float(),
                Some(8) => text.layer = pair.text(),
                Some(62) => text.color = pair.int(),
                _ => {}
            }
        }
        text
    }

    fn parse_polyline(&mut self) -> Entity {
        self.reader.advance();
        let mut polyline = Polyline {
            vertices: Vec::new(),
            layer: DEFAULT_LAYER.to_string(),
            color: None,
            line_type: None,
            line_weight: None,
        };
        while let Some(pair) = self.reader.next_pair() {
            match pair.code {
                Some(8) => polyline.layer = pair.text(),
                Some(62) => polyline.color = pair.int(),
                Some(6) => polyline.line_type = Some(pair.text()),
                Some(370) => polyline.line_weight = pair.int(),
                _ => {}
            }
        }

        while let Some(line) = self.reader.current() {
            match line {
                "SEQEND" => {
                    self.reader.advance();
                    break;
                }
                "VERTEX" => {
                    self.reader.advance();
                    let mut vertex = Point2::ORIGIN;
                    while let Some(pair) = self.reader.next_pair() {
                        match pair.code {
                            Some(10) => vertex = Point2::new(pair.float(), vertex.y()),
                            Some(20) => vertex = Point2::new(vertex.x(), pair.float()),
                            _ => {}
                        }
                    }
                    polyline.vertices.push(vertex);
                }
                _ => self.reader.advance(),
            }
        }
        Entity::Polyline(polyline)
    }

    fn parse_insert(&mut self) -> Entity {
        self.reader.advance();
        let mut insert = Insert {
            block_name: String::new(),
            insertion_point: Point2::ORIGIN,
            scale_x: 1.0,
            scale_y: 1.0,
            scale_z: 1.0,
            rotation_angle: 0.0,
            layer: DEFAULT_LAYER.to_string(),
            color: None,
        };
        while let Some(pair) = self.reader.next_pair() {
            let point = insert.insertion_point;
            match pair.code {
                Some(2) => insert.block_name = pair.text(),
                Some(10) => insert.insertion_point = Point2::new(pair.float(), point.y()),
                Some(20) => insert.insertion_point = Point2::new(point.x(), pair.float()),
                Some(41) => insert.scale_x = pair.float(),
                Some(42) => insert.scale_y = pair.float(),
                Some(43) => insert.scale_z = pair.float(),
                Some(50) => insert.rotation_angle = pair.float(),
                Some(8) => insert.layer = pair.text(),
                Some(62) => insert.color = pair.int(),
                _ => {}
            }
        }
        Entity::Insert(insert)
    }
}

/// BLOCKS 与 ENTITIES 段共用的实体关键字（INSERT 仅在 ENTITIES 段有效）。
fn is_shared_kind(kind: &str) -> bool {
    matches!(kind, "LINE" | "CIRCLE" | "TEXT" | "MTEXT" | "POLYLINE")
}

/// 按行扫描的游标。所有行在构造时去除首尾空白（含 `\r`）。
struct DxfReader<'a> {
    lines: Vec<&'a str>,
    position: usize,
}

/// 一对 `(组码, 值)`。组码无法解析时为 `None`，该对会被调用方忽略。
#[derive(Debug, Clone, Copy)]
struct GroupPair<'a> {
    code: Option<i32>,
    value: &'a str,
}

impl GroupPair<'_> {
    fn float(&self) -> f64 {
        parse_float(self.value)
    }

    fn int(&self) -> Option<i32> {
        parse_int(self.value)
    }

    fn text(&self) -> String {
        self.value.to_string()
    }
}

impl<'a> DxfReader<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            lines: source.split('\n').map(str::trim).collect(),
            position: 0,
        }
    }

    fn current(&self) -> Option<&'a str> {
        self.lines.get(self.position).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    /// 读取下一对组码/值。遇到值为 `"0"` 的行（下一条记录的类型标记）或输入结束时
    /// 返回 `None`，且不消费该行。缺失的值行视为空字符串。
    fn next_pair(&mut self) -> Option<GroupPair<'a>> {
        let code_line = self.current()?;
        if code_line == "0" {
            return None;
        }
        let value = self.lines.get(self.position + 1).copied().unwrap_or("");
        self.position += 2;
        Some(GroupPair {
            code: parse_int(code_line),
            value,
        })
    }
}

/// 取最长的数值前缀解析浮点数，行为与宽松的 `parseFloat` 一致；没有前缀时返回 `NaN`。
fn parse_float(raw: &str) -> f64 {
    let prefix = numeric_prefix(raw.trim(), true);
    if prefix.is_empty() {
        return f64::NAN;
    }
    prefix.parse::<f64>().unwrap_or(f64::NAN)
}

fn parse_int(raw: &str) -> Option<i32> {
    let prefix = numeric_prefix(raw.trim(), false);
    if prefix.is_empty() {
        return None;
    }
    prefix.parse::<i32>().ok()
}

fn numeric_prefix(raw: &str, allow_fraction: bool) -> &str {
    let bytes = raw.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digit_count = end - digits_start;

    if allow_fraction {
        if end < bytes.len() && bytes[end] == b'.' {
            let dot = end;
            end += 1;
            let fraction_start = end;
            while end < bytes.len() && bytes[end].is_ascii_digit() {
                end += 1;
            }
            digit_count += end - fraction_start;
            if digit_count == 0 {
                end = dot;
            }
        }
        if digit_count > 0 && end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
            let mut exp_end = end + 1;
            if matches!(bytes.get(exp_end), Some(b'+') | Some(b'-')) {
                exp_end += 1;
            }
            let exp_digits = exp_end;
            while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
                exp_end += 1;
            }
            if exp_end > exp_digits {
                end = exp_end;
            }
        }
    }

    if digit_count == 0 { "" } else { &raw[..end] }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lenient_numbers_follow_prefix_rules() {
        assert_eq!(parse_float("12.5"), 12.5);
        assert_eq!(parse_float("  -3e2 "), -300.0);
        assert_eq!(parse_float("7.25mm"), 7.25);
        assert_eq!(parse_float(".5"), 0.5);
        assert_eq!(parse_float("5."), 5.0);
        assert_eq!(parse_float("1e"), 1.0);
        assert!(parse_float("abc").is_nan());
        assert!(parse_float("").is_nan());
        assert!(parse_float("-").is_nan());

        assert_eq!(parse_int("370"), Some(370));
        assert_eq!(parse_int("10.9"), Some(10));
        assert_eq!(parse_int("-2"), Some(-2));
        assert_eq!(parse_int("BYLAYER"), None);
    }

    #[test]
    fn next_pair_stops_before_zero_marker() {
        let mut reader = DxfReader::new("LINE\n8\nA\n10\n1.0\n0\nENDSEC\n");
        reader.advance();
        let first = reader.next_pair().expect("layer pair");
        assert_eq!(first.code, Some(8));
        assert_eq!(first.value, "A");
        let second = reader.next_pair().expect("x pair");
        assert_eq!(second.code, Some(10));
        assert!(reader.next_pair().is_none());
        assert_eq!(reader.current(), Some("0"));
    }

    #[test]
    fn dangling_code_line_yields_empty_value() {
        let mut reader = DxfReader::new("40");
        let pair = reader.next_pair().expect("pair");
        assert_eq!(pair.code, Some(40));
        assert_eq!(pair.value, "");
        assert!(pair.float().is_nan());
        assert!(reader.current().is_none());
    }

    #[test]
    fn carriage_returns_are_trimmed() {
        let doc = parse("ENTITIES\r\nCIRCLE\r\n10\r\n1\r\n20\r\n2\r\n40\r\n3\r\n0\r\nENDSEC\r\n")
            .expect("parse");
        match &doc.entities()[0] {
            Entity::Circle(circle) => {
                assert_eq!(circle.center, Point2::new(1.0, 2.0));
                assert_eq!(circle.radius, 3.0);
            }
            other => panic!("unexpected entity: {other:?}"),
        }
    }
}
