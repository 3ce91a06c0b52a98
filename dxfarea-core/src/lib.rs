pub mod geometry {
    use glam::DVec2;
    use serde::{Deserialize, Serialize};

    /// 二维点，内部以 `glam::DVec2` 表示。DXF 中的 Z 值在解析阶段即被丢弃。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point2(pub DVec2);

    impl Point2 {
        pub const ORIGIN: Point2 = Point2(DVec2::ZERO);

        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_vec(vec: DVec2) -> Self {
            Self(vec)
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn translate(self, offset: Vector2) -> Self {
            Self(self.0 + offset.0)
        }

        #[inline]
        pub fn vector_to(self, other: Point2) -> Vector2 {
            Vector2(other.0 - self.0)
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }

        /// 两个分量都为有限值。NaN 坐标视为退化，不参与绘制与范围计算。
        #[inline]
        pub fn is_finite(self) -> bool {
            self.0.is_finite()
        }

        /// 在容差范围内比较（逐分量），用于坐标往返校验。
        #[inline]
        pub fn abs_diff_eq(self, other: Point2, tolerance: f64) -> bool {
            self.0.abs_diff_eq(other.0, tolerance)
        }
    }

    impl From<DVec2> for Point2 {
        fn from(value: DVec2) -> Self {
            Self::from_vec(value)
        }
    }

    impl Default for Point2 {
        fn default() -> Self {
            Self::ORIGIN
        }
    }

    /// 二维向量，用于屏幕空间中的拖拽增量与平移量。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Vector2(pub DVec2);

    impl Vector2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn length_squared(self) -> f64 {
            self.0.length_squared()
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }
    }

    impl From<DVec2> for Vector2 {
        fn from(value: DVec2) -> Self {
            Self(value)
        }
    }

    /// 轴对齐边界框。空框以 `(+inf, +inf) .. (-inf, -inf)` 表示，
    /// 调用方通过 [`Bounds2D::is_finite`] 判断能否用于视口适配。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Bounds2D {
        min: Point2,
        max: Point2,
    }

    impl Bounds2D {
        #[inline]
        pub fn new(min: Point2, max: Point2) -> Self {
            Self { min, max }
        }

        #[inline]
        pub fn empty() -> Self {
            Self {
                min: Point2::new(f64::INFINITY, f64::INFINITY),
                max: Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
            }
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.min.x() > self.max.x() || self.min.y() > self.max.y()
        }

        /// 四个分量都是有限值（空框返回 `false`）。
        #[inline]
        pub fn is_finite(&self) -> bool {
            self.min.is_finite() && self.max.is_finite()
        }

        #[inline]
        pub fn min(&self) -> Point2 {
            self.min
        }

        #[inline]
        pub fn max(&self) -> Point2 {
            self.max
        }

        #[inline]
        pub fn width(&self) -> f64 {
            self.max.x() - self.min.x()
        }

        #[inline]
        pub fn height(&self) -> f64 {
            self.max.y() - self.min.y()
        }

        /// 并入一个点；含 NaN 或无穷分量的点被忽略。
        pub fn include_point(&mut self, point: Point2) {
            if !point.is_finite() {
                return;
            }
            if self.is_empty() {
                self.min = point;
                self.max = point;
                return;
            }
            let min_vec = self.min.as_vec2().min(point.as_vec2());
            let max_vec = self.max.as_vec2().max(point.as_vec2());
            self.min = Point2::from_vec(min_vec);
            self.max = Point2::from_vec(max_vec);
        }

        #[inline]
        pub fn center(&self) -> Point2 {
            debug_assert!(!self.is_empty());
            let center = (self.min.as_vec2() + self.max.as_vec2()) * 0.5;
            Point2::from_vec(center)
        }
    }

    impl Default for Bounds2D {
        fn default() -> Self {
            Self::empty()
        }
    }
}

pub mod document {
    use std::collections::HashMap;

    use serde::{Deserialize, Serialize};

    use crate::geometry::{Bounds2D, Point2};

    /// 未指定图层时使用的默认图层名。
    pub const DEFAULT_LAYER: &str = "0";

    /// 文本范围估算中每个字符的宽度系数（相对于字高）。
    pub const TEXT_WIDTH_FACTOR: f64 = 0.6;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub enum Entity {
        Line(Line),
        Circle(Circle),
        Text(Text),
        MText(Text),
        Polyline(Polyline),
        Insert(Insert),
    }

    impl Entity {
        #[inline]
        pub fn layer_name(&self) -> &str {
            match self {
                Entity::Line(line) => &line.layer,
                Entity::Circle(circle) => &circle.layer,
                Entity::Text(text) | Entity::MText(text) => &text.layer,
                Entity::Polyline(polyline) => &polyline.layer,
                Entity::Insert(insert) => &insert.layer,
            }
        }

        /// AutoCAD 颜色索引（组码 62）。
        #[inline]
        pub fn color(&self) -> Option<i32> {
            match self {
                Entity::Line(line) => line.color,
                Entity::Circle(circle) => circle.color,
                Entity::Text(text) | Entity::MText(text) => text.color,
                Entity::Polyline(polyline) => polyline.color,
                Entity::Insert(insert) => insert.color,
            }
        }

        /// 线宽（组码 370），仅线类实体携带。
        #[inline]
        pub fn line_weight(&self) -> Option<i32> {
            match self {
                Entity::Line(line) => line.line_weight,
                Entity::Circle(circle) => circle.line_weight,
                Entity::Polyline(polyline) => polyline.line_weight,
                Entity::Text(_) | Entity::MText(_) | Entity::Insert(_) => None,
            }
        }

        /// DXF 中的类型关键字。
        pub fn kind_name(&self) -> &'static str {
            match self {
                Entity::Line(_) => "LINE",
                Entity::Circle(_) => "CIRCLE",
                Entity::Text(_) => "TEXT",
                Entity::MText(_) => "MTEXT",
                Entity::Polyline(_) => "POLYLINE",
                Entity::Insert(_) => "INSERT",
            }
        }

        /// 把实体的范围并入 `bounds`。块参照不展开，直接跳过。
        pub fn include_in(&self, bounds: &mut Bounds2D) {
            match self {
                Entity::Line(line) => {
                    bounds.include_point(line.start);
                    bounds.include_point(line.end);
                }
                Entity::Circle(circle) => {
                    if circle.radius == 0.0 || !circle.radius.is_finite() {
                        return;
                    }
                    let radius = circle.radius.abs();
                    let center = circle.center;
                    bounds.include_point(Point2::new(center.x() - radius, center.y() - radius));
                    bounds.include_point(Point2::new(center.x() + radius, center.y() + radius));
                }
                Entity::Polyline(polyline) => {
                    for vertex in &polyline.vertices {
                        bounds.include_point(*vertex);
                    }
                }
                Entity::Text(text) | Entity::MText(text) => {
                    let height = text.effective_height();
                    let width = text.text.chars().count() as f64 * height * TEXT_WIDTH_FACTOR;
                    bounds.include_point(text.start);
                    bounds.include_point(Point2::new(
                        text.start.x() + width,
                        text.start.y() + height,
                    ));
                }
                Entity::Insert(_) => {}
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Line {
        pub start: Point2,
        pub end: Point2,
        pub layer: String,
        pub color: Option<i32>,
        pub line_type: Option<String>,
        pub line_weight: Option<i32>,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Circle {
        pub center: Point2,
        pub radius: f64,
        pub layer: String,
        pub color: Option<i32>,
        pub line_type: Option<String>,
        pub line_weight: Option<i32>,
    }

    /// TEXT 与 MTEXT 共用的单行文本结构。`rotation` 以角度保存，与文件一致。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Text {
        pub start: Point2,
        pub text: String,
        pub height: f64,
        pub rotation: f64,
        pub layer: String,
        pub color: Option<i32>,
    }

    impl Text {
        /// 字高为 0 或 NaN 时退化为 1。
        #[inline]
        pub fn effective_height(&self) -> f64 {
            if self.height == 0.0 || self.height.is_nan() {
                1.0
            } else {
                self.height
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Polyline {
        pub vertices: Vec<Point2>,
        pub layer: String,
        pub color: Option<i32>,
        pub line_type: Option<String>,
        pub line_weight: Option<i32>,
    }

    /// 块参照。块名在绘制时解析，引用不存在的块不是错误。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Insert {
        pub block_name: String,
        pub insertion_point: Point2,
        pub scale_x: f64,
        pub scale_y: f64,
        pub scale_z: f64,
        pub rotation_angle: f64,
        pub layer: String,
        pub color: Option<i32>,
    }

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    pub struct Block {
        pub name: String,
        pub entities: Vec<Entity>,
    }

    impl Block {
        pub fn new(name: impl Into<String>) -> Self {
            Self {
                name: name.into(),
                entities: Vec::new(),
            }
        }
    }

    /// 一次解析的结果。实体保持文件顺序（即绘制顺序）。
    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Document {
        entities: Vec<Entity>,
        blocks: HashMap<String, Block>,
    }

    impl Document {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn add_entity(&mut self, entity: Entity) {
            self.entities.push(entity);
        }

        /// 以块名登记块定义，同名块会被覆盖。
        pub fn add_block(&mut self, block: Block) {
            self.blocks.insert(block.name.clone(), block);
        }

        #[inline]
        pub fn entities(&self) -> &[Entity] {
            &self.entities
        }

        #[inline]
        pub fn entity_count(&self) -> usize {
            self.entities.len()
        }

        #[inline]
        pub fn block(&self, name: &str) -> Option<&Block> {
            self.blocks.get(name)
        }

        #[inline]
        pub fn block_count(&self) -> usize {
            self.blocks.len()
        }

        pub fn bounds(&self) -> Bounds2D {
            bounds(&self.entities)
        }
    }

    /// 计算一组实体的轴对齐范围。没有实体贡献时返回空框（非有限值）。
    pub fn bounds(entities: &[Entity]) -> Bounds2D {
        let mut bounds = Bounds2D::empty();
        for entity in entities {
            entity.include_in(&mut bounds);
        }
        bounds
    }

}

pub mod style {
    //! 绘制样式：AutoCAD 颜色索引与线宽到屏幕样式的映射。

    /// 缺省前景色（深灰），黑色在白色画布上也映射为该值。
    pub const DEFAULT_COLOR: &str = "#1f2937";

    const PALETTE: [&str; 10] = [
        DEFAULT_COLOR,
        "#FF0000",
        "#FFFF00",
        "#00FF00",
        "#00FFFF",
        "#0000FF",
        "#FF00FF",
        DEFAULT_COLOR,
        "#808080",
        "#C0C0C0",
    ];

    /// 颜色索引映射为十六进制颜色，未知索引回退到 [`DEFAULT_COLOR`]。
    pub fn aci_color(index: Option<i32>) -> &'static str {
        match index {
            Some(value) => usize::try_from(value)
                .ok()
                .and_then(|i| PALETTE.get(i).copied())
                .unwrap_or(DEFAULT_COLOR),
            None => DEFAULT_COLOR,
        }
    }

    /// 线宽（百分之一毫米）换算为像素宽度，最小 0.5。
    pub fn line_width(line_weight: Option<i32>, base_width: f64) -> f64 {
        match line_weight {
            None | Some(0) => base_width,
            Some(weight) => {
                const MM_TO_PIXEL: f64 = 0.1;
                (weight as f64 / 100.0 * MM_TO_PIXEL * base_width).max(0.5)
            }
        }
    }

}
