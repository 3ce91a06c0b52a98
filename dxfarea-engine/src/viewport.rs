//! 世界坐标与屏幕坐标之间的变换。
//!
//! 屏幕坐标以画布左上角为原点、Y 轴向下；世界坐标 Y 轴向上。
//! `offset` 在缩放前加到世界坐标上，因此 `-offset` 就是画布中心对应的世界点。

use dxfarea_core::geometry::{Bounds2D, Point2, Vector2};
use glam::{DAffine2, DVec2};
use tracing::debug;

pub const MIN_SCALE: f64 = 0.1;
pub const MAX_SCALE: f64 = 10.0;
/// 适配视口时内容占画布的比例。
pub const FIT_MARGIN: f64 = 0.8;
/// 适配视口时允许的最大放大倍数。
pub const MAX_FIT_SCALE: f64 = 2.0;
pub const ZOOM_IN_FACTOR: f64 = 1.1;
pub const ZOOM_OUT_FACTOR: f64 = 0.9;

/// 画布像素尺寸。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

impl CanvasSize {
    #[inline]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// 宽高都为正的有限值时才能参与变换。
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    #[inline]
    pub fn center(&self) -> Point2 {
        Point2::new(self.width / 2.0, self.height / 2.0)
    }
}

/// 滚轮缩放允许的倍数区间。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomLimits {
    pub min_scale: f64,
    pub max_scale: f64,
}

impl ZoomLimits {
    #[inline]
    pub fn clamp(&self, scale: f64) -> f64 {
        scale.clamp(self.min_scale, self.max_scale)
    }
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self {
            min_scale: MIN_SCALE,
            max_scale: MAX_SCALE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportTransform {
    scale: f64,
    offset: Vector2,
}

impl ViewportTransform {
    #[inline]
    pub fn new(scale: f64, offset: Vector2) -> Self {
        Self { scale, offset }
    }

    #[inline]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    #[inline]
    pub fn offset(&self) -> Vector2 {
        self.offset
    }

    /// 画布尺寸无效时原样返回输入点。
    pub fn world_to_screen(&self, point: Point2, canvas: CanvasSize) -> Point2 {
        if !canvas.is_valid() {
            return point;
        }
        Point2::new(
            (point.x() + self.offset.x()) * self.scale + canvas.width / 2.0,
            canvas.height / 2.0 - (point.y() + self.offset.y()) * self.scale,
        )
    }

    /// `world_to_screen` 的精确逆变换；画布尺寸无效时原样返回输入点。
    pub fn screen_to_world(&self, point: Point2, canvas: CanvasSize) -> Point2 {
        if !canvas.is_valid() {
            return point;
        }
        Self::unproject(point, canvas, self.scale, self.offset)
    }

    /// `world_to_screen` 的仿射矩阵形式，用于串接块参照的局部变换。
    pub fn to_affine(&self, canvas: CanvasSize) -> DAffine2 {
        if !canvas.is_valid() {
            return DAffine2::IDENTITY;
        }
        DAffine2::from_translation(DVec2::new(canvas.width / 2.0, canvas.height / 2.0))
            * DAffine2::from_scale(DVec2::new(self.scale, -self.scale))
            * DAffine2::from_translation(self.offset.as_vec2())
    }

    fn unproject(point: Point2, canvas: CanvasSize, scale: f64, offset: Vector2) -> Point2 {
        Point2::new(
            (point.x() - canvas.width / 2.0) / scale - offset.x(),
            -((point.y() - canvas.height / 2.0) / scale) - offset.y(),
        )
    }

    /// 让 `bounds` 居中并占满画布的 80%（最多放大到 2 倍）。
    ///
    /// 范围宽或高为 0、非有限值，或画布无效时保持不变并返回 `false`。
    pub fn fit_to_bounds(&mut self, bounds: &Bounds2D, canvas: CanvasSize) -> bool {
        let width = bounds.width();
        let height = bounds.height();
        if !canvas.is_valid()
            || !width.is_finite()
            || !height.is_finite()
            || width == 0.0
            || height == 0.0
        {
            debug!(width, height, "范围退化，跳过视口适配");
            return false;
        }

        let scale_x = canvas.width * FIT_MARGIN / width;
        let scale_y = canvas.height * FIT_MARGIN / height;
        let center = bounds.center();
        self.scale = scale_x.min(scale_y).min(MAX_FIT_SCALE);
        self.offset = Vector2::new(-center.x(), -center.y());
        debug!(scale = self.scale, cx = center.x(), cy = center.y(), "视口已适配文档范围");
        true
    }

    /// 以光标为锚点缩放：缩放前后光标下的世界点保持不变。
    ///
    /// `delta_y > 0`（滚轮远离）缩小，否则放大；倍数限制在 `limits` 内。
    /// 返回变换是否实际发生变化。
    pub fn zoom_at(
        &mut self,
        cursor: Point2,
        delta_y: f64,
        canvas: CanvasSize,
        limits: ZoomLimits,
    ) -> bool {
        if !canvas.is_valid() {
            return false;
        }
        let factor = if delta_y > 0.0 {
            ZOOM_OUT_FACTOR
        } else {
            ZOOM_IN_FACTOR
        };
        let new_scale = limits.clamp(self.scale * factor);
        if new_scale == self.scale {
            return false;
        }

        let anchor = self.screen_to_world(cursor, canvas);
        let drifted = Self::unproject(cursor, canvas, new_scale, self.offset);
        self.offset = Vector2::from(self.offset.as_vec2() + (drifted.as_vec2() - anchor.as_vec2()));
        self.scale = new_scale;
        true
    }

    /// 按屏幕位移平移视图。位移相对于上一次采样，多次小位移可直接累加。
    pub fn pan(&mut self, delta: Vector2) -> bool {
        if delta.length_squared() == 0.0 || !delta.as_vec2().is_finite() {
            return false;
        }
        self.offset = Vector2::new(
            self.offset.x() + delta.x() / self.scale,
            self.offset.y() - delta.y() / self.scale,
        );
        true
    }
}

impl Default for ViewportTransform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset: Vector2::new(0.0, 0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CANVAS: CanvasSize = CanvasSize {
        width: 800.0,
        height: 600.0,
    };

    #[test]
    fn world_screen_round_trip() {
        let transforms = [
            ViewportTransform::default(),
            ViewportTransform::new(0.1, Vector2::new(-1234.5, 98.0)),
            ViewportTransform::new(7.3, Vector2::new(0.25, -0.5)),
        ];
        let points = [
            Point2::new(0.0, 0.0),
            Point2::new(-17.5, 3.25),
            Point2::new(1.0e4, -2.0e3),
        ];
        for transform in transforms {
            for point in points {
                let screen = transform.world_to_screen(point, CANVAS);
                let back = transform.screen_to_world(screen, CANVAS);
                assert!(back.abs_diff_eq(point, 1e-6), "{point:?} -> {back:?}");
            }
        }
    }

    #[test]
    fn screen_y_axis_points_down() {
        let transform = ViewportTransform::default();
        assert_eq!(
            transform.world_to_screen(Point2::new(0.0, 0.0), CANVAS),
            Point2::new(400.0, 300.0)
        );
        assert_eq!(
            transform.world_to_screen(Point2::new(10.0, 10.0), CANVAS),
            Point2::new(410.0, 290.0)
        );
    }

    #[test]
    fn affine_form_matches_point_projection() {
        let transform = ViewportTransform::new(0.75, Vector2::new(12.0, -8.0));
        let affine = transform.to_affine(CANVAS);
        for point in [Point2::new(0.0, 0.0), Point2::new(-40.0, 95.5)] {
            let projected = Point2::from_vec(affine.transform_point2(point.as_vec2()));
            assert!(projected.abs_diff_eq(transform.world_to_screen(point, CANVAS), 1e-9));
        }
        assert_eq!(
            transform.to_affine(CanvasSize::new(0.0, 0.0)),
            DAffine2::IDENTITY
        );
    }

    #[test]
    fn invalid_canvas_falls_back_to_identity() {
        let transform = ViewportTransform::new(3.0, Vector2::new(5.0, 5.0));
        let point = Point2::new(12.0, -4.0);
        let empty = CanvasSize::new(0.0, 600.0);
        assert_eq!(transform.world_to_screen(point, empty), point);
        assert_eq!(transform.screen_to_world(point, empty), point);
    }

    #[test]
    fn fit_centers_bounds_and_caps_scale() {
        let mut transform = ViewportTransform::default();
        let bounds = Bounds2D::new(Point2::new(0.0, 0.0), Point2::new(100.0, 50.0));
        assert!(transform.fit_to_bounds(&bounds, CANVAS));
        // min(640/100, 480/50, 2) = 2
        assert_eq!(transform.scale(), 2.0);
        assert_eq!(transform.offset(), Vector2::new(-50.0, -25.0));

        let large = Bounds2D::new(Point2::new(-1000.0, -500.0), Point2::new(1000.0, 500.0));
        assert!(transform.fit_to_bounds(&large, CANVAS));
        assert!((transform.scale() - 0.32).abs() < 1e-12);
        let center = transform.world_to_screen(Point2::new(0.0, 0.0), CANVAS);
        assert!(center.abs_diff_eq(Point2::new(400.0, 300.0), 1e-9));
    }

    #[test]
    fn fit_skips_degenerate_bounds() {
        let mut transform = ViewportTransform::new(1.5, Vector2::new(3.0, 4.0));
        let before = transform;
        let flat = Bounds2D::new(Point2::new(0.0, 5.0), Point2::new(10.0, 5.0));
        assert!(!transform.fit_to_bounds(&flat, CANVAS));
        assert!(!transform.fit_to_bounds(&Bounds2D::empty(), CANVAS));
        let square = Bounds2D::new(Point2::new(0.0, 0.0), Point2::new(1.0, 1.0));
        assert!(!transform.fit_to_bounds(&square, CanvasSize::new(0.0, 0.0)));
        assert_eq!(transform, before);
    }

    #[test]
    fn zoom_keeps_cursor_anchor() {
        let mut transform = ViewportTransform::new(1.7, Vector2::new(-20.0, 35.0));
        let cursor = Point2::new(123.0, 456.0);
        for delta in [-1.0, -1.0, 3.0, -120.0, 1.0] {
            let before = transform.screen_to_world(cursor, CANVAS);
            transform.zoom_at(cursor, delta, CANVAS, ZoomLimits::default());
            let after = transform.screen_to_world(cursor, CANVAS);
            assert!(before.abs_diff_eq(after, 1e-9), "{before:?} != {after:?}");
        }
    }

    #[test]
    fn zoom_factor_depends_on_wheel_direction_and_clamps() {
        let mut transform = ViewportTransform::default();
        let cursor = CANVAS.center();
        assert!(transform.zoom_at(cursor, 1.0, CANVAS, ZoomLimits::default()));
        assert!((transform.scale() - 0.9).abs() < 1e-12);
        assert!(transform.zoom_at(cursor, -1.0, CANVAS, ZoomLimits::default()));
        assert!((transform.scale() - 0.99).abs() < 1e-12);

        let mut transform = ViewportTransform::new(9.5, Vector2::new(0.0, 0.0));
        assert!(transform.zoom_at(cursor, -1.0, CANVAS, ZoomLimits::default()));
        assert_eq!(transform.scale(), MAX_SCALE);
        assert!(!transform.zoom_at(cursor, -1.0, CANVAS, ZoomLimits::default()));

        let mut transform = ViewportTransform::new(0.105, Vector2::new(0.0, 0.0));
        transform.zoom_at(cursor, 1.0, CANVAS, ZoomLimits::default());
        assert_eq!(transform.scale(), MIN_SCALE);
    }

    #[test]
    fn pan_accumulates_screen_deltas() {
        let mut transform = ViewportTransform::new(2.0, Vector2::new(0.0, 0.0));
        assert!(transform.pan(Vector2::new(10.0, 4.0)));
        assert!(transform.pan(Vector2::new(10.0, 4.0)));
        assert_eq!(transform.offset(), Vector2::new(10.0, -4.0));
        assert!(!transform.pan(Vector2::new(0.0, 0.0)));

        // 平移后原点跟随指针移动
        let origin = transform.world_to_screen(Point2::new(0.0, 0.0), CANVAS);
        assert!(origin.abs_diff_eq(Point2::new(420.0, 308.0), 1e-9));
    }
}
