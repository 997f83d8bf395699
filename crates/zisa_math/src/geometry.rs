// crates/zisa_math/src/geometry.rs

//! 二维几何原语
//!
//! 三角形、边、旋转以及用于模板搜索的区域（锥形、全平面、半平面）。
//!
//! 三角形按逆时针方向存储时，边 `a -> b` 的法向量 `rotate_right(b - a)`
//! 指向三角形外侧。

use glam::DVec2;

/// 逆时针旋转 90°
#[inline]
pub fn rotate_left(v: DVec2) -> DVec2 {
    DVec2::new(-v.y, v.x)
}

/// 顺时针旋转 90°
#[inline]
pub fn rotate_right(v: DVec2) -> DVec2 {
    DVec2::new(v.y, -v.x)
}

/// 二维叉积（z 分量）
#[inline]
pub fn cross(a: DVec2, b: DVec2) -> f64 {
    a.x * b.y - a.y * b.x
}

// ============================================================================
// 三角形
// ============================================================================

/// 三角形
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    /// 顶点 A
    pub a: DVec2,
    /// 顶点 B
    pub b: DVec2,
    /// 顶点 C
    pub c: DVec2,
}

impl Triangle {
    /// 由三个顶点创建
    pub fn new(a: DVec2, b: DVec2, c: DVec2) -> Self {
        Self { a, b, c }
    }

    /// 参考三角形 (0,0), (1,0), (0,1)
    pub fn reference() -> Self {
        Self::new(DVec2::ZERO, DVec2::X, DVec2::Y)
    }

    /// 三条边长 (|BC|, |AC|, |AB|)
    #[inline]
    pub fn side_lengths(&self) -> [f64; 3] {
        [
            self.b.distance(self.c),
            self.a.distance(self.c),
            self.a.distance(self.b),
        ]
    }

    /// 有向面积，逆时针为正
    #[inline]
    pub fn signed_area(&self) -> f64 {
        0.5 * cross(self.b - self.a, self.c - self.a)
    }

    /// 面积（海伦公式）
    pub fn area(&self) -> f64 {
        let [a, b, c] = self.side_lengths();
        herons_formula(a, b, c)
    }

    /// 重心
    #[inline]
    pub fn barycenter(&self) -> DVec2 {
        (self.a + self.b + self.c) / 3.0
    }

    /// 重心到顶点的最大距离
    pub fn circum_radius(&self) -> f64 {
        let c = self.barycenter();
        self.a
            .distance(c)
            .max(self.b.distance(c))
            .max(self.c.distance(c))
    }

    /// 内切圆半径
    pub fn inradius(&self) -> f64 {
        let [a, b, c] = self.side_lengths();
        0.5 * ((b + c - a) * (c + a - b) * (a + b - c) / (a + b + c)).sqrt()
    }

    /// 特征长度，用于多项式坐标归一化
    #[inline]
    pub fn characteristic_length(&self) -> f64 {
        self.circum_radius()
    }

    /// 是否逆时针
    #[inline]
    pub fn is_counter_clockwise(&self) -> bool {
        self.signed_area() > 0.0
    }

    /// 笛卡尔坐标转重心坐标 (λ_A, λ_B, λ_C)
    pub fn barycentric(&self, x: DVec2) -> [f64; 3] {
        let ba = self.b - self.a;
        let ca = self.c - self.a;
        let xa = x - self.a;
        let inv = 1.0 / cross(ba, ca);
        let lb = cross(xa, ca) * inv;
        let lc = cross(ba, xa) * inv;
        [1.0 - lb - lc, lb, lc]
    }

    /// 重心坐标转笛卡尔坐标
    #[inline]
    pub fn coord(&self, lambda: [f64; 3]) -> DVec2 {
        self.a * lambda[0] + self.b * lambda[1] + self.c * lambda[2]
    }

    /// 点是否在三角形内（允许 `tol` 的负重心坐标）
    pub fn contains(&self, x: DVec2, tol: f64) -> bool {
        self.barycentric(x).iter().all(|&l| l >= -tol)
    }

    /// 第 `k` 条边，从顶点 `k` 到顶点 `k+1`
    pub fn edge(&self, k: usize) -> Edge {
        let v = self.vertices();
        Edge::new(v[k % 3], v[(k + 1) % 3])
    }

    /// 顶点数组
    #[inline]
    pub fn vertices(&self) -> [DVec2; 3] {
        [self.a, self.b, self.c]
    }
}

/// 海伦公式
pub fn herons_formula(a: f64, b: f64, c: f64) -> f64 {
    // 数值稳定形式，要求 a >= b >= c
    let mut s = [a, b, c];
    s.sort_by(|x, y| y.total_cmp(x));
    let [a, b, c] = s;
    0.25 * ((a + (b + c)) * (c - (a - b)) * (c + (a - b)) * (a + (b - c)))
        .max(0.0)
        .sqrt()
}

// ============================================================================
// 边
// ============================================================================

/// 有向线段
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    /// 起点
    pub start: DVec2,
    /// 终点
    pub end: DVec2,
}

impl Edge {
    /// 创建边
    pub fn new(start: DVec2, end: DVec2) -> Self {
        Self { start, end }
    }

    /// 边长
    #[inline]
    pub fn length(&self) -> f64 {
        self.start.distance(self.end)
    }

    /// 中点
    #[inline]
    pub fn midpoint(&self) -> DVec2 {
        0.5 * (self.start + self.end)
    }

    /// 单位切向量
    #[inline]
    pub fn tangential(&self) -> DVec2 {
        (self.end - self.start).normalize()
    }

    /// 单位法向量（切向量顺时针旋转）
    #[inline]
    pub fn normal(&self) -> DVec2 {
        rotate_right(self.tangential())
    }

    /// 参考坐标 `xi ∈ [-1, 1]` 映射到边上
    #[inline]
    pub fn coord(&self, xi: f64) -> DVec2 {
        (0.5 - 0.5 * xi) * self.start + (0.5 + 0.5 * xi) * self.end
    }

    /// 相对于内部一点的单位外法向
    pub fn outward_normal(&self, inside: DVec2) -> DVec2 {
        let n = self.normal();
        if n.dot(self.start - inside) >= 0.0 {
            n
        } else {
            -n
        }
    }

    /// 点到线段的距离
    pub fn distance(&self, x: DVec2) -> f64 {
        let d = self.end - self.start;
        let len2 = d.length_squared();
        if len2 == 0.0 {
            return x.distance(self.start);
        }
        let t = ((x - self.start).dot(d) / len2).clamp(0.0, 1.0);
        x.distance(self.start + t * d)
    }
}

// ============================================================================
// 区域
// ============================================================================

/// 平面区域，用于模板候选单元的筛选
pub trait Region: Send + Sync {
    /// 点是否在区域内
    fn is_inside(&self, x: DVec2) -> bool;
}

/// 以 `apex` 为顶点的锥形区域
#[derive(Debug, Clone, Copy)]
pub struct Cone {
    apex: DVec2,
    dir: DVec2,
    cos_angle: f64,
}

impl Cone {
    /// 由 `A`、顶点 `X`、`B` 张成的锥形
    pub fn from_points(a: DVec2, x: DVec2, b: DVec2) -> Self {
        let da = (a - x).normalize();
        let db = (b - x).normalize();
        let dir = (da + db).normalize();
        Self {
            apex: x,
            dir,
            cos_angle: da.dot(dir),
        }
    }

    /// 直接给定方向与半角余弦
    pub fn new(apex: DVec2, dir: DVec2, cos_angle: f64) -> Self {
        Self {
            apex,
            dir: dir.normalize(),
            cos_angle,
        }
    }

    /// 锥顶
    pub fn apex(&self) -> DVec2 {
        self.apex
    }
}

impl Region for Cone {
    fn is_inside(&self, y: DVec2) -> bool {
        self.dir.dot((y - self.apex).normalize_or_zero()) > self.cos_angle
    }
}

/// 整个平面
#[derive(Debug, Clone, Copy, Default)]
pub struct FullSphere;

impl Region for FullSphere {
    fn is_inside(&self, _x: DVec2) -> bool {
        true
    }
}

/// 半平面 `dot(x - origin, normal) > 0`
#[derive(Debug, Clone, Copy)]
pub struct HalfPlane {
    origin: DVec2,
    normal: DVec2,
}

impl HalfPlane {
    /// 创建半平面
    pub fn new(origin: DVec2, normal: DVec2) -> Self {
        Self { origin, normal }
    }
}

impl Region for HalfPlane {
    fn is_inside(&self, x: DVec2) -> bool {
        (x - self.origin).dot(self.normal) > 0.0
    }
}

/// 圆盘
#[derive(Debug, Clone, Copy)]
pub struct Ball {
    center: DVec2,
    radius: f64,
}

impl Ball {
    /// 创建圆盘
    pub fn new(center: DVec2, radius: f64) -> Self {
        Self { center, radius }
    }
}

impl Region for Ball {
    fn is_inside(&self, x: DVec2) -> bool {
        x.distance(self.center) < self.radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triangle_area_and_orientation() {
        let tri = Triangle::reference();
        assert!((tri.area() - 0.5).abs() < 1e-14);
        assert!(tri.is_counter_clockwise());

        let flipped = Triangle::new(tri.a, tri.c, tri.b);
        assert!(!flipped.is_counter_clockwise());
        assert!((flipped.area() - 0.5).abs() < 1e-14);
    }

    #[test]
    fn test_inradius_of_equilateral() {
        let h = 3.0_f64.sqrt() / 2.0;
        let tri = Triangle::new(DVec2::ZERO, DVec2::X, DVec2::new(0.5, h));
        let expected = 1.0 / (2.0 * 3.0_f64.sqrt());
        assert!((tri.inradius() - expected).abs() < 1e-12);
        assert!((tri.circum_radius() - 1.0 / 3.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_barycentric_roundtrip() {
        let tri = Triangle::new(
            DVec2::new(0.3, -0.1),
            DVec2::new(1.2, 0.4),
            DVec2::new(-0.2, 0.9),
        );
        let x = DVec2::new(0.4, 0.35);
        let lambda = tri.barycentric(x);
        assert!((lambda.iter().sum::<f64>() - 1.0).abs() < 1e-14);
        assert!(tri.coord(lambda).distance(x) < 1e-14);
        assert!(tri.contains(x, 0.0));
        assert!(!tri.contains(DVec2::new(5.0, 5.0), 0.0));
    }

    #[test]
    fn test_edge_normal_points_outward() {
        let tri = Triangle::reference();
        let center = tri.barycenter();
        for k in 0..3 {
            let e = tri.edge(k);
            assert!(e.normal().dot(e.midpoint() - center) > 0.0);
            assert_eq!(e.outward_normal(center), e.normal());
        }
    }

    #[test]
    fn test_edge_coord_endpoints() {
        let e = Edge::new(DVec2::new(1.0, 2.0), DVec2::new(3.0, 2.0));
        assert_eq!(e.coord(-1.0), e.start);
        assert_eq!(e.coord(1.0), e.end);
        assert_eq!(e.coord(0.0), e.midpoint());
        assert!((e.distance(DVec2::new(2.0, 3.0)) - 1.0).abs() < 1e-14);
    }

    #[test]
    fn test_cone() {
        let cone = Cone::from_points(DVec2::new(1.0, 1.0), DVec2::ZERO, DVec2::new(1.0, -1.0));
        assert!(cone.is_inside(DVec2::new(2.0, 0.0)));
        assert!(cone.is_inside(DVec2::new(2.0, 1.5)));
        assert!(!cone.is_inside(DVec2::new(-1.0, 0.0)));
        assert!(!cone.is_inside(DVec2::new(0.1, 1.0)));
        assert!(FullSphere.is_inside(DVec2::new(-1e9, 3.0)));
    }

    #[test]
    fn test_rotations() {
        let v = DVec2::new(1.0, 0.0);
        assert_eq!(rotate_left(v), DVec2::new(0.0, 1.0));
        assert_eq!(rotate_right(v), DVec2::new(0.0, -1.0));
        assert_eq!(rotate_left(rotate_right(v)), v);
    }
}
