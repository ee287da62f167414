// crates/cw_foundation/src/float.rs

//! 浮点工具
//!
//! 提供显式时间步进代码中反复出现的浮点操作：
//! 带容差比较、安全除法、字段有限性扫描。
//!
//! 时间比较使用混合容差（绝对 + 相对），因为模拟时钟
//! `t = step × dt` 的量级随运行推进增长。

/// 时间比较的相对容差
pub const TIME_REL_EPS: f64 = 1e-9;

/// 时间比较的绝对容差
pub const TIME_ABS_EPS: f64 = 1e-12;

/// 带容差判断 `a >= b`
#[inline]
pub fn ge_within(a: f64, b: f64) -> bool {
    a >= b - time_eps(a, b)
}

/// 带容差判断 `a <= b`
#[inline]
pub fn le_within(a: f64, b: f64) -> bool {
    a <= b + time_eps(a, b)
}

/// 带容差判断 `a < b`（严格小于，排除容差内相等）
#[inline]
pub fn lt_within(a: f64, b: f64) -> bool {
    a < b - time_eps(a, b)
}

#[inline]
fn time_eps(a: f64, b: f64) -> f64 {
    TIME_ABS_EPS + TIME_REL_EPS * a.abs().max(b.abs()).max(1.0)
}

/// 带绝对容差判断两值接近
#[inline]
pub fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol
}

/// 安全除法：分母绝对值低于阈值时返回零
#[inline]
pub fn safe_div(num: f64, den: f64, min_den: f64) -> f64 {
    if den.abs() < min_den {
        0.0
    } else {
        num / den
    }
}

/// 扫描切片，返回第一个非有限值的下标
pub fn first_non_finite(values: &[f64]) -> Option<usize> {
    values.iter().position(|v| !v.is_finite())
}

/// 判断切片内所有值均有限
#[inline]
pub fn all_finite(values: &[f64]) -> bool {
    first_non_finite(values).is_none()
}
