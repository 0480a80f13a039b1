//! Polynomial primitive (L0) and its 4-D (x, y, z, yaw) aggregate.
//!
//! Represented as up to 8 monomial coefficients (constant-first), evaluated
//! by Horner's method. Root-finding is closed-form up to degree 3 (Cardano
//! for the cubic); degree 4 and above return [`ShowError::Unimplemented`]
//! rather than pulling in an iterative solver, matching the file format's
//! current cap of cubic Bezier segments.

use num_traits::Float;

use crate::error::{Result, ShowError};

/// Maximum number of monomial coefficients a [`Polynomial`] can hold.
pub const MAX_COEFFICIENTS: usize = 8;

const EPSILON: f32 = 1e-6;

/// Horner's method over any [`Float`], constant-first coefficients.
fn horner<T: Float>(coeffs: &[T], t: T) -> T {
    coeffs
        .iter()
        .rev()
        .fold(T::zero(), |acc, &c| acc * t + c)
}

/// A 1-D polynomial of degree `<= 7` in monomial form, constant term first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Polynomial {
    coeffs: [f32; MAX_COEFFICIENTS],
    /// Number of valid entries in `coeffs` (not the same as degree + 1,
    /// since trailing coefficients may be negligible).
    len: usize,
}

impl Default for Polynomial {
    fn default() -> Self {
        Self::zero()
    }
}

impl Polynomial {
    /// The zero polynomial.
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            coeffs: [0.0; MAX_COEFFICIENTS],
            len: 0,
        }
    }

    /// A constant polynomial.
    #[must_use]
    pub const fn constant(value: f32) -> Self {
        let mut coeffs = [0.0; MAX_COEFFICIENTS];
        coeffs[0] = value;
        Self { coeffs, len: 1 }
    }

    /// Builds a polynomial from up to [`MAX_COEFFICIENTS`] coefficients,
    /// constant term first. Extra entries are ignored.
    #[must_use]
    pub fn from_slice(values: &[f32]) -> Self {
        let mut coeffs = [0.0; MAX_COEFFICIENTS];
        let len = values.len().min(MAX_COEFFICIENTS);
        coeffs[..len].copy_from_slice(&values[..len]);
        Self { coeffs, len }
    }

    /// The raw coefficient slice (constant term first), including
    /// negligible trailing entries up to the stored length.
    #[must_use]
    pub fn coefficients(&self) -> &[f32] {
        &self.coeffs[..self.len]
    }

    /// Degree: the index of the highest coefficient whose magnitude is not
    /// negligible (below `f32::EPSILON` counts as zero). The zero
    /// polynomial has degree 0.
    #[must_use]
    pub fn degree(&self) -> usize {
        for i in (0..self.len).rev() {
            if self.coeffs[i].abs() > EPSILON {
                return i;
            }
        }
        0
    }

    /// Evaluates the polynomial at `t` using Horner's method, in `f32`.
    #[must_use]
    pub fn evaluate(&self, t: f32) -> f32 {
        horner(&self.coeffs[..self.len], t)
    }

    /// Evaluates the polynomial at `t` using Horner's method, in `f64`,
    /// for callers that need extra precision (e.g. root refinement).
    #[must_use]
    pub fn evaluate_f64(&self, t: f64) -> f64 {
        let coeffs: [f64; MAX_COEFFICIENTS] = {
            let mut out = [0.0f64; MAX_COEFFICIENTS];
            for (o, &c) in out.iter_mut().zip(self.coeffs.iter()) {
                *o = f64::from(c);
            }
            out
        };
        horner(&coeffs[..self.len], t)
    }

    /// Returns the derivative polynomial, `d/dt p(t)`.
    #[must_use]
    pub fn derivative(&self) -> Self {
        if self.len <= 1 {
            return Self::zero();
        }
        let mut out = Self::zero();
        for i in 1..self.len {
            out.coeffs[i - 1] = self.coeffs[i] * i as f32;
        }
        out.len = self.len - 1;
        out
    }

    /// Scales the polynomial's *output* by `factor`: `(k p)(t) = k * p(t)`.
    #[must_use]
    pub fn scale(&self, factor: f32) -> Self {
        let mut out = *self;
        for c in &mut out.coeffs[..out.len] {
            *c *= factor;
        }
        out
    }

    /// Stretches the polynomial's *input* by `factor`: replaces `t` with
    /// `t / factor`, i.e. multiplies coefficient `i` by `factor^(-i)`.
    #[must_use]
    pub fn stretch(&self, factor: f32) -> Self {
        if factor == 0.0 {
            return *self;
        }
        let mut out = *self;
        let inv = 1.0 / factor;
        let mut pow = 1.0f32;
        for c in &mut out.coeffs[..out.len] {
            *c *= pow;
            pow *= inv;
        }
        out
    }

    /// Converts a Bezier curve (given by its control points, including the
    /// starting point) over `[0, duration]` into monomial form.
    ///
    /// Degrees 0..=3 use closed-form conversion; higher degrees use the
    /// general factorial-weighted finite-difference formula and are then
    /// `stretch`ed by `duration`.
    #[must_use]
    pub fn from_bezier(control_points: &[f32], duration: f32) -> Self {
        let n = control_points.len().saturating_sub(1);
        let monomial_unit: Self = match n {
            0 => Self::constant(control_points[0]),
            1 => {
                let p0 = control_points[0];
                let p1 = control_points[1];
                Self::from_slice(&[p0, p1 - p0])
            }
            2 => {
                let (p0, p1, p2) = (control_points[0], control_points[1], control_points[2]);
                Self::from_slice(&[p0, 2.0 * (p1 - p0), p0 - 2.0 * p1 + p2])
            }
            3 => {
                let (p0, p1, p2, p3) = (
                    control_points[0],
                    control_points[1],
                    control_points[2],
                    control_points[3],
                );
                Self::from_slice(&[
                    p0,
                    3.0 * (p1 - p0),
                    3.0 * (p0 - 2.0 * p1 + p2),
                    -p0 + 3.0 * p1 - 3.0 * p2 + p3,
                ])
            }
            _ => Self::from_bezier_general(control_points),
        };
        if duration > 0.0 {
            monomial_unit.stretch(duration)
        } else {
            monomial_unit
        }
    }

    /// General-degree Bezier-to-monomial conversion via forward
    /// differences scaled by falling factorials:
    /// `c_i = (n! / (n - i)!) * Delta^i p0`.
    fn from_bezier_general(control_points: &[f32]) -> Self {
        let n = control_points.len() - 1;
        // `diffs[k]` holds the k-th forward difference table, reused in
        // place the way a de Casteljau/finite-difference pass usually is.
        let mut diffs = control_points.to_vec();
        let mut coeffs = [0.0f32; MAX_COEFFICIENTS];
        coeffs[0] = diffs[0];
        let mut falling_factorial = 1.0f32;
        for i in 1..=n.min(MAX_COEFFICIENTS - 1) {
            for k in 0..(diffs.len() - 1) {
                diffs[k] = diffs[k + 1] - diffs[k];
            }
            diffs.truncate(diffs.len() - 1);
            falling_factorial *= (n - i + 1) as f32;
            coeffs[i] = falling_factorial / factorial(i) * diffs[0];
        }
        Self::from_slice(&coeffs[..=n.min(MAX_COEFFICIENTS - 1)])
    }

    /// Minimum and maximum value over `t in [0, 1]`.
    #[must_use]
    pub fn extrema_unit_interval(&self) -> (f32, f32) {
        let degree = self.degree();
        if degree <= 1 {
            let p0 = self.evaluate(0.0);
            let p1 = self.evaluate(1.0);
            return if p0 <= p1 { (p0, p1) } else { (p1, p0) };
        }
        let mut lo = self.evaluate(0.0).min(self.evaluate(1.0));
        let mut hi = self.evaluate(0.0).max(self.evaluate(1.0));
        let derivative = self.derivative();
        for root in derivative.solve(0.0).into_iter().flatten() {
            if (0.0..=1.0).contains(&root) {
                let v = self.evaluate(root);
                lo = lo.min(v);
                hi = hi.max(v);
            }
        }
        (lo, hi)
    }

    /// Solves `p(t) = rhs` in closed form for degree `<= 3`.
    ///
    /// Returns all real roots found (unsorted, duplicates possible for a
    /// repeated root); callers filter to `[0, 1]` and take the smallest
    /// when they need a single "touch time". Degree `> 3` returns
    /// [`ShowError::Unimplemented`].
    pub fn solve(&self, rhs: f32) -> Result<RootSet> {
        let degree = self.degree();
        match degree {
            0 => Ok(RootSet::none()),
            1 => {
                let a = self.coeffs[1];
                let b = self.coeffs[0] - rhs;
                Ok(RootSet::one(-b / a))
            }
            2 => Ok(solve_quadratic(
                self.coeffs[2],
                self.coeffs[1],
                self.coeffs[0] - rhs,
            )),
            3 => Ok(solve_cubic(
                self.coeffs[3],
                self.coeffs[2],
                self.coeffs[1],
                self.coeffs[0] - rhs,
            )),
            _ => Err(ShowError::Unimplemented(
                "polynomial degree > 3 has no closed-form solver",
            )),
        }
    }

    /// Returns whether the curve (parameterized over `[0, 1]`) reaches
    /// `value`, and if so, the smallest such `t`.
    ///
    /// Tries a fast monotonicity check first (degree `<= 1`, or a
    /// sign-definite derivative meaning the curve is monotone over
    /// `[0, 1]` and so crosses `value` at most once); falls back to
    /// [`Self::solve`] otherwise.
    pub fn touches(&self, value: f32) -> Result<Option<f32>> {
        let degree = self.degree();
        if degree <= 1 {
            let p0 = self.evaluate(0.0);
            let p1 = self.evaluate(1.0);
            if (p0 - value).abs() <= EPSILON {
                return Ok(Some(0.0));
            }
            if (p1 - p0).abs() <= EPSILON {
                return Ok(None);
            }
            let t = (value - p0) / (p1 - p0);
            return Ok((0.0..=1.0).contains(&t).then_some(t));
        }
        let derivative = self.derivative();
        let (dmin, dmax) = derivative.extrema_unit_interval();
        let monotone = dmin >= -EPSILON || dmax <= EPSILON;
        if monotone {
            let p0 = self.evaluate(0.0);
            let p1 = self.evaluate(1.0);
            let (lo, hi) = if p0 <= p1 { (p0, p1) } else { (p1, p0) };
            if value < lo - EPSILON || value > hi + EPSILON {
                return Ok(None);
            }
        }
        let roots = self.solve(value)?;
        let smallest = roots
            .into_iter()
            .flatten()
            .filter(|t| (-EPSILON..=1.0 + EPSILON).contains(t))
            .map(|t| t.clamp(0.0, 1.0))
            .fold(None, |acc: Option<f32>, t| match acc {
                Some(cur) if cur <= t => Some(cur),
                _ => Some(t),
            });
        Ok(smallest)
    }
}

fn factorial(n: usize) -> f32 {
    (1..=n).fold(1.0f32, |acc, v| acc * v as f32)
}

/// Up to three real roots, as returned by [`Polynomial::solve`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RootSet {
    roots: [f32; 3],
    len: usize,
}

impl RootSet {
    const fn none() -> Self {
        Self {
            roots: [0.0; 3],
            len: 0,
        }
    }

    fn one(r: f32) -> Self {
        let mut s = Self::none();
        s.roots[0] = r;
        s.len = 1;
        s
    }

    fn push(&mut self, r: f32) {
        if self.len < self.roots.len() {
            self.roots[self.len] = r;
            self.len += 1;
        }
    }

    /// The roots as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.roots[..self.len]
    }
}

impl IntoIterator for RootSet {
    type Item = f32;
    type IntoIter = core::iter::Take<core::array::IntoIter<f32, 3>>;

    fn into_iter(self) -> Self::IntoIter {
        self.roots.into_iter().take(self.len)
    }
}

fn solve_quadratic(a: f32, b: f32, c: f32) -> RootSet {
    let discriminant = b * b - 4.0 * a * c;
    let mut roots = RootSet::none();
    if discriminant.abs() <= EPSILON {
        roots.push(-b / (2.0 * a));
    } else if discriminant > 0.0 {
        let sqrt_d = discriminant.sqrt();
        roots.push((-b + sqrt_d) / (2.0 * a));
        roots.push((-b - sqrt_d) / (2.0 * a));
    }
    roots
}

/// Depressed-cubic solve via Cardano's formula, handling the
/// three-real-roots (casus irreducibilis) case with the trigonometric
/// substitution rather than complex arithmetic, and the descriptive "one
/// real root" case directly.
fn solve_cubic(a: f32, b: f32, c: f32, d: f32) -> RootSet {
    let (a, b, c, d) = (f64::from(a), f64::from(b), f64::from(c), f64::from(d));
    // Normalize to t^3 + p t + q by substituting t = x - b/(3a).
    let b = b / a;
    let c = c / a;
    let d = d / a;
    let shift = b / 3.0;
    let p = c - b * b / 3.0;
    let q = 2.0 * b * b * b / 27.0 - b * c / 3.0 + d;

    let mut roots = RootSet::none();
    let discriminant = (q / 2.0).powi(2) + (p / 3.0).powi(3);
    if discriminant > 1e-12 {
        let sqrt_disc = discriminant.sqrt();
        let u = cbrt(-q / 2.0 + sqrt_disc);
        let v = cbrt(-q / 2.0 - sqrt_disc);
        roots.push((u + v - shift) as f32);
    } else if discriminant.abs() <= 1e-12 {
        if p.abs() <= 1e-12 {
            roots.push(-shift as f32);
        } else {
            let u = cbrt(-q / 2.0);
            roots.push((2.0 * u - shift) as f32);
            roots.push((-u - shift) as f32);
        }
    } else {
        // Three distinct real roots: trigonometric (Viete) substitution.
        let r = 2.0 * (-p / 3.0).sqrt();
        let phi = ((3.0 * q) / (p * r)).clamp(-1.0, 1.0).acos() / 3.0;
        for k in 0..3 {
            let angle = phi - 2.0 * core::f64::consts::PI * k as f64 / 3.0;
            roots.push((r * angle.cos() - shift) as f32);
        }
    }
    roots
}

fn cbrt(x: f64) -> f64 {
    if x < 0.0 { -(-x).powf(1.0 / 3.0) } else { x.powf(1.0 / 3.0) }
}

/// Segment kind for one axis of a trajectory segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// No control points in the body; the axis is held constant.
    Constant,
    /// One control point (the endpoint).
    Linear,
    /// Two control points.
    QuadraticBezier,
    /// Three control points.
    CubicBezier,
}

impl SegmentKind {
    /// Decodes a 2-bit field value.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => Self::Constant,
            1 => Self::Linear,
            2 => Self::QuadraticBezier,
            _ => Self::CubicBezier,
        }
    }

    /// Encodes back to a 2-bit field value.
    #[must_use]
    pub const fn to_bits(self) -> u8 {
        match self {
            Self::Constant => 0,
            Self::Linear => 1,
            Self::QuadraticBezier => 2,
            Self::CubicBezier => 3,
        }
    }

    /// Number of intermediate control points this kind carries in the
    /// segment body (the starting control point is always implicit).
    #[must_use]
    pub const fn control_point_count(self) -> usize {
        match self {
            Self::Constant => 0,
            Self::Linear => 1,
            Self::QuadraticBezier => 2,
            Self::CubicBezier => 3,
        }
    }
}

/// Four polynomials (x, y, z, yaw) sharing one local parameter `u`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Poly4D {
    /// X-axis polynomial.
    pub x: Polynomial,
    /// Y-axis polynomial.
    pub y: Polynomial,
    /// Z-axis polynomial.
    pub z: Polynomial,
    /// Yaw polynomial.
    pub yaw: Polynomial,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn horner_matches_naive_evaluation() {
        let p = Polynomial::from_slice(&[1.0, 2.0, 3.0]); // 1 + 2t + 3t^2
        assert!((p.evaluate(2.0) - 17.0).abs() < 1e-5);
    }

    #[test]
    fn degree_ignores_negligible_trailing_coefficients() {
        let p = Polynomial::from_slice(&[1.0, 0.0, 0.0]);
        assert_eq!(p.degree(), 0);
        let p = Polynomial::from_slice(&[1.0, 2.0, 0.0]);
        assert_eq!(p.degree(), 1);
    }

    #[test]
    fn derivative_of_cubic() {
        let p = Polynomial::from_slice(&[1.0, 2.0, 3.0, 4.0]); // 1+2t+3t^2+4t^3
        let d = p.derivative();
        // 2 + 6t + 12t^2
        assert!((d.evaluate(1.0) - 20.0).abs() < 1e-4);
    }

    #[test]
    fn scale_then_inverse_scale_is_identity() {
        let p = Polynomial::from_slice(&[1.0, -2.0, 3.5]);
        let round_trip = p.scale(4.0).scale(0.25);
        for t in [0.0, 0.3, 1.0, 5.0] {
            assert!((round_trip.evaluate(t) - p.evaluate(t)).abs() < 1e-3);
        }
    }

    #[test]
    fn stretch_then_evaluate_scaled_time_matches_original() {
        let p = Polynomial::from_slice(&[1.0, 2.0, 3.0]);
        let k = 2.0f32;
        let stretched = p.stretch(k);
        for t in [0.0, 0.25, 0.5, 1.0] {
            assert!((stretched.evaluate(k * t) - p.evaluate(t)).abs() < 1e-3);
        }
    }

    #[test]
    fn bezier_conversion_matches_de_casteljau() {
        let control = [0.0f32, 10.0, -5.0, 20.0];
        let p = Polynomial::from_bezier(&control, 1.0);
        for &t in &[0.0f32, 0.25, 0.5, 0.75, 1.0] {
            let expected = de_casteljau(&control, t);
            assert!((p.evaluate(t) - expected).abs() < 1e-2);
        }
    }

    fn de_casteljau(points: &[f32], t: f32) -> f32 {
        let mut pts = points.to_vec();
        while pts.len() > 1 {
            for i in 0..pts.len() - 1 {
                pts[i] = pts[i] * (1.0 - t) + pts[i + 1] * t;
            }
            pts.pop();
        }
        pts[0]
    }

    #[test]
    fn quadratic_roots_are_accurate() {
        // t^2 - 3t + 2 = 0 -> t = 1, 2
        let p = Polynomial::from_slice(&[2.0, -3.0, 1.0]);
        let roots = p.solve(0.0).unwrap();
        for r in roots {
            assert!(p.evaluate(r).abs() < 1e-3);
        }
        assert_eq!(roots.as_slice().len(), 2);
    }

    #[test]
    fn cubic_three_real_roots_all_satisfy_equation() {
        // (t-1)(t-2)(t-3) = t^3 - 6t^2 + 11t - 6
        let p = Polynomial::from_slice(&[-6.0, 11.0, -6.0, 1.0]);
        let roots = p.solve(0.0).unwrap();
        assert_eq!(roots.as_slice().len(), 3);
        for r in roots {
            assert!(p.evaluate(r).abs() < 1e-2, "root {r} not close enough");
        }
    }

    #[test]
    fn cubic_one_real_root() {
        // t^3 + t + 1 = 0, single real root near -0.6823
        let p = Polynomial::from_slice(&[1.0, 1.0, 0.0, 1.0]);
        let roots = p.solve(0.0).unwrap();
        assert_eq!(roots.as_slice().len(), 1);
        assert!(p.evaluate(roots.as_slice()[0]).abs() < 1e-2);
    }

    #[test]
    fn degree_above_three_is_unimplemented() {
        let p = Polynomial::from_slice(&[1.0, 1.0, 1.0, 1.0, 1.0]);
        assert!(matches!(p.solve(0.0), Err(ShowError::Unimplemented(_))));
    }

    #[test]
    fn touches_finds_smallest_crossing() {
        let p = Polynomial::from_slice(&[0.0, 1.0]); // p(t) = t
        assert_eq!(p.touches(0.5).unwrap(), Some(0.5));
        assert_eq!(p.touches(2.0).unwrap(), None);
    }

    #[test]
    fn segment_kind_bit_round_trip() {
        for kind in [
            SegmentKind::Constant,
            SegmentKind::Linear,
            SegmentKind::QuadraticBezier,
            SegmentKind::CubicBezier,
        ] {
            assert_eq!(SegmentKind::from_bits(kind.to_bits()), kind);
        }
    }
}
