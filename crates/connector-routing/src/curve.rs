use bytes::{Buf, BufMut, Bytes, BytesMut};
use rust_decimal::Decimal;

use crate::error::CurveError;

/// Magnitude the larger coordinate of a rate curve is anchored at. Keeping
/// both coordinates at or below 10^14 leaves the remaining decimal digits for
/// the fractional part of the derived coordinate.
pub const REFERENCE_AMOUNT: u64 = 100_000_000_000_000;

/// Encoded size of one point: two 16-byte decimals.
const POINT_LEN: usize = 32;

/// Largest scale a decimal may carry.
const MAX_DECIMAL_SCALE: u8 = 28;

/// A breakpoint of a liquidity curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub input: Decimal,
    pub output: Decimal,
}

impl Point {
    pub fn new(input: Decimal, output: Decimal) -> Self {
        Self {
            input: input.normalize(),
            output: output.normalize(),
        }
    }
}

/// A monotonically non-decreasing piecewise-linear mapping from an input
/// (source-side) amount to an output (destination-side) amount.
///
/// Between breakpoints the curve interpolates linearly; outside them it
/// extrapolates with the slope of the nearest segment, never going below
/// zero. Curves are immutable: [`join`](Self::join) and
/// [`shift_x`](Self::shift_x) return new curves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiquidityCurve {
    points: Vec<Point>,
}

impl LiquidityCurve {
    /// Create a curve from breakpoints ordered by strictly increasing input
    /// with non-decreasing, non-negative output.
    pub fn new(points: Vec<Point>) -> Result<Self, CurveError> {
        if points.is_empty() {
            return Err(CurveError::Empty);
        }
        for (index, point) in points.iter().enumerate() {
            if point.input < Decimal::ZERO || point.output < Decimal::ZERO {
                return Err(CurveError::NegativeCoordinate { index });
            }
            if index > 0 {
                let previous = points[index - 1];
                if point.input <= previous.input {
                    return Err(CurveError::UnorderedInput { index });
                }
                if point.output < previous.output {
                    return Err(CurveError::DecreasingOutput { index });
                }
            }
        }
        Ok(Self {
            points: points
                .into_iter()
                .map(|p| Point::new(p.input, p.output))
                .collect(),
        })
    }

    /// Convenience constructor from `(input, output)` pairs.
    pub fn from_pairs<I>(pairs: I) -> Result<Self, CurveError>
    where
        I: IntoIterator<Item = (Decimal, Decimal)>,
    {
        Self::new(pairs.into_iter().map(|(x, y)| Point::new(x, y)).collect())
    }

    /// Two-point curve `(0, 0) -> (X, Y)` approximating a pure exchange rate.
    ///
    /// The larger coordinate is pinned at [`REFERENCE_AMOUNT`] and the other one is
    /// derived from it, so neither exceeds the reference amount.
    pub fn from_rate(rate: Decimal) -> Result<Self, CurveError> {
        if rate <= Decimal::ZERO {
            return Err(CurveError::InvalidRate(rate));
        }
        let reference = Decimal::from(REFERENCE_AMOUNT);
        let end = if rate > Decimal::ONE {
            Point::new(reference / rate, reference)
        } else {
            Point::new(reference, reference * rate)
        };
        Ok(Self {
            points: vec![Point::new(Decimal::ZERO, Decimal::ZERO), end],
        })
    }

    /// The ordered breakpoints.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Evaluate the curve at `input`. No rounding is applied.
    pub fn amount_at(&self, input: Decimal) -> Decimal {
        if self.points.len() == 1 {
            return self.points[0].output;
        }
        let (from, to) = self.segment_for_input(input);
        interpolate(from.input, from.output, to.input, to.output, input).max(Decimal::ZERO)
    }

    /// The smallest input at which the curve reaches `output`, or `None` if
    /// the curve levels off below it.
    pub fn amount_reverse(&self, output: Decimal) -> Option<Decimal> {
        let points = &self.points;
        let len = points.len();
        if len == 1 {
            return (output <= points[0].output).then_some(points[0].input);
        }

        // First breakpoint whose output reaches the target.
        let idx = points.partition_point(|p| p.output < output);
        let (from, to) = if idx == 0 {
            if output == points[0].output {
                return Some(points[0].input);
            }
            (points[0], points[1])
        } else if idx == len {
            (points[len - 2], points[len - 1])
        } else {
            (points[idx - 1], points[idx])
        };

        if to.output == from.output {
            // Flat segment: nothing beyond the tail, nothing cheaper below the head.
            return if idx == len { None } else { Some(from.input) };
        }
        Some(interpolate(from.output, from.input, to.output, to.input, output).max(Decimal::ZERO))
    }

    /// Compose two curves: the result maps an input of `self` to the output of
    /// `other` fed with `self`'s output, i.e. `other ∘ self`.
    ///
    /// Breakpoints are `self`'s breakpoints plus `other`'s breakpoints carried
    /// back into `self`'s input domain, so the result is exact between them.
    pub fn join(&self, other: &LiquidityCurve) -> LiquidityCurve {
        let mut inputs: Vec<Decimal> = self.points.iter().map(|p| p.input).collect();
        inputs.extend(
            other
                .points
                .iter()
                .filter_map(|p| self.amount_reverse(p.input)),
        );
        inputs.sort();
        inputs.dedup();

        let mut points = Vec::with_capacity(inputs.len());
        let mut floor = Decimal::ZERO;
        for input in inputs {
            // Running max absorbs last-digit rounding so the output never dips.
            let output = other.amount_at(self.amount_at(input)).max(floor);
            floor = output;
            points.push(Point::new(input, output));
        }
        LiquidityCurve { points }
    }

    /// Shift every input coordinate right by `dx`; outputs are unchanged.
    pub fn shift_x(&self, dx: u64) -> LiquidityCurve {
        let dx = Decimal::from(dx);
        LiquidityCurve {
            points: self
                .points
                .iter()
                .map(|p| Point::new(p.input + dx, p.output))
                .collect(),
        }
    }

    /// Canonical encoding: big-endian `u32` point count, then each point's
    /// normalized input and output as 16-byte decimals.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(4 + self.points.len() * POINT_LEN);
        buf.put_u32(self.points.len() as u32);
        for point in &self.points {
            buf.put_slice(&point.input.serialize());
            buf.put_slice(&point.output.serialize());
        }
        buf.freeze()
    }

    /// Decode a curve produced by [`to_bytes`](Self::to_bytes).
    pub fn from_bytes(mut buf: &[u8]) -> Result<Self, CurveError> {
        if buf.remaining() < 4 {
            return Err(CurveError::Malformed("missing point count".into()));
        }
        let count = buf.get_u32() as usize;
        let expected = count
            .checked_mul(POINT_LEN)
            .ok_or_else(|| CurveError::Malformed(format!("point count too large: {}", count)))?;
        if buf.remaining() != expected {
            return Err(CurveError::Malformed(format!(
                "expected {} bytes for {} points, found {}",
                expected,
                count,
                buf.remaining()
            )));
        }

        let mut points = Vec::with_capacity(count);
        for _ in 0..count {
            let mut input = [0u8; 16];
            let mut output = [0u8; 16];
            buf.copy_to_slice(&mut input);
            buf.copy_to_slice(&mut output);
            points.push(Point::new(decode_decimal(input)?, decode_decimal(output)?));
        }
        Self::new(points)
    }

    fn segment_for_input(&self, input: Decimal) -> (Point, Point) {
        let len = self.points.len();
        let idx = self
            .points
            .partition_point(|p| p.input <= input)
            .clamp(1, len - 1);
        (self.points[idx - 1], self.points[idx])
    }
}

/// Decode one 16-byte decimal, accepting only the normalized form
/// [`LiquidityCurve::to_bytes`] writes.
fn decode_decimal(raw: [u8; 16]) -> Result<Decimal, CurveError> {
    // Flags word: bytes 0-1 unused, byte 2 scale, byte 3 sign in the top bit.
    if raw[0] != 0 || raw[1] != 0 || raw[3] & 0x7f != 0 || raw[2] > MAX_DECIMAL_SCALE {
        return Err(CurveError::Malformed(format!(
            "invalid decimal flags {:02x?}",
            &raw[..4]
        )));
    }
    let value = Decimal::deserialize(raw);
    if value.normalize().serialize() != raw {
        return Err(CurveError::Malformed(format!(
            "non-canonical decimal encoding of {}",
            value
        )));
    }
    Ok(value)
}

/// Linear interpolation through `(x0, y0)` and `(x1, y1)` evaluated at `x`,
/// saturating at the decimal range instead of overflowing.
fn interpolate(x0: Decimal, y0: Decimal, x1: Decimal, y1: Decimal, x: Decimal) -> Decimal {
    let rise = y1 - y0;
    let run = x1 - x0;
    let offset = x - x0;
    let delta = offset
        .checked_mul(rise)
        .and_then(|v| v.checked_div(run))
        .or_else(|| rise.checked_div(run).and_then(|slope| slope.checked_mul(offset)));
    match delta.and_then(|d| y0.checked_add(d)) {
        Some(value) => value,
        None if offset.is_sign_negative() => Decimal::MIN,
        None => Decimal::MAX,
    }
}
