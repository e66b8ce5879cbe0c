use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Add, Mul, Neg, Sub};

use crate::error::{CoreError, Result};

/// Resolution used for values created from floating point seconds.
pub const DEFAULT_TIMESCALE: i32 = 600;

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
enum TimeKind {
    Numeric,
    Invalid,
    Indefinite,
}

/// A rational time value: `value / timescale` seconds.
///
/// Two special values exist next to ordinary numbers. `INVALID` poisons any
/// arithmetic it takes part in, and `INDEFINITE` behaves as positive infinity
/// in comparisons. Equality and ordering use integer cross-multiplication, so
/// `1/2` and `300/600` compare equal without going through `f64`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Time {
    value: i64,
    timescale: i32,
    kind: TimeKind,
}

impl Time {
    pub const ZERO: Self = Self {
        value: 0,
        timescale: 1,
        kind: TimeKind::Numeric,
    };

    pub const INVALID: Self = Self {
        value: 0,
        timescale: 1,
        kind: TimeKind::Invalid,
    };

    pub const INDEFINITE: Self = Self {
        value: 0,
        timescale: 1,
        kind: TimeKind::Indefinite,
    };

    pub fn new(value: i64, timescale: i32) -> Result<Self> {
        if timescale <= 0 {
            return Err(CoreError::NonPositiveTimescale(timescale));
        }
        Ok(Self {
            value,
            timescale,
            kind: TimeKind::Numeric,
        })
    }

    /// Whole seconds.
    pub const fn secs(secs: i64) -> Self {
        Self {
            value: secs,
            timescale: 1,
            kind: TimeKind::Numeric,
        }
    }

    pub const fn from_millis(millis: i64) -> Self {
        Self {
            value: millis,
            timescale: 1000,
            kind: TimeKind::Numeric,
        }
    }

    /// Convert floating point seconds, rounding to the nearest tick of `timescale`.
    /// NaN maps to `INVALID` and positive infinity to `INDEFINITE`.
    pub fn from_seconds(seconds: f64, timescale: i32) -> Result<Self> {
        if timescale <= 0 {
            return Err(CoreError::NonPositiveTimescale(timescale));
        }
        if seconds.is_nan() || seconds == f64::NEG_INFINITY {
            return Ok(Self::INVALID);
        }
        if seconds == f64::INFINITY {
            return Ok(Self::INDEFINITE);
        }
        let ticks = (seconds * timescale as f64).round();
        if ticks < i64::MIN as f64 || ticks >= i64::MAX as f64 {
            return Err(CoreError::TimescaleOverflow(timescale));
        }
        Ok(Self {
            value: ticks as i64,
            timescale,
            kind: TimeKind::Numeric,
        })
    }

    pub fn value(&self) -> i64 {
        self.value
    }

    pub fn timescale(&self) -> i32 {
        self.timescale
    }

    /// Anything but `INVALID`.
    pub fn is_valid(&self) -> bool {
        self.kind != TimeKind::Invalid
    }

    /// A finite number.
    pub fn is_numeric(&self) -> bool {
        self.kind == TimeKind::Numeric
    }

    pub fn is_indefinite(&self) -> bool {
        self.kind == TimeKind::Indefinite
    }

    pub fn is_zero(&self) -> bool {
        self.is_numeric() && self.value == 0
    }

    pub fn is_negative(&self) -> bool {
        self.is_numeric() && self.value < 0
    }

    /// Lossy projection for display and unit conversion.
    pub fn as_seconds(&self) -> f64 {
        match self.kind {
            TimeKind::Numeric => self.value as f64 / self.timescale as f64,
            TimeKind::Invalid => f64::NAN,
            TimeKind::Indefinite => f64::INFINITY,
        }
    }

    /// Re-express this value in another timescale, rounding half away from zero.
    pub fn convert_scale(self, timescale: i32) -> Result<Self> {
        if timescale <= 0 {
            return Err(CoreError::NonPositiveTimescale(timescale));
        }
        if !self.is_numeric() {
            return Ok(self);
        }
        let value = i64::try_from(self.ticks_at(timescale))
            .map_err(|_| CoreError::TimescaleOverflow(timescale))?;
        Ok(Self {
            value,
            timescale,
            kind: TimeKind::Numeric,
        })
    }

    /// Three-way comparison. `None` when exactly one side is invalid.
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        self.partial_cmp(other)
    }

    pub fn min(self, other: Self) -> Self {
        match self.partial_cmp(&other) {
            Some(Ordering::Greater) => other,
            Some(_) => self,
            None => Self::INVALID,
        }
    }

    pub fn max(self, other: Self) -> Self {
        match self.partial_cmp(&other) {
            Some(Ordering::Less) => other,
            Some(_) => self,
            None => Self::INVALID,
        }
    }

    /// Bound to `[lo, hi]`. If the bounds cross, `hi` wins.
    pub fn clamp(self, lo: Self, hi: Self) -> Self {
        self.max(lo).min(hi)
    }

    pub fn abs(self) -> Self {
        if self.is_negative() {
            -self
        } else {
            self
        }
    }

    /// Divide by an integer scalar. Dividing by zero is a programming error.
    pub fn checked_div(self, divisor: i64) -> Result<Self> {
        if divisor == 0 {
            return Err(CoreError::DivideByZero);
        }
        match self.kind {
            TimeKind::Invalid => Ok(Self::INVALID),
            TimeKind::Indefinite if divisor > 0 => Ok(Self::INDEFINITE),
            TimeKind::Indefinite => Ok(Self::INVALID),
            TimeKind::Numeric => {
                let sign = divisor.signum();
                let scaled = self.timescale as i128 * divisor.unsigned_abs() as i128;
                if scaled <= i32::MAX as i128 {
                    Ok(Self::from_ticks(self.value as i128 * sign as i128, scaled as i32))
                } else {
                    Ok(Self::from_ticks(
                        div_round(self.value as i128, divisor as i128),
                        self.timescale,
                    ))
                }
            }
        }
    }

    fn ticks_at(&self, timescale: i32) -> i128 {
        if timescale == self.timescale {
            self.value as i128
        } else {
            div_round(
                self.value as i128 * timescale as i128,
                self.timescale as i128,
            )
        }
    }

    fn from_ticks(ticks: i128, timescale: i32) -> Self {
        match i64::try_from(ticks) {
            Ok(value) => Self {
                value,
                timescale,
                kind: TimeKind::Numeric,
            },
            Err(_) => Self::INVALID,
        }
    }

    fn reduced(&self) -> (i64, i64) {
        let g = gcd(self.value, self.timescale as i64);
        (self.value / g, self.timescale as i64 / g)
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::ZERO
    }
}

/// Least common multiple of two timescales, or the larger one when the LCM
/// does not fit.
fn common_scale(a: i32, b: i32) -> i32 {
    if a == b {
        return a;
    }
    let lcm = (a as i64 / gcd(a as i64, b as i64)) * b as i64;
    i32::try_from(lcm).unwrap_or(a.max(b))
}

fn gcd(a: i64, b: i64) -> i64 {
    let (mut a, mut b) = (a.unsigned_abs(), b.unsigned_abs());
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a.max(1) as i64
}

fn div_round(n: i128, d: i128) -> i128 {
    let (n, d) = if d < 0 { (-n, -d) } else { (n, d) };
    let q = n / d;
    let r = n % d;
    if 2 * r.abs() >= d {
        q + n.signum()
    } else {
        q
    }
}

// ---------------------------------------------------------------------------
// Arithmetic
// ---------------------------------------------------------------------------

impl Add for Time {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        match (self.kind, rhs.kind) {
            (TimeKind::Invalid, _) | (_, TimeKind::Invalid) => Self::INVALID,
            (TimeKind::Indefinite, _) | (_, TimeKind::Indefinite) => Self::INDEFINITE,
            (TimeKind::Numeric, TimeKind::Numeric) => {
                let ts = common_scale(self.timescale, rhs.timescale);
                Self::from_ticks(self.ticks_at(ts) + rhs.ticks_at(ts), ts)
            }
        }
    }
}

impl Sub for Time {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        match (self.kind, rhs.kind) {
            (TimeKind::Invalid, _) | (_, TimeKind::Invalid) => Self::INVALID,
            (TimeKind::Indefinite, TimeKind::Numeric) => Self::INDEFINITE,
            (_, TimeKind::Indefinite) => Self::INVALID,
            (TimeKind::Numeric, TimeKind::Numeric) => {
                let ts = common_scale(self.timescale, rhs.timescale);
                Self::from_ticks(self.ticks_at(ts) - rhs.ticks_at(ts), ts)
            }
        }
    }
}

impl Neg for Time {
    type Output = Self;
    fn neg(self) -> Self {
        match self.kind {
            TimeKind::Numeric => Self::from_ticks(-(self.value as i128), self.timescale),
            _ => Self::INVALID,
        }
    }
}

impl Mul<i64> for Time {
    type Output = Self;
    fn mul(self, rhs: i64) -> Self {
        match self.kind {
            TimeKind::Invalid => Self::INVALID,
            TimeKind::Indefinite if rhs > 0 => Self::INDEFINITE,
            TimeKind::Indefinite => Self::INVALID,
            TimeKind::Numeric => Self::from_ticks(self.value as i128 * rhs as i128, self.timescale),
        }
    }
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

impl PartialEq for Time {
    fn eq(&self, other: &Self) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}

impl Eq for Time {}

impl PartialOrd for Time {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self.kind, other.kind) {
            (TimeKind::Invalid, TimeKind::Invalid) => Some(Ordering::Equal),
            (TimeKind::Invalid, _) | (_, TimeKind::Invalid) => None,
            (TimeKind::Indefinite, TimeKind::Indefinite) => Some(Ordering::Equal),
            (TimeKind::Indefinite, _) => Some(Ordering::Greater),
            (_, TimeKind::Indefinite) => Some(Ordering::Less),
            (TimeKind::Numeric, TimeKind::Numeric) => {
                let lhs = self.value as i128 * other.timescale as i128;
                let rhs = other.value as i128 * self.timescale as i128;
                Some(lhs.cmp(&rhs))
            }
        }
    }
}

impl Hash for Time {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        if self.is_numeric() {
            self.reduced().hash(state);
        }
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TimeKind::Invalid => return write!(f, "--:--:--.---"),
            TimeKind::Indefinite => return write!(f, "inf"),
            TimeKind::Numeric => {}
        }
        let total_ms = self.ticks_at(1000);
        let abs_ms = total_ms.unsigned_abs();
        let ms = abs_ms % 1_000;
        let total_secs = abs_ms / 1_000;
        let secs = total_secs % 60;
        let total_mins = total_secs / 60;
        let mins = total_mins % 60;
        let hours = total_mins / 60;
        if total_ms < 0 {
            write!(f, "-{:02}:{:02}:{:02}.{:03}", hours, mins, secs, ms)
        } else {
            write!(f, "{:02}:{:02}:{:02}.{:03}", hours, mins, secs, ms)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
