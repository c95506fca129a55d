// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! # Complex Module
//!
//! Interleaved complex number storage for the `complex32`, `complex64` and
//! `complex128` dtypes.

use std::fmt::{Display, Formatter};
use std::ops::{Add, Div, Mul, Neg, Sub};

use num_traits::Float;

/// Complex number with `re` and `im` parts.
///
/// `#[repr(C)]` keeps the real/imaginary interleaving of the C layout.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
pub struct Complex<T> {
    pub re: T,
    pub im: T,
}

impl<T> Complex<T> {
    #[inline]
    pub const fn new(re: T, im: T) -> Self {
        Self { re, im }
    }
}

impl<T: Float> Complex<T> {
    #[inline]
    pub fn from_real(re: T) -> Self {
        Self { re, im: T::zero() }
    }

    #[inline]
    pub fn is_nan(&self) -> bool {
        self.re.is_nan() || self.im.is_nan()
    }

    /// Equality where a NaN part equals a NaN part in the same position.
    #[inline]
    pub fn eq_nan(&self, other: &Self) -> bool {
        let part = |a: T, b: T| a == b || (a.is_nan() && b.is_nan());
        part(self.re, other.re) && part(self.im, other.im)
    }

    #[inline]
    pub fn exp(self) -> Self {
        let m = self.re.exp();
        Self::new(m * self.im.cos(), m * self.im.sin())
    }

    #[inline]
    pub fn ln(self) -> Self {
        Self::new(self.re.hypot(self.im).ln(), self.im.atan2(self.re))
    }

    #[inline]
    pub fn sqrt(self) -> Self {
        let r = self.re.hypot(self.im);
        let two = T::one() + T::one();
        let re = ((r + self.re) / two).sqrt();
        let im = ((r - self.re) / two).sqrt();
        Self::new(re, if self.im < T::zero() { -im } else { im })
    }

    #[inline]
    pub fn sin(self) -> Self {
        Self::new(self.re.sin() * self.im.cosh(), self.re.cos() * self.im.sinh())
    }

    #[inline]
    pub fn cos(self) -> Self {
        Self::new(self.re.cos() * self.im.cosh(), -(self.re.sin() * self.im.sinh()))
    }

    #[inline]
    pub fn tan(self) -> Self {
        self.sin() / self.cos()
    }

    #[inline]
    pub fn sinh(self) -> Self {
        Self::new(self.re.sinh() * self.im.cos(), self.re.cosh() * self.im.sin())
    }

    #[inline]
    pub fn cosh(self) -> Self {
        Self::new(self.re.cosh() * self.im.cos(), self.re.sinh() * self.im.sin())
    }

    #[inline]
    pub fn tanh(self) -> Self {
        self.sinh() / self.cosh()
    }

    /// `asin(z) = -i ln(iz + sqrt(1 - z^2))`
    pub fn asin(self) -> Self {
        let one = Self::from_real(T::one());
        let iz = Self::new(-self.im, self.re);
        let w = (iz + (one - self * self).sqrt()).ln();
        Self::new(w.im, -w.re)
    }

    /// `acos(z) = pi/2 - asin(z)`
    pub fn acos(self) -> Self {
        let half_pi = <T as num_traits::NumCast>::from(std::f64::consts::FRAC_PI_2).unwrap_or_else(T::zero);
        let a = self.asin();
        Self::new(half_pi - a.re, -a.im)
    }

    /// `atan(z) = i/2 (ln(1 - iz) - ln(1 + iz))`
    pub fn atan(self) -> Self {
        let one = Self::from_real(T::one());
        let iz = Self::new(-self.im, self.re);
        let d = (one - iz).ln() - (one + iz).ln();
        let two = T::one() + T::one();
        Self::new(-d.im / two, d.re / two)
    }
}

impl<T: Float> Add for Complex<T> {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.re + rhs.re, self.im + rhs.im)
    }
}

impl<T: Float> Sub for Complex<T> {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.re - rhs.re, self.im - rhs.im)
    }
}

impl<T: Float> Mul for Complex<T> {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.re * rhs.re - self.im * rhs.im,
            self.re * rhs.im + self.im * rhs.re,
        )
    }
}

impl<T: Float> Div for Complex<T> {
    type Output = Self;
    #[inline]
    fn div(self, rhs: Self) -> Self {
        let d = rhs.re * rhs.re + rhs.im * rhs.im;
        Self::new(
            (self.re * rhs.re + self.im * rhs.im) / d,
            (self.im * rhs.re - self.re * rhs.im) / d,
        )
    }
}

impl<T: Float> Neg for Complex<T> {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.re, -self.im)
    }
}

impl<T: Display + Float> Display for Complex<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.im < T::zero() {
            write!(f, "{}-{}i", self.re, -self.im)
        } else {
            write!(f, "{}+{}i", self.re, self.im)
        }
    }
}
