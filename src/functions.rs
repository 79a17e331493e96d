//! Built-in benchmark integrands, selectable by number from the command line.

use crate::integrate::Integrand;
use serde::Serialize;
use std::f64::consts::PI;
use std::fmt;

/// The benchmark functions shipped with the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TestFunction {
    /// De Jong's fifth function (Shekel's foxholes)
    DeJong5,
    /// Ackley function
    Ackley,
    /// Langermann function
    Langermann,
    /// Product of two Shubert-type sums
    Shubert,
}

impl TestFunction {
    pub const ALL: [TestFunction; 4] = [
        TestFunction::DeJong5,
        TestFunction::Ackley,
        TestFunction::Langermann,
        TestFunction::Shubert,
    ];

    /// Look up a function by its 1-based number.
    pub fn from_number(number: u8) -> Option<Self> {
        Self::ALL.get(usize::from(number).checked_sub(1)?).copied()
    }

    pub fn number(&self) -> u8 {
        match self {
            TestFunction::DeJong5 => 1,
            TestFunction::Ackley => 2,
            TestFunction::Langermann => 3,
            TestFunction::Shubert => 4,
        }
    }
}

impl fmt::Display for TestFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TestFunction::DeJong5 => "de Jong 5",
            TestFunction::Ackley => "Ackley",
            TestFunction::Langermann => "Langermann",
            TestFunction::Shubert => "Shubert",
        };
        write!(f, "{name}")
    }
}

impl Integrand for TestFunction {
    fn eval(&self, x: f64, y: f64) -> f64 {
        match self {
            TestFunction::DeJong5 => de_jong5(x, y),
            TestFunction::Ackley => ackley(x, y),
            TestFunction::Langermann => langermann(x, y),
            TestFunction::Shubert => shubert(x, y),
        }
    }
}

/// 25 foxhole wells on a 16-spaced grid.
pub fn de_jong5(x: f64, y: f64) -> f64 {
    let mut sum = 0.002;
    for i in -2..=2 {
        for j in -2..=2 {
            let a1 = f64::from(16 * j);
            let a2 = f64::from(16 * i);
            let k = f64::from(5 * (i + 2) + j + 3);
            sum += 1.0 / (k + (x - a1).powi(6) + (y - a2).powi(6));
        }
    }
    1.0 / sum
}

pub fn ackley(x: f64, y: f64) -> f64 {
    const A: f64 = 20.0;
    const B: f64 = 0.2;
    const C: f64 = 2.0 * PI;

    let radial = -A * (-B * (0.5 * (x * x + y * y)).sqrt()).exp();
    let periodic = -(0.5 * ((C * x).cos() + (C * y).cos())).exp();
    radial + periodic + A + std::f64::consts::E
}

pub fn langermann(x: f64, y: f64) -> f64 {
    const A1: [f64; 5] = [1.0, 2.0, 1.0, 1.0, 5.0];
    const A2: [f64; 5] = [4.0, 5.0, 1.0, 2.0, 4.0];
    const C: [f64; 5] = [2.0, 1.0, 4.0, 7.0, 2.0];

    let sum: f64 = A1
        .iter()
        .zip(&A2)
        .zip(&C)
        .map(|((&a1, &a2), &c)| {
            let r2 = (x - a1).powi(2) + (y - a2).powi(2);
            c * (-r2 / PI).exp() * (PI * r2).cos()
        })
        .sum();
    -sum
}

pub fn shubert(x: f64, y: f64) -> f64 {
    fn series(t: f64) -> f64 {
        (0..=5)
            .map(|i| {
                let i = f64::from(i);
                i * ((i + 1.0) * t + 1.0).cos()
            })
            .sum()
    }
    -series(x) * series(y)
}
