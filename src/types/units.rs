//! Physical units
//!
//! A unit keeps the named factors it was built from (`mV`, `ms`, ...) for
//! display and registry keys, and its SI dimension vector plus a decimal
//! scale for physical comparison. `mV * nS` and `pA` have different names
//! but denote the same unit.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// SI base dimension exponents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Dimensions {
    pub length: i32,
    pub mass: i32,
    pub time: i32,
    pub current: i32,
    pub temperature: i32,
    pub amount: i32,
    pub luminosity: i32,
}

impl Dimensions {
    pub const NONE: Dimensions = Dimensions {
        length: 0,
        mass: 0,
        time: 0,
        current: 0,
        temperature: 0,
        amount: 0,
        luminosity: 0,
    };

    fn as_array(&self) -> [i32; 7] {
        [
            self.length,
            self.mass,
            self.time,
            self.current,
            self.temperature,
            self.amount,
            self.luminosity,
        ]
    }

    fn from_array(a: [i32; 7]) -> Self {
        Self {
            length: a[0],
            mass: a[1],
            time: a[2],
            current: a[3],
            temperature: a[4],
            amount: a[5],
            luminosity: a[6],
        }
    }

    /// Combine exponents pairwise; `None` on overflow
    fn zip(&self, other: &Dimensions, f: impl Fn(i32, i32) -> Option<i32>) -> Option<Dimensions> {
        let (a, b) = (self.as_array(), other.as_array());
        let mut out = [0; 7];
        for i in 0..7 {
            out[i] = f(a[i], b[i])?;
        }
        Some(Self::from_array(out))
    }

    pub fn multiply(&self, other: &Dimensions) -> Option<Dimensions> {
        self.zip(other, i32::checked_add)
    }

    pub fn divide(&self, other: &Dimensions) -> Option<Dimensions> {
        self.zip(other, i32::checked_sub)
    }

    pub fn pow(&self, exponent: i32) -> Option<Dimensions> {
        self.zip(&Dimensions::NONE, |a, _| a.checked_mul(exponent))
    }

    pub fn is_dimensionless(&self) -> bool {
        *self == Dimensions::NONE
    }
}

/// A physical unit
#[derive(Debug, Clone, Serialize)]
pub struct Unit {
    /// Named atomic units and their exponents, zero exponents removed
    factors: BTreeMap<String, i32>,
    dims: Dimensions,
    /// Power of ten relative to the coherent SI unit
    scale: i32,
}

impl Unit {
    /// An atomic named unit
    pub fn named(name: &str, dims: Dimensions, scale: i32) -> Self {
        let mut factors = BTreeMap::new();
        factors.insert(name.to_string(), 1);
        Self { factors, dims, scale }
    }

    /// The dimensionless unit `1`
    pub fn one() -> Self {
        Self {
            factors: BTreeMap::new(),
            dims: Dimensions::NONE,
            scale: 0,
        }
    }

    pub fn dims(&self) -> Dimensions {
        self.dims
    }

    pub fn scale(&self) -> i32 {
        self.scale
    }

    pub fn is_dimensionless(&self) -> bool {
        self.dims.is_dimensionless()
    }

    /// Product of two units; `None` when an exponent or the scale overflows
    pub fn multiply(&self, other: &Unit) -> Option<Unit> {
        let mut factors = self.factors.clone();
        for (name, exp) in &other.factors {
            let entry = factors.entry(name.clone()).or_insert(0);
            *entry = entry.checked_add(*exp)?;
        }
        factors.retain(|_, exp| *exp != 0);
        Some(Unit {
            factors,
            dims: self.dims.multiply(&other.dims)?,
            scale: self.scale.checked_add(other.scale)?,
        })
    }

    pub fn divide(&self, other: &Unit) -> Option<Unit> {
        self.multiply(&other.power(-1)?)
    }

    pub fn power(&self, exponent: i32) -> Option<Unit> {
        let mut factors = BTreeMap::new();
        for (name, exp) in &self.factors {
            let exp = exp.checked_mul(exponent)?;
            if exp != 0 {
                factors.insert(name.clone(), exp);
            }
        }
        Some(Unit {
            factors,
            dims: self.dims.pow(exponent)?,
            scale: self.scale.checked_mul(exponent)?,
        })
    }

    /// Same physical dimension, only the metric prefix differs (`mV` vs `V`)
    pub fn differs_in_magnitude(&self, other: &Unit) -> bool {
        self.dims == other.dims && self.scale != other.scale
    }

    pub fn same_dimension(&self, other: &Unit) -> bool {
        self.dims == other.dims
    }

    /// Canonical name, e.g. `mV`, `1/ms`, `mV**2/ms`, `pA/(mV*ms)`
    pub fn name(&self) -> String {
        let render = |parts: Vec<(&String, i32)>| -> Vec<String> {
            parts
                .into_iter()
                .map(|(name, exp)| {
                    if exp == 1 {
                        name.clone()
                    } else {
                        format!("{}**{}", name, exp)
                    }
                })
                .collect()
        };
        let numerator = render(
            self.factors
                .iter()
                .filter(|(_, e)| **e > 0)
                .map(|(n, e)| (n, *e))
                .collect(),
        );
        let denominator = render(
            self.factors
                .iter()
                .filter(|(_, e)| **e < 0)
                .map(|(n, e)| (n, -*e))
                .collect(),
        );

        let top = if numerator.is_empty() {
            "1".to_string()
        } else {
            numerator.join("*")
        };
        match denominator.len() {
            0 => top,
            1 => format!("{}/{}", top, denominator[0]),
            _ => format!("{}/({})", top, denominator.join("*")),
        }
    }
}

impl PartialEq for Unit {
    fn eq(&self, other: &Self) -> bool {
        self.dims == other.dims && self.scale == other.scale
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ==================== Predefined catalogue ====================

/// SI prefixes and their decimal exponents
pub const PREFIXES: &[(&str, i32)] = &[
    ("Y", 24),
    ("Z", 21),
    ("E", 18),
    ("P", 15),
    ("T", 12),
    ("G", 9),
    ("M", 6),
    ("k", 3),
    ("h", 2),
    ("da", 1),
    ("d", -1),
    ("c", -2),
    ("m", -3),
    ("u", -6),
    ("n", -9),
    ("p", -12),
    ("f", -15),
    ("a", -18),
    ("z", -21),
    ("y", -24),
];

const fn dims(length: i32, mass: i32, time: i32, current: i32) -> Dimensions {
    Dimensions {
        length,
        mass,
        time,
        current,
        temperature: 0,
        amount: 0,
        luminosity: 0,
    }
}

/// Base and derived SI units (mass is measured in kg, so `g` has scale -3)
pub fn base_units() -> Vec<(&'static str, Dimensions, i32)> {
    vec![
        ("s", dims(0, 0, 1, 0), 0),
        ("m", dims(1, 0, 0, 0), 0),
        ("g", dims(0, 1, 0, 0), -3),
        ("A", dims(0, 0, 0, 1), 0),
        ("K", Dimensions { temperature: 1, ..Dimensions::NONE }, 0),
        ("mol", Dimensions { amount: 1, ..Dimensions::NONE }, 0),
        ("cd", Dimensions { luminosity: 1, ..Dimensions::NONE }, 0),
        ("V", dims(2, 1, -3, -1), 0),
        ("S", dims(-2, -1, 3, 2), 0),
        ("Ohm", dims(2, 1, -3, -2), 0),
        ("F", dims(-2, -1, 4, 2), 0),
        ("C", dims(0, 0, 1, 1), 0),
        ("W", dims(2, 1, -3, 0), 0),
        ("J", dims(2, 1, -2, 0), 0),
        ("N", dims(1, 1, -2, 0), 0),
        ("Hz", dims(0, 0, -1, 0), 0),
        ("H", dims(2, 1, -2, -2), 0),
        ("Pa", dims(-1, 1, -2, 0), 0),
        ("L", dims(3, 0, 0, 0), -3),
        ("M", Dimensions { length: -3, amount: 1, ..Dimensions::NONE }, 3),
    ]
}

/// Every predefined unit: each base unit bare and with every prefix.
/// Earlier entries win when a prefixed name collides with another unit.
pub fn predefined_units() -> Vec<Unit> {
    let mut seen = std::collections::HashSet::new();
    let mut units = Vec::new();
    let bases = base_units();

    for (name, d, scale) in &bases {
        if seen.insert(name.to_string()) {
            units.push(Unit::named(name, *d, *scale));
        }
    }
    for (name, d, scale) in &bases {
        for (prefix, exp) in PREFIXES {
            let full = format!("{}{}", prefix, name);
            if seen.insert(full.clone()) {
                units.push(Unit::named(&full, *d, scale + exp));
            }
        }
    }
    units
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn unit(name: &str) -> Unit {
        predefined_units()
            .into_iter()
            .find(|u| u.name() == name)
            .expect("predefined unit")
    }

    #[test]
    fn test_canonical_names() {
        let mv = unit("mV");
        let ms = unit("ms");
        let ns = unit("nS");

        let name = |u: Option<Unit>| u.expect("no overflow").name();
        assert_eq!(name(mv.divide(&ms)), "mV/ms");
        assert_eq!(name(Unit::one().divide(&mv)), "1/mV");
        assert_eq!(name(mv.power(2).and_then(|u| u.divide(&ms))), "mV**2/ms");
        assert_eq!(name(ms.multiply(&ns).and_then(|d| mv.divide(&d))), "mV/(ms*nS)");
        assert_eq!(name(mv.divide(&mv)), "1");
    }

    #[test]
    fn test_factor_order_does_not_matter() {
        let mv = unit("mV");
        let ns = unit("nS");
        assert_eq!(mv.multiply(&ns), ns.multiply(&mv));
        assert_eq!(
            mv.multiply(&ns).map(|u| u.name()),
            ns.multiply(&mv).map(|u| u.name())
        );
    }

    #[test]
    fn test_physical_equality() {
        let product = unit("mV").multiply(&unit("nS"));
        assert_eq!(product, Some(unit("pA")));
        assert!(unit("mV") != unit("pA"));
    }

    #[test]
    fn test_differs_in_magnitude() {
        assert!(unit("mV").differs_in_magnitude(&unit("V")));
        assert!(!unit("mV").differs_in_magnitude(&unit("mV")));
        assert!(!unit("mV").differs_in_magnitude(&unit("ms")));
    }

    #[test]
    fn test_kilogram_is_coherent() {
        let kg = unit("kg");
        assert_eq!(kg.scale(), 0);
        assert_eq!(kg.dims().mass, 1);
    }

    #[test]
    fn test_power_with_negative_exponent() {
        let per_ms = unit("ms").power(-1).expect("no overflow");
        assert_eq!(per_ms.name(), "1/ms");
        assert_eq!(per_ms.dims().time, -1);
        assert_eq!(per_ms.scale(), 3);
        assert!(per_ms.same_dimension(&unit("Hz")));
    }

    #[test]
    fn test_exponent_overflow_is_detected() {
        assert!(unit("mV").power(2_000_000_000).is_none());
        assert!(unit("s").power(i32::MIN).and_then(|u| u.power(-1)).is_none());

        let big = unit("s").power(1_500_000_000).expect("fits");
        assert_eq!(big.dims().time, 1_500_000_000);
        assert!(big.multiply(&big).is_none());
        assert!(Unit::one().divide(&big).is_some());
        assert_eq!(Dimensions::NONE.pow(i32::MAX), Some(Dimensions::NONE));
    }
}
