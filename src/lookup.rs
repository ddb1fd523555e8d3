//! Design-curve margin factors for the EC3 curve.
//!
//! Indexed by residual degrees of freedom. The values are tabulated, not
//! computed, and are carried as literal data.

/// Factor used once the residual degrees of freedom exceed the table.
pub const DDIST_LIMIT: f64 = 1.8;

/// Factors for 1 to 100 residual degrees of freedom.
pub const DDIST_TABLE: [f64; 100] = [
    10.1, 4.58, 3.63, 3.16, 2.85, 2.7, 2.59, 2.51, 2.45, 2.39, //
    2.35, 2.31, 2.26, 2.24, 2.22, 2.2, 2.18, 2.16, 2.15, 2.14, //
    2.13, 2.12, 2.1, 2.09, 2.08, 2.06, 2.05, 2.03, 2.02, 2.01, //
    2.0, 1.99, 1.99, 1.99, 1.98, 1.98, 1.98, 1.97, 1.97, 1.96, //
    1.96, 1.95, 1.95, 1.94, 1.94, 1.93, 1.93, 1.93, 1.93, 1.93, //
    1.92, 1.92, 1.92, 1.91, 1.91, 1.91, 1.91, 1.91, 1.91, 1.9, //
    1.9, 1.9, 1.9, 1.9, 1.89, 1.89, 1.89, 1.89, 1.89, 1.88, //
    1.88, 1.88, 1.88, 1.88, 1.87, 1.87, 1.87, 1.87, 1.87, 1.87, //
    1.86, 1.86, 1.86, 1.86, 1.86, 1.86, 1.86, 1.85, 1.85, 1.85, //
    1.85, 1.85, 1.85, 1.85, 1.85, 1.85, 1.85, 1.84, 1.84, 1.84, //
];

/// EC3 margin factor for `n` residual degrees of freedom (1-based).
///
/// `n = 0` is treated as 1.
#[must_use]
pub fn ddist(n: usize) -> f64 {
    if n > DDIST_TABLE.len() {
        DDIST_LIMIT
    } else {
        DDIST_TABLE[n.max(1) - 1]
    }
}
