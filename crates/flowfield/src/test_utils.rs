//! Shared synthetic-field helpers for unit tests.

use crate::field::Field;

/// A flow field with every pixel set to `(u, v)`.
pub(crate) fn uniform_flow(height: usize, width: usize, u: f64, v: f64) -> Field {
    let mut field = Field::filled(height, width, 2, 0.0);
    for y in 0..height {
        for x in 0..width {
            field.set(y, x, 0, u);
            field.set(y, x, 1, v);
        }
    }
    field
}
