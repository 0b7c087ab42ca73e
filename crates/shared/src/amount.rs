//! Display formats for quantities and money.

/// Whole quantities keep one decimal place (`100.0`); fractional ones print
/// as-is (`12.75`).
pub fn quantity(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

/// Money always carries two decimal places.
pub fn money(value: f64) -> String {
    format!("{value:.2}")
}
