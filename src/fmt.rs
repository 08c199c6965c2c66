//! printf-compatible numeric formatting for the deck text protocol.
//!
//! The CalculiX writer this crate replaces formatted node coordinates and
//! forces with `%f` and orientation/material values with `%.4g`. Rust's
//! standard formatter has no `%g` equivalent, so these helpers reproduce the
//! exact card text.

/// Format a value like C's `%f`: fixed notation with six decimals.
pub fn fixed6(value: f64) -> String {
    format!("{value:.6}")
}

/// Format a value like C's `%.4g`: four significant digits, fixed or
/// scientific notation depending on magnitude, trailing zeros removed.
pub fn g4(value: f64) -> String {
    general(value, 4)
}

/// `%.<precision>g`-style formatting.
pub fn general(value: f64, precision: usize) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if !value.is_finite() {
        return value.to_string();
    }
    let precision = precision.max(1);
    // Round to the requested number of significant digits first; the
    // exponent decides between fixed and scientific notation.
    let sci = format!("{:.*e}", precision - 1, value);
    let (mantissa, exp_text) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exponent: i32 = exp_text.parse().unwrap_or(0);
    if exponent < -4 || exponent >= precision as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{}{:02}",
            trim_fraction(mantissa),
            sign,
            exponent.abs()
        )
    } else {
        let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
        trim_fraction(&format!("{value:.decimals$}"))
    }
}

/// Strip trailing fractional zeros and a dangling decimal point.
fn trim_fraction(text: &str) -> String {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_matches_printf() {
        assert_eq!(fixed6(0.0), "0.000000");
        assert_eq!(fixed6(1.5), "1.500000");
        assert_eq!(fixed6(-0.125), "-0.125000");
    }

    #[test]
    fn general_uses_fixed_notation_in_range() {
        assert_eq!(g4(1.0), "1");
        assert_eq!(g4(1234.4), "1234");
        assert_eq!(g4(0.5), "0.5");
        assert_eq!(g4(0.0001234), "0.0001234");
        assert_eq!(g4(-2.25), "-2.25");
    }

    #[test]
    fn general_switches_to_scientific_notation() {
        assert_eq!(g4(12345.0), "1.234e+04");
        assert_eq!(g4(210000.0), "2.1e+05");
        assert_eq!(g4(0.00001234), "1.234e-05");
        assert_eq!(g4(-45.0e9), "-4.5e+10");
    }

    #[test]
    fn general_handles_zero_and_rounding_overflow() {
        assert_eq!(g4(0.0), "0");
        // 9999.6 rounds up to five digits and flips to scientific notation.
        assert_eq!(g4(9999.6), "1e+04");
    }
}
