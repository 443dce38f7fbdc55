/// Rounds to the given number of decimals, halves away from zero.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Renders an hour delta as `+H.H Std` or `−H.H Std`.
///
/// Only for display, values are stored with full precision. A value which
/// rounds to zero is shown as `+0.0 Std`.
pub fn format_hours(hours: f64) -> String {
    let rounded = round_to(hours, 1);
    if rounded < 0.0 {
        format!("\u{2212}{:.1} Std", rounded.abs())
    } else {
        format!("+{:.1} Std", rounded.abs())
    }
}

/// Fixed decimals with an explicit sign, e.g. `+2.50` or `-0.25`.
pub fn format_signed(value: f64, decimals: usize) -> String {
    let rounded = round_to(value, decimals as u32);
    if rounded < 0.0 {
        format!("-{:.*}", decimals, rounded.abs())
    } else {
        format!("+{:.*}", decimals, rounded.abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(0.25, 1), 0.3);
        assert_eq!(round_to(-0.25, 1), -0.3);
        assert_eq!(round_to(2.449, 1), 2.4);
        assert_eq!(round_to(1.005, 0), 1.0);
    }

    #[test]
    fn test_format_hours() {
        assert_eq!(format_hours(1.5), "+1.5 Std");
        assert_eq!(format_hours(-0.25), "\u{2212}0.3 Std");
        assert_eq!(format_hours(0.25), "+0.3 Std");
        assert_eq!(format_hours(12.0), "+12.0 Std");
        assert_eq!(format_hours(-0.04), "+0.0 Std");
    }

    #[test]
    fn test_format_signed() {
        assert_eq!(format_signed(-0.25, 2), "-0.25");
        assert_eq!(format_signed(2.5, 2), "+2.50");
        assert_eq!(format_signed(0.0, 2), "+0.00");
    }
}
