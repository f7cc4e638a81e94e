/// `MM:SS` countdown display
pub fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Fraction of a timer left, clamped to `0.0..=1.0`
pub fn remaining_ratio(remaining: u32, total: u32) -> f64 {
    match total {
        0 => 0.0,
        total => (f64::from(remaining) / f64::from(total)).clamp(0.0, 1.0),
    }
}
