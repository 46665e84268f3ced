use std::rc::Rc;

/// Formats every aggregate value shown to the user.
pub type NumberFormat = Rc<dyn Fn(f64) -> String>;

/// Grouped thousands, at most three fraction digits: `1234567.891` → `1,234,567.891`.
pub fn default_number_format() -> NumberFormat {
    Rc::new(format_grouped)
}

pub fn format_grouped(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "∞" } else { "-∞" }.to_string();
    }

    let fixed = format!("{:.3}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let frac_part = frac_part.trim_end_matches('0');

    let mut out = String::with_capacity(fixed.len() + fixed.len() / 3 + 1);
    let is_zero = int_part.bytes().all(|b| b == b'0') && frac_part.is_empty();
    if value < 0.0 && !is_zero {
        out.push('-');
    }
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if !frac_part.is_empty() {
        out.push('.');
        out.push_str(frac_part);
    }
    out
}

/// Shortens `text` to at most `max_chars` characters, ending in `...` when cut.
pub fn cut(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::{cut, format_grouped};

    #[test]
    fn groups_thousands() {
        assert_eq!(format_grouped(0.0), "0");
        assert_eq!(format_grouped(999.0), "999");
        assert_eq!(format_grouped(1000.0), "1,000");
        assert_eq!(format_grouped(1234567.891), "1,234,567.891");
        assert_eq!(format_grouped(-12345.5), "-12,345.5");
    }

    #[test]
    fn rounds_to_three_fraction_digits() {
        assert_eq!(format_grouped(0.12345), "0.123");
        assert_eq!(format_grouped(2.5), "2.5");
        assert_eq!(format_grouped(-0.0001), "0");
    }

    #[test]
    fn non_finite_values() {
        assert_eq!(format_grouped(f64::NAN), "NaN");
        assert_eq!(format_grouped(f64::INFINITY), "∞");
    }

    #[test]
    fn cut_long_text() {
        assert_eq!(cut("short", 20), "short");
        assert_eq!(cut("a very long group name here", 10), "a very ...");
    }
}
