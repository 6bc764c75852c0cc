//! Utility functions and helpers

use rust_decimal::Decimal;

/// Format a number with thousands separators
pub fn format_number<T: ToString>(n: T) -> String {
    group_digits(&n.to_string(), ",")
}

/// Insert `sep` between every group of three digits of an integer string
fn group_digits(s: &str, sep: &str) -> String {
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", s),
    };
    let mut result = String::new();
    let mut count = 0;
    for c in digits.chars().rev() {
        if count == 3 {
            result.push_str(&sep.chars().rev().collect::<String>());
            count = 0;
        }
        result.push(c);
        count += 1;
    }
    let grouped: String = result.chars().rev().collect();
    format!("{}{}", sign, grouped)
}

/// Format a decimal amount with a fixed number of places and a thousands separator
pub fn format_decimal(amount: Decimal, decimal_places: u32, thousands_separator: &str) -> String {
    let rounded = amount.round_dp(decimal_places);
    let text = format!("{:.prec$}", rounded, prec = decimal_places as usize);
    match text.split_once('.') {
        Some((int_part, frac)) => format!("{}.{}", group_digits(int_part, thousands_separator), frac),
        None => group_digits(&text, thousands_separator),
    }
}

/// Format an amount as money, e.g. `$1,234.50` or `-$12.00`
pub fn format_money(amount: Decimal, symbol: &str, decimal_places: u32, thousands_separator: &str) -> String {
    let body = format_decimal(amount.abs(), decimal_places, thousands_separator);
    if amount.is_sign_negative() && !amount.is_zero() {
        format!("-{}{}", symbol, body)
    } else {
        format!("{}{}", symbol, body)
    }
}

/// Escape text for inclusion in HTML element content or attribute values
pub fn escape_html(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    for c in content.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Generate an opaque id shared by the members of a recurring group
pub fn generate_group_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Percentage of `part` in `total`, zero when the total is zero
pub fn percentage(part: Decimal, total: Decimal) -> Decimal {
    if total.is_zero() {
        Decimal::ZERO
    } else {
        part * Decimal::ONE_HUNDRED / total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
        assert_eq!(format_number(-1234), "-1,234");
    }

    #[test]
    fn test_format_money() {
        let d = Decimal::from_str("1234.5").unwrap();
        assert_eq!(format_money(d, "$", 2, ","), "$1,234.50");
        assert_eq!(format_money(-d, "$", 2, ","), "-$1,234.50");
        assert_eq!(format_money(Decimal::from(5), "€", 0, "."), "€5");
        assert_eq!(format_money(Decimal::from(1_000_000), "", 2, " "), "1 000 000.00");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("Food & Dining"), "Food &amp; Dining");
        assert_eq!(escape_html("<script>\"x\"</script>"), "&lt;script&gt;&quot;x&quot;&lt;/script&gt;");
    }

    #[test]
    fn test_generate_group_id_unique() {
        let a = generate_group_id();
        let b = generate_group_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 36);
    }

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(Decimal::from(50), Decimal::from(200)), Decimal::from(25));
        assert_eq!(percentage(Decimal::from(50), Decimal::ZERO), Decimal::ZERO);
    }
}
