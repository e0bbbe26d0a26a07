#[cfg(feature = "map")]
pub mod map;
pub mod panels;
pub mod plot;
pub mod tables;

/// `1234567.8` → `"1 234 568"`: rounded to units, space every three digits.
pub fn format_amount(amount: f64) -> String {
    let rounded = amount.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(ch);
    }
    if rounded < 0.0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

#[cfg(test)]
mod tests {
    use super::format_amount;

    #[test]
    fn amounts_are_grouped_by_thousands() {
        assert_eq!(format_amount(0.0), "0");
        assert_eq!(format_amount(999.4), "999");
        assert_eq!(format_amount(1000.0), "1 000");
        assert_eq!(format_amount(1234567.8), "1 234 568");
        assert_eq!(format_amount(-25000.0), "-25 000");
    }
}
