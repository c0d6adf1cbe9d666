//! Pure string normalization for numeric form input.
//!
//! Capital amounts arrive from the form as free text that may carry
//! thousands separators or full-width digits typed with a CJK input method.
//! Normalization happens here, before a `SimulationConfig` is constructed;
//! the numeric core never sees strings.

/// Folds full-width digits to ASCII and strips thousands separators and
/// surrounding whitespace. Does not validate the result.
pub fn normalize_numeric_text(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter_map(|c| match c {
            ',' | '，' => None,
            '０'..='９' => {
                char::from_u32(u32::from(c) - u32::from('０') + u32::from('0'))
            }
            _ => Some(c),
        })
        .collect()
}

/// Parses a capital amount from form text, accepting grouped and full-width
/// input such as `"5,000,000"` or `"５００００００"`.
pub fn parse_capital(raw: &str) -> Result<f64, String> {
    let normalized = normalize_numeric_text(raw);
    normalized
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("startingCapital is not a valid number: {raw:?}"))
}

/// Re-groups an integer amount with comma separators for display.
pub fn group_thousands(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if amount < 0 {
        grouped.push('-');
    }
    for (offset, c) in digits.chars().enumerate() {
        if offset > 0 && (digits.len() - offset) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}
