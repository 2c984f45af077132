//! Text and number formatting for the printable layout

use bigdecimal::BigDecimal;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Remove combining diacritical marks (`"Educação"` becomes `"Educacao"`)
/// and replace control characters with spaces
pub fn strip_diacritics(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

/// Cut `text` to `width` characters, appending `...` when something was cut
pub fn truncate_with_ellipsis(text: &str, width: usize) -> String {
    if text.chars().count() > width {
        let mut cut: String = text.chars().take(width).collect();
        cut.push_str("...");
        cut
    } else {
        text.to_string()
    }
}

/// Cut `text` to `width` characters without a marker
pub fn truncate(text: &str, width: usize) -> String {
    text.chars().take(width).collect()
}

/// Sanitized and truncated free text for a printable table cell
pub fn printable_text(text: &str, width: usize) -> String {
    truncate_with_ellipsis(&strip_diacritics(text), width)
}

/// Sanitized uppercase label cut to `width`, used for categories
pub fn printable_label(text: &str, width: usize) -> String {
    truncate(&strip_diacritics(text).to_uppercase(), width)
}

/// Amount with two decimals behind a currency symbol, e.g. `"$ 1500.00"`
pub fn format_money(symbol: &str, amount: &BigDecimal) -> String {
    format!("{} {}", symbol, amount.round(2).with_scale(2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_diacritics() {
        assert_eq!(strip_diacritics("Educação Física"), "Educacao Fisica");
        assert_eq!(strip_diacritics("plain"), "plain");
    }

    #[test]
    fn test_truncation() {
        assert_eq!(truncate_with_ellipsis("abcdef", 3), "abc...");
        assert_eq!(truncate_with_ellipsis("abc", 3), "abc");
        assert_eq!(printable_label("alimentação e bebidas", 10), "ALIMENTACA");
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money("$", &BigDecimal::from(1500)), "$ 1500.00");
        assert_eq!(
            format_money("R$", &"-12.346".parse::<BigDecimal>().unwrap()),
            "R$ -12.35"
        );
    }
}
