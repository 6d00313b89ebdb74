//! Deterministic normalization of column names, labels and cell values.
//!
//! | Input                   | Normalized            |
//! |-------------------------|-----------------------|
//! | `" Project name "`      | `project_name`        |
//! | `"Date online"`         | `date_online`         |
//! | `"Value (€/kg)"`        | `value_kg`            |
//! | `"Min-max (Eur/kg)"`    | `min_max_eur_kg`      |
//! | `"demand (Mtpa H_2)"`   | `demand_mtpa_h_2`     |

use std::collections::BTreeMap;

/// Cell contents treated as "no value", compared case-insensitively after trimming.
const MISSING_TOKENS: &[&str] = &["", "na", "n/a", "n.a.", "nan", "null", "none", "-", "--"];

/// Trims, lowercases and collapses every run of non-ASCII-alphanumeric
/// characters into a single `_`, with leading and trailing `_` removed.
pub fn normalize_column(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_sep = false;
    for c in raw.trim().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_sep = true;
        }
    }
    out
}

/// Normalizes a header row. Repeated names get `_2`, `_3`, ... suffixes in
/// order of appearance; empty names become `column_<n>` (1-based position).
pub fn normalize_headers(raw: &[String]) -> Vec<String> {
    let mut seen: BTreeMap<String, usize> = BTreeMap::new();
    raw.iter()
        .enumerate()
        .map(|(i, name)| {
            let mut base = normalize_column(name);
            if base.is_empty() {
                base = format!("column_{}", i + 1);
            }
            let count = seen.entry(base.clone()).or_insert(0);
            *count += 1;
            if *count == 1 {
                base
            } else {
                format!("{}_{}", base, count)
            }
        })
        .collect()
}

pub fn is_missing(cell: &str) -> bool {
    let trimmed = cell.trim();
    MISSING_TOKENS
        .iter()
        .any(|token| trimmed.eq_ignore_ascii_case(token))
}

/// Parses a numeric cell. Accepts comma decimal separators (`"3,5"`),
/// thousands separators (`"1,234.5"`), and surrounding currency or percent signs.
pub fn parse_number(cell: &str) -> Option<f64> {
    if is_missing(cell) {
        return None;
    }
    let stripped: String = cell
        .trim()
        .chars()
        .filter(|c| !matches!(c, '€' | '$' | '£' | '%' | ' ' | '\u{a0}'))
        .collect();

    let has_dot = stripped.contains('.');
    let commas = stripped.matches(',').count();
    let canonical = if has_dot || commas > 1 {
        stripped.replace(',', "")
    } else {
        stripped.replace(',', ".")
    };

    canonical.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parses a calendar year such as `2027` or `2020.0`. Fractional years are rejected.
pub fn parse_year(cell: &str) -> Option<i32> {
    let value = parse_number(cell)?;
    if value.fract() != 0.0 || value < i32::MIN as f64 || value > i32::MAX as f64 {
        return None;
    }
    Some(value as i32)
}

/// Parses a price range such as `"3,5-4,2"` or `"2.1 – 3.0"`. A single value
/// yields a degenerate range. Bounds are returned in ascending order.
pub fn parse_range(cell: &str) -> Option<(f64, f64)> {
    if is_missing(cell) {
        return None;
    }
    let trimmed = cell.trim().replace('–', "-");
    // skip index 0 so a leading minus sign is not taken as the separator
    let split_at = trimmed
        .char_indices()
        .skip(1)
        .find(|(_, c)| *c == '-')
        .map(|(i, _)| i);

    match split_at {
        Some(i) => {
            let lo = parse_number(&trimmed[..i])?;
            let hi = parse_number(&trimmed[i + 1..])?;
            Some(if lo <= hi { (lo, hi) } else { (hi, lo) })
        }
        None => parse_number(&trimmed).map(|v| (v, v)),
    }
}

/// Trims and collapses internal whitespace.
pub fn clean_label(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Title-cases a label: the first letter after any non-letter is upper-cased,
/// every other letter lower-cased (`"heavy-duty trucks"` → `"Heavy-Duty Trucks"`).
pub fn title_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut prev_is_letter = false;
    for c in clean_label(raw).chars() {
        if c.is_alphabetic() {
            if prev_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(c);
            prev_is_letter = false;
        }
    }
    out
}

/// Key used when joining tables on region or sector labels.
pub fn join_key(raw: &str) -> String {
    clean_label(raw).to_lowercase()
}

/// Multiplier converting a quantity column into kt H2/y, inferred from the unit
/// tokens in its normalized name (`mt`/`mtpa` → 1000, `t`/`tpa` → 0.001).
pub fn unit_factor(column: &str) -> f64 {
    for token in column.split('_') {
        match token {
            "mt" | "mtpa" | "mtoe" => return 1000.0,
            "kt" | "ktpa" => return 1.0,
            "t" | "tpa" | "tonnes" => return 0.001,
            _ => {}
        }
    }
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_column() {
        assert_eq!(normalize_column(" Project name "), "project_name");
        assert_eq!(normalize_column("Date online"), "date_online");
        assert_eq!(normalize_column("Value (€/kg)"), "value_kg");
        assert_eq!(normalize_column("Min-max (Eur/kg)"), "min_max_eur_kg");
        assert_eq!(normalize_column("demand (Mtpa H_2)"), "demand_mtpa_h_2");
        assert_eq!(normalize_column("Capacity_kt H2/y"), "capacity_kt_h2_y");
        assert_eq!(normalize_column("___"), "");
    }

    #[test]
    fn test_normalize_headers_deduplicates() {
        let raw = vec![
            "Status".to_string(),
            "status".to_string(),
            "".to_string(),
            "STATUS ".to_string(),
        ];
        assert_eq!(
            normalize_headers(&raw),
            vec!["status", "status_2", "column_3", "status_3"]
        );
    }

    #[test]
    fn test_missing_tokens() {
        assert!(is_missing(""));
        assert!(is_missing("  N/A "));
        assert!(is_missing("NaN"));
        assert!(!is_missing("0"));
    }

    #[test]
    fn test_parse_number_variants() {
        assert_eq!(parse_number("3,5"), Some(3.5));
        assert_eq!(parse_number("1,234.5"), Some(1234.5));
        assert_eq!(parse_number("1,234,567"), Some(1234567.0));
        assert_eq!(parse_number(" €4.20 "), Some(4.2));
        assert_eq!(parse_number("12%"), Some(12.0));
        assert_eq!(parse_number("n.a."), None);
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number("inf"), None);
    }

    #[test]
    fn test_parse_year() {
        assert_eq!(parse_year("2020.0"), Some(2020));
        assert_eq!(parse_year("2027"), Some(2027));
        assert_eq!(parse_year("2027.5"), None);
        assert_eq!(parse_year(""), None);
    }

    #[test]
    fn test_parse_range() {
        assert_eq!(parse_range("3,5-4,2"), Some((3.5, 4.2)));
        assert_eq!(parse_range("2.1 – 3.0"), Some((2.1, 3.0)));
        assert_eq!(parse_range("5-4"), Some((4.0, 5.0)));
        assert_eq!(parse_range("4,2"), Some((4.2, 4.2)));
        assert_eq!(parse_range("-"), None);
        assert_eq!(parse_range("x-y"), None);
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case(" oil  refining "), "Oil Refining");
        assert_eq!(title_case("HEAVY-DUTY trucks"), "Heavy-Duty Trucks");
    }

    #[test]
    fn test_join_key() {
        assert_eq!(join_key("  North   America "), "north america");
    }

    #[test]
    fn test_unit_factor() {
        assert_eq!(unit_factor("demand_mtpa_h_2"), 1000.0);
        assert_eq!(unit_factor("value_ktpa_h_2"), 1.0);
        assert_eq!(unit_factor("demand_t"), 0.001);
        assert_eq!(unit_factor("demand"), 1.0);
    }
}
