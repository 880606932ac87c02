//! Text helpers shared by formatters: truncation, tag stripping, numbers.
//!
//! Truncation contract: text over its budget is cut at the budget, suffixed
//! with [`ELLIPSIS`], and the full text is kept for the tooltip. A character
//! budget `B` never shows more than `B + 1` characters.

use super::fragment::Fragment;
use once_cell::sync::Lazy;
use regex::Regex;

pub const ELLIPSIS: char = '…';

static TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static SCRIPTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)\s*>").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Cuts `text` to at most `budget` characters. A zero budget disables truncation.
pub fn truncate_chars(text: &str, budget: usize) -> Fragment {
    let text = text.trim();
    if text.is_empty() {
        return Fragment::Empty;
    }
    if budget == 0 || text.chars().count() <= budget {
        return Fragment::text(text);
    }
    let mut shown: String = text.chars().take(budget).collect();
    shown = shown.trim_end().to_string();
    shown.push(ELLIPSIS);
    Fragment::Truncated {
        shown,
        full: text.to_string(),
    }
}

/// Cuts `text` to at most `budget` words.
pub fn truncate_words(text: &str, budget: usize) -> Fragment {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Fragment::Empty;
    }
    let full = words.join(" ");
    if budget == 0 || words.len() <= budget {
        return Fragment::Text(full);
    }
    let mut shown = words[..budget].join(" ");
    shown.push(ELLIPSIS);
    Fragment::Truncated { shown, full }
}

/// Removes markup and decodes entities, collapsing whitespace.
pub fn strip_tags(html: &str) -> String {
    let without_scripts = SCRIPTS.replace_all(html, " ");
    let without_tags = TAGS.replace_all(&without_scripts, " ");
    let decoded = html_escape::decode_html_entities(&without_tags);
    WHITESPACE.replace_all(decoded.trim(), " ").into_owned()
}

pub fn word_count(html: &str) -> usize {
    strip_tags(html).split_whitespace().count()
}

/// Formats a number with fixed decimals, optionally grouping thousands with commas.
pub fn format_number(value: f64, decimals: usize, grouping: bool) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i.to_string(), Some(f.to_string())),
        None => (formatted, None),
    };

    let int_part = if grouping {
        let digits: Vec<char> = int_part.chars().collect();
        let mut grouped = String::new();
        for (i, c) in digits.iter().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(*c);
        }
        grouped
    } else {
        int_part
    };

    let negative = value < 0.0 && formatted_is_nonzero(&int_part, frac_part.as_deref());
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&int_part);
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(&frac);
    }
    out
}

fn formatted_is_nonzero(int_part: &str, frac: Option<&str>) -> bool {
    int_part.chars().any(|c| c.is_ascii_digit() && c != '0')
        || frac.is_some_and(|f| f.chars().any(|c| c != '0'))
}

/// Amount with a currency symbol: whole amounts without decimals, others with two.
pub fn format_money(value: f64, symbol: &str) -> String {
    let decimals = if value.fract() == 0.0 { 0 } else { 2 };
    let number = format_number(value, decimals, true);
    match number.strip_prefix('-') {
        Some(rest) => format!("-{}{}", symbol, rest),
        None => format!("{}{}", symbol, number),
    }
}

/// Plain numeric amount for export: no symbol, no grouping.
pub fn format_amount(value: f64) -> String {
    let decimals = if value.fract() == 0.0 { 0 } else { 2 };
    format_number(value, decimals, false)
}

pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut size = bytes as f64 / 1024.0;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{:.0} {}", size, UNITS[unit])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}

/// "1 item", "3 items".
pub fn plural(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{} {}", count, singular)
    } else {
        format!("{} {}", count, plural)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_respects_budget() {
        let text = "The quick brown fox jumps over the lazy dog";
        for budget in 1..text.len() {
            match truncate_chars(text, budget) {
                Fragment::Truncated { shown, full } => {
                    assert!(shown.chars().count() <= budget + 1);
                    assert!(shown.ends_with(ELLIPSIS));
                    assert_eq!(full, text);
                }
                Fragment::Text(t) => assert_eq!(t, text),
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn short_text_is_not_truncated() {
        assert_eq!(truncate_chars("short", 10), Fragment::text("short"));
        assert_eq!(truncate_chars("unbounded", 0), Fragment::text("unbounded"));
        assert_eq!(truncate_chars("   ", 5), Fragment::Empty);
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        match truncate_chars("ñandú über café", 5) {
            Fragment::Truncated { shown, .. } => assert_eq!(shown, "ñandú…"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn word_truncation() {
        assert_eq!(
            truncate_words("one two  three four", 2),
            Fragment::Truncated {
                shown: "one two…".into(),
                full: "one two three four".into()
            }
        );
        assert_eq!(truncate_words("one two", 5), Fragment::text("one two"));
    }

    #[test]
    fn strip_tags_decodes_and_collapses() {
        assert_eq!(
            strip_tags("<p>A <strong>bright</strong>\n loft &amp; studio</p><script>x()</script>"),
            "A bright loft & studio"
        );
        assert_eq!(word_count("<p>one <em>two</em> three</p>"), 3);
    }

    #[test]
    fn number_formatting() {
        assert_eq!(format_number(1234567.891, 2, true), "1,234,567.89");
        assert_eq!(format_number(999.0, 0, true), "999");
        assert_eq!(format_number(-1500.0, 0, true), "-1,500");
        assert_eq!(format_number(-0.001, 2, false), "0.00");
        assert_eq!(format_number(1234.5, 1, false), "1234.5");
    }

    #[test]
    fn money_formatting() {
        assert_eq!(format_money(180.0, "$"), "$180");
        assert_eq!(format_money(1299.5, "€"), "€1,299.50");
        assert_eq!(format_money(-5.0, "$"), "-$5");
        assert_eq!(format_amount(95.0), "95");
        assert_eq!(format_amount(4.25), "4.25");
    }

    #[test]
    fn human_sizes() {
        assert_eq!(human_size(512), "512 B");
        assert_eq!(human_size(245760), "240 KB");
        assert_eq!(human_size(1048576), "1.0 MB");
    }
}
