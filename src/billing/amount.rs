//! Разбор суммы из свободного текста.
//!
//! Понимает `"1 000 руб"`, `"500р"` или `"2к"`. Сокращение `к` просто
//! заменяется на `000`, поэтому `"1к5"` это 10005, а `"1кк"` миллион.

const CURRENCY_WORD: &str = "руб";
const CURRENCY_LETTER: &str = "р";
const THOUSAND: &str = "к";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{input:?} is not a recognizable amount")]
pub struct ParseFailure {
    pub input: String,
}

pub fn parse_amount(raw: &str) -> Result<u64, ParseFailure> {
    let normalized: String = raw
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let normalized = normalized
        .replace(CURRENCY_WORD, "")
        .replace(CURRENCY_LETTER, "")
        .replace(THOUSAND, "000");

    if normalized.is_empty() || !normalized.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseFailure { input: raw.to_string() });
    }

    // Здесь может упасть только переполнение.
    normalized
        .parse()
        .map_err(|_| ParseFailure { input: raw.to_string() })
}

/// Число людей для разделения: просто положительное целое.
pub fn parse_people_count(raw: &str) -> Option<u32> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    trimmed.parse().ok().filter(|&count| count >= 1)
}
