//! Currency detection and locale-aware number normalization

use regex::Regex;
use std::sync::LazyLock;

/// Currencies the scorer treats as well-known
pub const SUPPORTED_CURRENCIES: &[&str] =
    &["USD", "EUR", "GBP", "TRY", "JPY", "CNY", "CAD", "AUD"];

/// First numeric token in a price string: grouped thousands with an optional
/// decimal tail, or a plain integer/decimal.
static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9]{1,3}(?:[.,\s][0-9]{3})*(?:[.,][0-9]{1,2})|[0-9]+(?:[.,][0-9]{1,2})?)")
        .expect("number regex")
});

/// Turkish retailers known to price in TRY regardless of TLD
const TR_RETAILERS: &[&str] = &["trendyol", "hepsiburada", "n11", "ciceksepeti", "teknosa"];

/// Detect an explicit currency marker in the text itself.
///
/// Returns `None` when the text carries no symbol or ISO code; callers fall
/// back to the host-preferred currency.
pub fn detect_currency(text: &str) -> Option<&'static str> {
    let upper = text.to_uppercase();
    if text.contains('₺') || has_code(&upper, "TRY") || has_code(&upper, "TL") {
        return Some("TRY");
    }
    if text.contains('€') || has_code(&upper, "EUR") {
        return Some("EUR");
    }
    if text.contains('£') || has_code(&upper, "GBP") {
        return Some("GBP");
    }
    if has_code(&upper, "CNY") || has_code(&upper, "RMB") {
        return Some("CNY");
    }
    if text.contains('¥') || has_code(&upper, "JPY") {
        // ¥ is ambiguous between JPY and CNY; CNY was ruled out above
        return Some("JPY");
    }
    if has_code(&upper, "CAD") {
        return Some("CAD");
    }
    if has_code(&upper, "AUD") {
        return Some("AUD");
    }
    if text.contains('$') || has_code(&upper, "USD") {
        return Some("USD");
    }
    None
}

/// Alphabetic codes only count when they stand alone, so "title" is not
/// Turkish lira and "country" is not TRY.
fn has_code(upper: &str, code: &str) -> bool {
    upper.split(|c: char| !c.is_ascii_alphabetic()).any(|w| w == code)
}

/// Currency a host is expected to price in, used as the fallback when the
/// text has no explicit marker.
pub fn preferred_currency(host: &str) -> &'static str {
    let host = host.to_lowercase();
    if host.ends_with(".tr") || TR_RETAILERS.iter().any(|r| host.contains(r)) {
        return "TRY";
    }
    if host.ends_with("amazon.de") || host.ends_with("amazon.fr") || host.ends_with("amazon.it")
        || host.ends_with("amazon.es") || host.ends_with("amazon.nl")
    {
        return "EUR";
    }
    if host.ends_with("amazon.co.uk") {
        return "GBP";
    }
    if host.ends_with("amazon.co.jp") || host.ends_with("amazon.jp") {
        return "JPY";
    }
    if host.ends_with("amazon.ca") {
        return "CAD";
    }
    if host.ends_with("amazon.com.au") {
        return "AUD";
    }
    "USD"
}

/// First numeric token in a text fragment.
pub fn first_number(text: &str) -> Option<&str> {
    NUMBER_RE.find(text).map(|m| m.as_str())
}

/// Count distinct numeric tokens; fragments with several numbers and no
/// currency marker are usually spec rows, not prices.
pub fn count_numbers(text: &str) -> usize {
    NUMBER_RE.find_iter(text).count()
}

/// Parse a raw numeric token into a price, deciding which separator is the
/// decimal point from the currency's locale conventions.
///
/// Returns `None` unless the result is a finite positive number.
pub fn normalize_number(raw: &str, currency: &str) -> Option<f64> {
    let raw = raw.trim().replace(' ', "");
    if raw.is_empty() {
        return None;
    }

    let turkish_like = currency == "TRY";
    let dot = raw.rfind('.');
    let comma = raw.rfind(',');

    let cleaned = match (dot, comma) {
        (Some(d), Some(c)) => {
            // The later separator is the decimal point; the other groups thousands
            if d > c {
                raw.replace(',', "")
            } else {
                raw.replace('.', "").replace(',', ".")
            }
        }
        (None, Some(c)) => {
            let tail = raw.len() - c - 1;
            if turkish_like || tail == 2 {
                raw.replace(',', ".")
            } else {
                raw.replace(',', "")
            }
        }
        (Some(d), None) => {
            let tail = raw.len() - d - 1;
            if turkish_like && tail == 3 {
                raw.replace('.', "")
            } else {
                raw
            }
        }
        (None, None) => raw,
    };

    let value: f64 = cleaned.parse().ok()?;
    if value.is_finite() && value > 0.0 {
        Some(value)
    } else {
        None
    }
}
