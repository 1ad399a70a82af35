//! Price candidates and scoring
//!
//! Every strategy contributes `Candidate`s to a shared pool; the adjustments
//! here are pure functions over the candidate's text, selector, and value so
//! the weights are testable without a DOM.

use serde::Serialize;
use std::collections::HashMap;

use super::currency::SUPPORTED_CURRENCIES;

/// Provenance of a candidate, used for ranking and diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CandidateSource {
    JsonLd,
    RawJson,
    Custom,
    Selector,
    Text,
}

impl CandidateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::JsonLd => "json-ld",
            Self::RawJson => "raw-json",
            Self::Custom => "custom",
            Self::Selector => "selector",
            Self::Text => "text",
        }
    }
}

/// A potential price reading with provenance and score
#[derive(Debug, Clone, Serialize)]
pub struct Candidate {
    pub price: f64,
    pub currency: String,
    pub selector: String,
    pub source: CandidateSource,
    pub score: i32,
    pub snippet: String,
}

/// Base score per strategy
pub mod base_score {
    pub const JSON_LD: i32 = 95;
    pub const RAW_JSON_PAIR: i32 = 90;
    pub const RAW_JSON_AMOUNT: i32 = 88;
    pub const CUSTOM: i32 = 88;
    pub const SELECTOR: i32 = 60;
    pub const TEXT: i32 = 30;
}

const TEXT_PRICE_WORDS: &[&str] =
    &["price", "fiyat", "sale", "deal", "current", "ourprice", "discount"];
const TEXT_COST_NOISE: &[&str] =
    &["shipping", "delivery", "kargo", "installment", "taksit", "monthly", "save"];
const TEXT_META_NOISE: &[&str] =
    &["availability", "website", "url", "vat", "date", "mm/dd/yyyy"];
const TEXT_LAYOUT_NOISE: &[&str] =
    &["width", "height", "margin", "padding", "font", "button", "registry", "spacing"];

const SELECTOR_PRICE_WORDS: &[&str] =
    &["price", "fiyat", "ourprice", "deal", "sale", "discount"];
const SELECTOR_STALE_WORDS: &[&str] = &["old", "strike", "cross", "was", "list", "compare"];

/// Does the text contain a word hinting that the number is a price?
pub fn has_price_word(text: &str) -> bool {
    let lower = text.to_lowercase();
    TEXT_PRICE_WORDS.iter().any(|w| lower.contains(w))
}

/// Score adjustment from the candidate's surrounding text.
pub fn text_adjustment(text: &str) -> i32 {
    let lower = text.to_lowercase();
    let mut delta = 0;
    if TEXT_PRICE_WORDS.iter().any(|w| lower.contains(w)) {
        delta += 25;
    }
    if TEXT_COST_NOISE.iter().any(|w| lower.contains(w)) {
        delta -= 25;
    }
    if TEXT_META_NOISE.iter().any(|w| lower.contains(w)) {
        delta -= 40;
    }
    if TEXT_LAYOUT_NOISE.iter().any(|w| lower.contains(w)) {
        delta -= 45;
    }
    delta
}

/// Is the selector one of the low-precision wildcard probes?
pub fn is_wildcard_selector(selector: &str) -> bool {
    selector.contains("[class*=\"price\"]") || selector.contains("[id*=\"price\"]")
}

/// Score adjustment from the selector the candidate was found under.
pub fn selector_adjustment(selector: &str) -> i32 {
    let lower = selector.to_lowercase();
    let mut delta = 0;
    if SELECTOR_PRICE_WORDS.iter().any(|w| lower.contains(w)) {
        delta += 18;
    }
    if SELECTOR_STALE_WORDS.iter().any(|w| lower.contains(w)) {
        delta -= 20;
    }
    if is_wildcard_selector(selector) {
        delta -= 20;
    }
    delta
}

/// Score adjustment from the parsed value itself.
pub fn value_adjustment(
    price: f64,
    currency: &str,
    preferred_currency: &str,
    source: CandidateSource,
) -> i32 {
    let mut delta = 0;
    if currency != preferred_currency && source != CandidateSource::JsonLd {
        delta -= 12;
    }
    if price < 2.0 && source != CandidateSource::JsonLd {
        delta -= 50;
    }
    if SUPPORTED_CURRENCIES.contains(&currency) {
        delta += 8;
    }
    if price > 0.0 && price < 2_000_000.0 {
        delta += 5;
    }
    delta
}

/// Deduplicate by `(selector, price, currency)`, keeping the highest score,
/// preserving first-seen order among the survivors.
pub fn dedup_candidates(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut best: HashMap<(String, u64, String), usize> = HashMap::new();
    let mut out: Vec<Candidate> = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        let key = (
            candidate.selector.clone(),
            candidate.price.to_bits(),
            candidate.currency.clone(),
        );
        match best.get(&key) {
            Some(&idx) => {
                if candidate.score > out[idx].score {
                    out[idx] = candidate;
                }
            }
            None => {
                best.insert(key, out.len());
                out.push(candidate);
            }
        }
    }
    out
}

/// Rank candidates by score, best first. Stable, so earlier strategies win
/// ties.
pub fn rank_candidates(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| b.score.cmp(&a.score));
}

/// Truncate a value into a display snippet.
pub fn snippet_of(text: &str) -> String {
    let collapsed: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= 120 {
        collapsed
    } else {
        collapsed.chars().take(120).collect()
    }
}
