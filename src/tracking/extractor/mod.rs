//! Price extraction from product page HTML
//!
//! Collects candidates from structured data, raw-JSON probes, user selector
//! hints, site-adapter selectors, and a text heuristic, then deduplicates
//! and ranks them. Availability classification runs over the same parse.

pub mod availability;
pub mod candidate;
pub mod currency;
pub mod sites;
pub mod terms;

pub use availability::Availability;
pub use candidate::{Candidate, CandidateSource};

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use url::Url;

use crate::types::StockStatus;
use candidate::{
    base_score, dedup_candidates, has_price_word, is_wildcard_selector, rank_candidates,
    selector_adjustment, snippet_of, text_adjustment, value_adjustment,
};
use currency::{count_numbers, detect_currency, first_number, normalize_number, preferred_currency};
use sites::{amazon_selector_allowed, is_amazon_host, selectors_for_host};

/// Longest text fragment considered a price reading
const MAX_VALUE_LEN: usize = 220;
/// Body descendants scanned by the text heuristic
const TEXT_SCAN_CAP: usize = 1200;
/// Candidates surfaced as suggestions
const SUGGESTION_COUNT: usize = 5;
/// Availability confidence at which an Amazon out-of-stock verdict
/// suppresses the extracted price
const OOS_SUPPRESSION_CONFIDENCE: u8 = 80;

/// Result of extracting a single page
#[derive(Debug, Clone, Serialize)]
pub struct Extraction {
    pub price: Option<f64>,
    pub currency: String,
    pub confidence: u8,
    pub selector_used: Option<String>,
    pub source: Option<CandidateSource>,
    pub suggestions: Vec<Candidate>,
    pub availability: Availability,
}

/// Multi-strategy price extractor
pub struct PriceExtractor {
    raw_amount_re: Regex,
    raw_pair_re: Regex,
}

impl Default for PriceExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PriceExtractor {
    pub fn new() -> Self {
        Self {
            raw_amount_re: Regex::new(r#""priceAmount"\s*:\s*"([0-9][0-9., ]{0,18})""#)
                .expect("raw amount regex"),
            raw_pair_re: Regex::new(
                r#"(?s)"price"\s*:\s*"([0-9][0-9., ]{0,18})".{0,200}?"priceCurrency"\s*:\s*"([A-Z]{3})""#,
            )
            .expect("raw pair regex"),
        }
    }

    /// Extract a price and availability verdict from fetched HTML.
    pub fn extract(&self, html: &str, selector_hint: Option<&str>, url: &Url) -> Extraction {
        let doc = Html::parse_document(html);
        let host = url.host_str().unwrap_or_default().to_string();
        let preferred = preferred_currency(&host);
        let amazon = is_amazon_host(&host);

        let mut pool: Vec<Candidate> = Vec::new();
        collect_json_ld(&doc, preferred, &mut pool);
        if !amazon {
            self.collect_raw_json(html, preferred, &mut pool);
        }
        if let Some(hint) = selector_hint {
            collect_custom(&doc, hint, preferred, &mut pool);
        }
        collect_site_selectors(&doc, &host, preferred, &mut pool);
        if !amazon {
            collect_text_heuristic(&doc, preferred, &mut pool);
        }

        let availability = availability::classify(&doc, url);

        let mut pool = dedup_candidates(pool);
        if amazon {
            // Amazon pages embed installment, per-unit, and listing prices
            // that would win on loose selectors; keep only trusted selectors
            // and on-currency values, and never let a wildcard probe through.
            pool.retain(|c| {
                !is_wildcard_selector(&c.selector)
                    && (amazon_selector_allowed(&c.selector) || c.currency == preferred)
            });
        }
        rank_candidates(&mut pool);

        let suggestions: Vec<Candidate> = pool.iter().take(SUGGESTION_COUNT).cloned().collect();
        let best = pool.first();

        // A confident Amazon out-of-stock verdict means any surviving price
        // is stale list-price bleed-through from a dead buy box.
        let suppress = amazon
            && availability.status == StockStatus::OutOfStock
            && availability.confidence >= OOS_SUPPRESSION_CONFIDENCE;

        match (best, suppress) {
            (Some(best), false) => Extraction {
                price: Some(best.price),
                currency: best.currency.clone(),
                confidence: best.score.clamp(0, 100) as u8,
                selector_used: Some(best.selector.clone()),
                source: Some(best.source),
                suggestions,
                availability,
            },
            (Some(best), true) => Extraction {
                price: None,
                currency: best.currency.clone(),
                confidence: availability.confidence,
                selector_used: Some(best.selector.clone()),
                source: Some(best.source),
                suggestions,
                availability,
            },
            (None, _) => Extraction {
                price: None,
                currency: preferred.to_string(),
                confidence: if suppress { availability.confidence } else { 0 },
                selector_used: None,
                source: None,
                suggestions,
                availability,
            },
        }
    }

    /// Raw-JSON probes over the unparsed HTML; catches prices embedded in
    /// hydration payloads. Too noisy for Amazon, which is skipped upstream.
    fn collect_raw_json(&self, html: &str, preferred: &str, pool: &mut Vec<Candidate>) {
        for caps in self.raw_pair_re.captures_iter(html).take(8) {
            let raw = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let ccy = caps.get(2).map(|m| m.as_str()).unwrap_or(preferred);
            if let Some(price) = normalize_number(raw, ccy) {
                pool.push(make_candidate(
                    price,
                    ccy,
                    "raw:price+priceCurrency",
                    CandidateSource::RawJson,
                    base_score::RAW_JSON_PAIR,
                    raw,
                    preferred,
                ));
            }
        }
        for caps in self.raw_amount_re.captures_iter(html).take(8) {
            let raw = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            if let Some(price) = normalize_number(raw, preferred) {
                pool.push(make_candidate(
                    price,
                    preferred,
                    "raw:priceAmount",
                    CandidateSource::RawJson,
                    base_score::RAW_JSON_AMOUNT,
                    raw,
                    preferred,
                ));
            }
        }
    }
}

/// Build a candidate and apply the cumulative scoring adjustments.
fn make_candidate(
    price: f64,
    currency: &str,
    selector: &str,
    source: CandidateSource,
    base: i32,
    text: &str,
    preferred: &str,
) -> Candidate {
    let score = base
        + text_adjustment(text)
        + selector_adjustment(selector)
        + value_adjustment(price, currency, preferred, source);
    Candidate {
        price,
        currency: currency.to_string(),
        selector: selector.to_string(),
        source,
        score,
        snippet: snippet_of(text),
    }
}

/// Read a candidate value off an element: machine-readable attributes first,
/// visible text last.
fn element_value(el: &ElementRef) -> String {
    let v = el.value();
    v.attr("content")
        .or_else(|| v.attr("data-price"))
        .or_else(|| v.attr("aria-label"))
        .map(str::to_string)
        .unwrap_or_else(|| el.text().collect::<Vec<_>>().join(" "))
}

/// Shared candidate-construction rules for DOM-derived values.
fn candidate_from_value(
    value: &str,
    selector: &str,
    source: CandidateSource,
    base: i32,
    preferred: &str,
) -> Option<Candidate> {
    let value = value.trim();
    if value.is_empty() || value.len() > MAX_VALUE_LEN {
        return None;
    }

    let explicit = detect_currency(value);
    let currency = explicit.unwrap_or(preferred);

    // Several numbers and no currency marker: a spec row, not a price
    if count_numbers(value) > 2 && explicit.is_none() {
        return None;
    }
    // Bare text needs either a marker or a price-like word nearby
    if source == CandidateSource::Text && explicit.is_none() && !has_price_word(value) {
        return None;
    }

    let raw = first_number(value)?;
    let price = normalize_number(raw, currency)?;
    Some(make_candidate(price, currency, selector, source, base, value, preferred))
}

/// JSON-LD `offers` traversal; the most trusted source.
fn collect_json_ld(doc: &Html, preferred: &str, pool: &mut Vec<Candidate>) {
    let Ok(selector) = Selector::parse("script[type=\"application/ld+json\"]") else {
        return;
    };
    for script in doc.select(&selector) {
        let raw: String = script.text().collect();
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(&raw) {
            walk_json_offers(&value, preferred, pool);
        }
    }
}

fn walk_json_offers(value: &serde_json::Value, preferred: &str, pool: &mut Vec<Candidate>) {
    match value {
        serde_json::Value::Object(map) => {
            if let Some(offers) = map.get("offers") {
                let offer_nodes: Vec<&serde_json::Value> = match offers {
                    serde_json::Value::Array(items) => items.iter().collect(),
                    other => vec![other],
                };
                for offer in offer_nodes {
                    push_offer_candidate(offer, preferred, pool);
                }
            }
            for v in map.values() {
                walk_json_offers(v, preferred, pool);
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                walk_json_offers(item, preferred, pool);
            }
        }
        _ => {}
    }
}

fn push_offer_candidate(offer: &serde_json::Value, preferred: &str, pool: &mut Vec<Candidate>) {
    let Some(map) = offer.as_object() else { return };

    let currency = map
        .get("priceCurrency")
        .and_then(|v| v.as_str())
        .unwrap_or(preferred)
        .to_string();

    for field in ["price", "lowPrice", "highPrice"] {
        let Some(value) = map.get(field) else { continue };
        let price = match value {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => normalize_number(s, &currency),
            _ => None,
        };
        let Some(price) = price else { continue };
        if !(price.is_finite() && price > 0.0) {
            continue;
        }
        pool.push(make_candidate(
            price,
            &currency,
            "script[type=\"application/ld+json\"]",
            CandidateSource::JsonLd,
            base_score::JSON_LD,
            &format!("{field}={price} {currency}"),
            preferred,
        ));
    }
}

/// Expand a user hint into the selector spellings people actually mean.
fn collect_custom(doc: &Html, hint: &str, preferred: &str, pool: &mut Vec<Candidate>) {
    let hint = hint.trim();
    if hint.is_empty() {
        return;
    }
    let spellings = [
        hint.to_string(),
        format!("#{hint}"),
        format!(".{hint}"),
        format!("[data-test-id=\"{hint}\"]"),
        format!("[data-testid=\"{hint}\"]"),
    ];
    for spelling in &spellings {
        let Ok(selector) = Selector::parse(spelling) else { continue };
        for el in doc.select(&selector).take(3) {
            let value = element_value(&el);
            if let Some(candidate) = candidate_from_value(
                &value,
                spelling,
                CandidateSource::Custom,
                base_score::CUSTOM,
                preferred,
            ) {
                pool.push(candidate);
            }
        }
    }
}

/// Site-adapter and generic selector probes.
fn collect_site_selectors(doc: &Html, host: &str, preferred: &str, pool: &mut Vec<Candidate>) {
    for sel in selectors_for_host(host) {
        let Ok(selector) = Selector::parse(sel) else { continue };
        for el in doc.select(&selector).take(4) {
            let value = element_value(&el);
            if let Some(candidate) = candidate_from_value(
                &value,
                sel,
                CandidateSource::Selector,
                base_score::SELECTOR,
                preferred,
            ) {
                pool.push(candidate);
            }
        }
    }
}

/// Last-ditch scan of short body text fragments for price-ish tokens.
fn collect_text_heuristic(doc: &Html, preferred: &str, pool: &mut Vec<Candidate>) {
    let Ok(body_sel) = Selector::parse("body *") else { return };

    for el in doc.select(&body_sel).take(TEXT_SCAN_CAP) {
        // Own text only; descendants get their own visit
        let own_text: String = el
            .children()
            .filter_map(|c| c.value().as_text().map(|t| t.trim()))
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if own_text.len() < 2 || own_text.len() > 140 {
            continue;
        }
        if !looks_priceish(&own_text) {
            continue;
        }

        let selector = pseudo_selector(&el);
        if let Some(candidate) = candidate_from_value(
            &own_text,
            &selector,
            CandidateSource::Text,
            base_score::TEXT,
            preferred,
        ) {
            pool.push(candidate);
        }
    }
}

/// Quick filter before the text heuristic pays for full candidate
/// construction.
fn looks_priceish(text: &str) -> bool {
    if text.chars().any(|c| matches!(c, '₺' | '$' | '€' | '£' | '¥')) {
        return true;
    }
    let upper = text.to_uppercase();
    if ["TRY", "USD", "EUR", "GBP", "JPY", " TL"].iter().any(|c| upper.contains(c)) {
        return true;
    }
    has_price_word(text)
}

/// A readable selector-ish label for a text-heuristic hit.
fn pseudo_selector(el: &ElementRef) -> String {
    let v = el.value();
    let tag = v.name();
    if let Some(id) = v.id() {
        return format!("{tag}#{id}");
    }
    if let Some(class) = v.classes().next() {
        return format!("{tag}.{class}");
    }
    tag.to_string()
}
