//! In-stock / out-of-stock classification
//!
//! Evidence is accumulated into an [`AvailabilitySignals`] aggregate from
//! structured data, textual selectors, action elements, variant widgets, and
//! Amazon-specific page structure; [`arbitrate`] is a pure function over the
//! aggregate so the decision order is testable in isolation.

use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use url::Url;

use super::sites::is_amazon_host;
use super::terms::{
    contains_term, fold_text, BUYING_OPTIONS_TERMS, IN_STOCK_TERMS, MODIFIER_TERMS, NOTIFY_TERMS,
    OUT_OF_STOCK_TERMS, PURCHASE_TERMS, VARIANT_ATTR_TERMS, VARIANT_PROMPT_TERMS,
};
use crate::types::StockStatus;

/// Maximum action elements inspected per page
const ACTION_ELEMENT_CAP: usize = 160;

/// Structured availability tokens, matched against compacted
/// (alphanumeric-only) attribute and JSON-LD values
const STRUCTURED_OOS_TOKENS: &[&str] = &[
    "outofstock",
    "soldout",
    "discontinued",
    "currentlyunavailable",
    "temporarilyunavailable",
    "notinstock",
    "unavailable",
    "preorder",
    "backorder",
];
const STRUCTURED_IS_TOKENS: &[&str] = &["instock", "limitedavailability", "availablefororder"];

/// Strong phrasings for the Amazon availability-blob fallback
const AMAZON_OOS_BLOB_TERMS: &[&str] = &[
    "currently unavailable",
    "out of stock",
    "temporarily out of stock",
    "know when or if",
];

/// Classification result
#[derive(Debug, Clone, Serialize)]
pub struct Availability {
    pub status: StockStatus,
    pub confidence: u8,
    pub reason: String,
    pub source: String,
}

impl Availability {
    fn unknown() -> Self {
        Self {
            status: StockStatus::Unknown,
            confidence: 0,
            reason: String::new(),
            source: String::new(),
        }
    }
}

/// One directional signal with provenance
#[derive(Debug, Clone, Default)]
pub struct Signal {
    pub score: u8,
    pub reason: String,
    pub source: String,
}

impl Signal {
    fn raise(&mut self, score: u8, reason: &str, source: &str) {
        if score > self.score {
            self.score = score;
            self.reason = reason.to_string();
            self.source = source.to_string();
        }
    }
}

/// Mutable evidence aggregate threaded through the collectors
#[derive(Debug, Clone, Default)]
pub struct AvailabilitySignals {
    pub best_in: Signal,
    pub best_out: Signal,
    /// Structured OOS token value, confidence 94 when present
    pub structured_out: Option<String>,
    /// Structured in-stock token value, confidence 90 when present
    pub structured_in: Option<String>,
    pub has_enabled_purchase: bool,
    pub has_disabled_purchase: bool,
    pub has_buying_options: bool,
    pub requires_variant_selection: bool,
    pub has_variant_selectors: bool,
}

const STRUCTURED_OOS_CONFIDENCE: u8 = 94;
const STRUCTURED_IS_CONFIDENCE: u8 = 90;

/// Classify a parsed page.
pub fn classify(doc: &Html, url: &Url) -> Availability {
    let amazon = is_amazon_host(url.host_str().unwrap_or_default());
    let mut signals = AvailabilitySignals::default();

    collect_structured(doc, &mut signals);
    collect_textual(doc, &mut signals);
    collect_actions(doc, amazon, &mut signals);
    collect_variants(doc, &mut signals);
    if amazon {
        collect_amazon_structure(doc, &mut signals);
    }

    let amazon_blob_hit = if amazon { amazon_blob_scan(doc) } else { None };
    arbitrate(&signals, amazon, amazon_blob_hit)
}

/// Decision order over the aggregate; first matching rule wins.
pub fn arbitrate(
    signals: &AvailabilitySignals,
    amazon: bool,
    amazon_blob_hit: Option<String>,
) -> Availability {
    let s = signals;

    // A disabled purchase button next to a variant selector usually means
    // "pick a size first", not "sold out".
    if (s.requires_variant_selection || s.has_variant_selectors)
        && s.has_disabled_purchase
        && !s.has_enabled_purchase
        && s.best_out.score < 92
        && s.structured_out.is_none()
    {
        return Availability {
            status: StockStatus::InStock,
            confidence: s.best_in.score.max(72),
            reason: "variant selection required before purchase".to_string(),
            source: "variant-gate".to_string(),
        };
    }

    if let Some(token) = &s.structured_out {
        let in_conf = s.structured_in.as_ref().map(|_| STRUCTURED_IS_CONFIDENCE);
        if in_conf.is_none() || STRUCTURED_OOS_CONFIDENCE >= in_conf.unwrap() + 2 {
            return Availability {
                status: StockStatus::OutOfStock,
                confidence: STRUCTURED_OOS_CONFIDENCE,
                reason: token.clone(),
                source: "structured".to_string(),
            };
        }
    }

    if let Some(token) = &s.structured_in {
        return Availability {
            status: StockStatus::InStock,
            confidence: STRUCTURED_IS_CONFIDENCE,
            reason: token.clone(),
            source: "structured".to_string(),
        };
    }

    if s.has_enabled_purchase && !s.has_disabled_purchase && s.best_out.score < 88 {
        return Availability {
            status: StockStatus::InStock,
            confidence: s.best_in.score.max(74),
            reason: "enabled purchase action".to_string(),
            source: "purchase-action".to_string(),
        };
    }

    if s.best_out.score >= 82 && s.best_out.score >= s.best_in.score + 10 {
        return Availability {
            status: StockStatus::OutOfStock,
            confidence: s.best_out.score,
            reason: s.best_out.reason.clone(),
            source: s.best_out.source.clone(),
        };
    }

    if s.best_in.score >= 72 && s.best_in.score >= s.best_out.score + 6 {
        return Availability {
            status: StockStatus::InStock,
            confidence: s.best_in.score,
            reason: s.best_in.reason.clone(),
            source: s.best_in.source.clone(),
        };
    }

    if s.has_disabled_purchase && s.best_out.score >= 74 {
        return Availability {
            status: StockStatus::OutOfStock,
            confidence: s.best_out.score,
            reason: "disabled purchase action".to_string(),
            source: "purchase-action-disabled".to_string(),
        };
    }

    if amazon {
        if let Some(phrase) = amazon_blob_hit {
            return Availability {
                status: StockStatus::OutOfStock,
                confidence: s.best_out.score.max(90),
                reason: phrase,
                source: "amazon-availability-text".to_string(),
            };
        }

        // Only an offer-listing affordance: the primary offer is gone.
        if s.has_buying_options && !s.has_enabled_purchase && s.best_in.score < 78 {
            return Availability {
                status: StockStatus::OutOfStock,
                confidence: s.best_out.score.max(84),
                reason: "only buying options remain".to_string(),
                source: "buying-options-only".to_string(),
            };
        }
    }

    Availability {
        confidence: s.best_in.score.max(s.best_out.score),
        ..Availability::unknown()
    }
}

/// Compact a structured value for token matching: fold, drop everything that
/// is not alphanumeric.
fn compact(value: &str) -> String {
    fold_text(value)
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

fn structured_token(value: &str) -> Option<(bool, &'static str)> {
    let compacted = compact(value);
    if let Some(t) = STRUCTURED_OOS_TOKENS.iter().find(|t| compacted.contains(*t)) {
        return Some((false, *t));
    }
    if let Some(t) = STRUCTURED_IS_TOKENS.iter().find(|t| compacted.contains(*t)) {
        return Some((true, *t));
    }
    None
}

fn record_structured(signals: &mut AvailabilitySignals, value: &str) {
    if let Some((in_stock, token)) = structured_token(value) {
        if in_stock {
            signals.structured_in.get_or_insert_with(|| token.to_string());
        } else {
            signals.structured_out.get_or_insert_with(|| token.to_string());
        }
    }
}

/// Meta/link availability attributes and JSON-LD availability strings.
fn collect_structured(doc: &Html, signals: &mut AvailabilitySignals) {
    for (sel, attr) in [
        ("meta[itemprop=\"availability\"]", "content"),
        ("link[itemprop=\"availability\"]", "href"),
        ("meta[property=\"product:availability\"]", "content"),
    ] {
        if let Ok(selector) = Selector::parse(sel) {
            for el in doc.select(&selector) {
                if let Some(value) = el.value().attr(attr) {
                    record_structured(signals, value);
                }
            }
        }
    }

    if let Ok(selector) = Selector::parse("script[type=\"application/ld+json\"]") {
        for script in doc.select(&selector) {
            let raw: String = script.text().collect();
            if let Ok(value) = serde_json::from_str::<serde_json::Value>(&raw) {
                walk_json_availability(&value, signals);
            }
        }
    }
}

fn walk_json_availability(value: &serde_json::Value, signals: &mut AvailabilitySignals) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, v) in map {
                if key == "availability" || key == "offerAvailability" {
                    if let Some(s) = v.as_str() {
                        record_structured(signals, s);
                    }
                }
                walk_json_availability(v, signals);
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                walk_json_availability(item, signals);
            }
        }
        _ => {}
    }
}

/// Textual stock/availability selectors feeding the fuzzy term match.
fn collect_textual(doc: &Html, signals: &mut AvailabilitySignals) {
    let probes: [(&str, &str, u8); 10] = [
        ("#availability", "availability-id", 14),
        ("#availabilityInsideBuyBox_feature_div", "availability-id", 14),
        ("#outOfStock", "availability-id", 14),
        ("[itemprop=\"availability\"]", "availability-itemprop", 12),
        ("[data-stock]", "availability-data", 10),
        ("[data-availability]", "availability-data", 10),
        ("[class*=\"stock\"]", "availability-wildcard", 12),
        ("[class*=\"availability\"]", "availability-wildcard", 12),
        ("[id*=\"stock\"]", "availability-wildcard", 12),
        ("[id*=\"availability\"]", "availability-wildcard", 12),
    ];

    for (sel, source, bonus) in probes {
        let Ok(selector) = Selector::parse(sel) else { continue };
        for el in doc.select(&selector) {
            if !is_visible(&el) {
                continue;
            }
            let text: String = el.text().collect::<Vec<_>>().join(" ");
            if text.trim().is_empty() || text.len() > 600 {
                continue;
            }
            fuzzy_match(&text, source, bonus, signals);
        }
    }
}

/// Fuzzy multilingual term match over folded text. Longer phrases score
/// higher; the source bonus reflects how availability-specific the probe was.
/// An out-of-stock hit shadows the in-stock check for the same fragment:
/// "stokta yok" contains "stokta".
fn fuzzy_match(text: &str, source: &str, bonus: u8, signals: &mut AvailabilitySignals) {
    let folded = fold_text(text);
    if let Some(term) = contains_term(&folded, OUT_OF_STOCK_TERMS) {
        let base = if term.len() >= 10 { 70 } else { 60 };
        signals
            .best_out
            .raise((base + bonus).min(100), term, source);
        return;
    }
    if let Some(term) = contains_term(&folded, IN_STOCK_TERMS) {
        let base = if term.len() >= 10 { 62 } else { 54 };
        signals.best_in.raise((base + bonus).min(100), term, source);
    }
}

/// Skip elements that are hidden from the rendered page.
fn is_visible(el: &ElementRef) -> bool {
    let v = el.value();
    if v.attr("hidden").is_some() {
        return false;
    }
    if v.attr("aria-hidden") == Some("true") {
        return false;
    }
    if let Some(style) = v.attr("style") {
        let style: String = style.to_lowercase().chars().filter(|c| !c.is_whitespace()).collect();
        if style.contains("display:none")
            || style.contains("visibility:hidden")
            || style.contains("opacity:0")
        {
            return false;
        }
    }
    let hidden_classes = ["hidden", "d-none", "sr-only", "visually-hidden"];
    if v.classes().any(|c| hidden_classes.contains(&c)) {
        return false;
    }
    true
}

fn is_disabled(el: &ElementRef) -> bool {
    let v = el.value();
    v.attr("disabled").is_some()
        || v.attr("aria-disabled") == Some("true")
        || v.classes().any(|c| c.contains("disabled"))
}

/// Buttons, submit inputs, and role=button anchors.
fn collect_actions(doc: &Html, amazon: bool, signals: &mut AvailabilitySignals) {
    let Ok(selector) =
        Selector::parse("button, input[type=\"submit\"], a[role=\"button\"], [role=\"button\"]")
    else {
        return;
    };

    for el in doc.select(&selector).take(ACTION_ELEMENT_CAP) {
        if !is_visible(&el) {
            continue;
        }
        let v = el.value();
        let label = v
            .attr("aria-label")
            .map(str::to_string)
            .or_else(|| v.attr("value").map(str::to_string))
            .unwrap_or_else(|| el.text().collect::<Vec<_>>().join(" "));
        let blob = ["id", "name", "class", "data-testid", "data-test-id"]
            .iter()
            .filter_map(|a| v.attr(a))
            .collect::<Vec<_>>()
            .join(" ");

        let folded_label = fold_text(&label);
        let folded_blob = fold_text(&blob);

        let purchase = contains_term(&folded_label, PURCHASE_TERMS)
            .or_else(|| contains_term(&folded_blob, PURCHASE_TERMS));

        // Amazon renders keyboard-shortcut help ("Alt+Shift+B buy now") into
        // offscreen labels; a purchase verb next to a modifier word is chrome.
        let shortcut_chrome = amazon
            && purchase.is_some()
            && contains_term(&folded_label, MODIFIER_TERMS).is_some();

        if let (Some(_), false) = (purchase, shortcut_chrome) {
            if is_disabled(&el) {
                signals.has_disabled_purchase = true;
                signals
                    .best_out
                    .raise(80, "purchase action disabled", "purchase-action-disabled");
            } else {
                signals.has_enabled_purchase = true;
                signals
                    .best_in
                    .raise(78, "purchase action enabled", "purchase-action");
            }
        }

        if contains_term(&folded_label, BUYING_OPTIONS_TERMS).is_some() {
            signals.has_buying_options = true;
            signals
                .best_out
                .raise(68, "buying options action", "buying-options");
        }

        if contains_term(&folded_label, NOTIFY_TERMS).is_some() {
            signals.best_out.raise(74, "notify-me action", "notify-action");
        }

        if contains_term(&folded_label, VARIANT_PROMPT_TERMS).is_some() {
            signals.requires_variant_selection = true;
        }
    }
}

/// `<select>` widgets with several options, or attributes naming a variant
/// dimension.
fn collect_variants(doc: &Html, signals: &mut AvailabilitySignals) {
    let Ok(select_sel) = Selector::parse("select") else { return };
    let Ok(option_sel) = Selector::parse("option") else { return };

    for el in doc.select(&select_sel) {
        if el.select(&option_sel).count() > 1 {
            signals.has_variant_selectors = true;
            return;
        }
        let v = el.value();
        let blob = ["id", "name", "class"]
            .iter()
            .filter_map(|a| v.attr(a))
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        if VARIANT_ATTR_TERMS.iter().any(|t| blob.contains(t)) {
            signals.has_variant_selectors = true;
            return;
        }
    }
}

/// Amazon page structure that signals a missing buy box.
fn collect_amazon_structure(doc: &Html, signals: &mut AvailabilitySignals) {
    if let Ok(sel) = Selector::parse("[id^=\"unqualifiedBuyBox\"]") {
        if doc.select(&sel).next().is_some() {
            signals.has_buying_options = true;
            signals
                .best_out
                .raise(88, "unqualified buy box", "amazon-buybox");
        }
    }

    let offer_listing_probes = [
        "#buybox-see-all-buying-choices",
        "[data-action=\"show-all-offers-display\"]",
        "#all-offers-display",
        "#aod-has-oas-offers",
        "a[href*=\"/gp/offer-listing/\"]",
        "a[href*=\"ref=dp_olp\"]",
    ];
    for probe in offer_listing_probes {
        if let Ok(sel) = Selector::parse(probe) {
            if doc.select(&sel).next().is_some() {
                signals
                    .best_out
                    .raise(72, "offer listing affordance", "amazon-offer-listing");
                break;
            }
        }
    }
}

/// Compact text blob from the availability block, title, and meta
/// description; strong OOS phrasings here settle otherwise ambiguous pages.
fn amazon_blob_scan(doc: &Html) -> Option<String> {
    let mut blob = String::new();
    for sel in ["#availability", "#outOfStock", "title"] {
        if let Ok(selector) = Selector::parse(sel) {
            for el in doc.select(&selector) {
                blob.push_str(&el.text().collect::<Vec<_>>().join(" "));
                blob.push(' ');
            }
        }
    }
    if let Ok(selector) = Selector::parse("meta[name=\"description\"]") {
        for el in doc.select(&selector) {
            if let Some(content) = el.value().attr("content") {
                blob.push_str(content);
                blob.push(' ');
            }
        }
    }

    let folded = fold_text(&blob);
    AMAZON_OOS_BLOB_TERMS
        .iter()
        .find(|t| folded.contains(*t))
        .map(|t| t.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify_str(html: &str, url: &str) -> Availability {
        let doc = Html::parse_document(html);
        classify(&doc, &Url::parse(url).unwrap())
    }

    #[test]
    fn enabled_purchase_button_means_in_stock() {
        let a = classify_str(
            r#"<html><body><button>Add to Cart</button></body></html>"#,
            "https://shop.example.com/p/1",
        );
        assert_eq!(a.status, StockStatus::InStock);
        assert!(a.confidence >= 74);
        assert_eq!(a.source, "purchase-action");
    }

    #[test]
    fn structured_meta_out_of_stock_wins() {
        let a = classify_str(
            r#"<html><head>
                <meta itemprop="availability" content="https://schema.org/OutOfStock">
               </head><body><button>Add to Cart</button></body></html>"#,
            "https://shop.example.com/p/1",
        );
        assert_eq!(a.status, StockStatus::OutOfStock);
        assert_eq!(a.confidence, 94);
        assert_eq!(a.source, "structured");
    }

    #[test]
    fn json_ld_out_of_stock() {
        let a = classify_str(
            r#"<html><head><script type="application/ld+json">
                {"@type":"Product","offers":{"price":"10","availability":"http://schema.org/OutOfStock"}}
               </script></head><body></body></html>"#,
            "https://shop.example.com/p/1",
        );
        assert_eq!(a.status, StockStatus::OutOfStock);
        assert!(a.confidence >= 94);
    }

    #[test]
    fn structured_in_stock_only() {
        let a = classify_str(
            r#"<html><head>
                <link itemprop="availability" href="https://schema.org/InStock">
               </head><body></body></html>"#,
            "https://shop.example.com/p/1",
        );
        assert_eq!(a.status, StockStatus::InStock);
        assert_eq!(a.confidence, 90);
    }

    #[test]
    fn disabled_button_with_variant_select_is_in_stock() {
        let a = classify_str(
            r#"<html><body>
                <span>Select Size</span>
                <select name="size"><option>8</option><option>9</option><option>10</option></select>
                <button disabled>Add to Cart</button>
               </body></html>"#,
            "https://shop.example.com/p/1",
        );
        assert_eq!(a.status, StockStatus::InStock);
        assert!(a.confidence >= 72);
        assert_eq!(a.source, "variant-gate");
    }

    #[test]
    fn disabled_button_alone_is_out_of_stock() {
        let a = classify_str(
            r#"<html><body><button disabled>Add to Cart</button></body></html>"#,
            "https://shop.example.com/p/1",
        );
        assert_eq!(a.status, StockStatus::OutOfStock);
        assert!(a.confidence >= 74);
    }

    #[test]
    fn turkish_oos_text() {
        let a = classify_str(
            r#"<html><body><div class="stock-info">Bu ürün stokta yok</div></body></html>"#,
            "https://www.trendyol.com/p/1",
        );
        assert_eq!(a.status, StockStatus::OutOfStock);
    }

    #[test]
    fn hidden_oos_banner_is_ignored() {
        let a = classify_str(
            r#"<html><body>
                <div class="stock-flag" style="display: none">Out of stock</div>
                <button>Add to Cart</button>
               </body></html>"#,
            "https://shop.example.com/p/1",
        );
        assert_eq!(a.status, StockStatus::InStock);
    }

    #[test]
    fn unqualified_buybox_is_out_of_stock() {
        let a = classify_str(
            r#"<html><body><div id="unqualifiedBuyBox_feature_div">See All Buying Options</div></body></html>"#,
            "https://www.amazon.com/dp/B0TEST",
        );
        assert_eq!(a.status, StockStatus::OutOfStock);
        assert!(a.confidence >= 88);
    }

    #[test]
    fn amazon_shortcut_label_is_not_a_purchase_action() {
        // Keyboard-shortcut chrome must not read as an enabled buy button
        let a = classify_str(
            r#"<html><body>
                <span role="button" aria-label="Buy now shift+alt+b"></span>
                <div id="availability">Currently unavailable.</div>
               </body></html>"#,
            "https://www.amazon.com/dp/B0TEST",
        );
        assert_eq!(a.status, StockStatus::OutOfStock);
    }

    #[test]
    fn amazon_buying_options_without_purchase_is_oos() {
        let a = classify_str(
            r#"<html><body><a role="button" aria-label="See All Buying Options">See All Buying Options</a></body></html>"#,
            "https://www.amazon.com/dp/B0TEST",
        );
        assert_eq!(a.status, StockStatus::OutOfStock);
        assert!(a.confidence >= 84);
    }

    #[test]
    fn bare_page_is_unknown() {
        let a = classify_str(
            "<html><body><p>hello</p></body></html>",
            "https://shop.example.com/p/1",
        );
        assert_eq!(a.status, StockStatus::Unknown);
    }

    #[test]
    fn arbitration_prefers_structured_out_over_weaker_in() {
        let mut s = AvailabilitySignals::default();
        s.structured_out = Some("outofstock".to_string());
        s.structured_in = Some("instock".to_string());
        let a = arbitrate(&s, false, None);
        // 94 >= 90 + 2: out wins
        assert_eq!(a.status, StockStatus::OutOfStock);
        assert_eq!(a.confidence, 94);
    }

    #[test]
    fn arbitration_unknown_carries_best_score() {
        let mut s = AvailabilitySignals::default();
        s.best_out.raise(40, "weak", "availability-wildcard");
        let a = arbitrate(&s, false, None);
        assert_eq!(a.status, StockStatus::Unknown);
        assert_eq!(a.confidence, 40);
    }
}
