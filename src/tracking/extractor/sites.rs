//! Site adapters: high-precision selector lists for known retailers
//!
//! Update these when a retailer changes its page structure; capture an HTML
//! sample and extend the corresponding fixture test alongside.

/// Price selectors that work across most storefronts
pub const GENERIC_PRICE_SELECTORS: &[&str] = &[
    "meta[itemprop=\"price\"]",
    "meta[property=\"product:price:amount\"]",
    "meta[property=\"og:price:amount\"]",
    "[itemprop=\"price\"]",
    ".a-price .a-offscreen",
    "#priceblock_ourprice",
    "#priceblock_dealprice",
    "[class*=\"price\"]",
    "[id*=\"price\"]",
];

/// Amazon buy-box price selectors, in precision order
pub const AMAZON_PRICE_SELECTORS: &[&str] = &[
    "#corePrice_feature_div .a-price .a-offscreen",
    "#corePriceDisplay_desktop_feature_div .a-price .a-offscreen",
    "#corePrice_desktop .a-price .a-offscreen",
    "#priceblock_ourprice",
    "#priceblock_dealprice",
    "#priceblock_saleprice",
    "#price_inside_buybox",
    "#apex_desktop .a-price .a-offscreen",
    "[data-a-id=\"twister-plus-price-data-price\"]",
];

/// Trendyol
pub const TRENDYOL_PRICE_SELECTORS: &[&str] = &[".prc-dsc", ".prc-slg"];

/// Hepsiburada
pub const HEPSIBURADA_PRICE_SELECTORS: &[&str] = &[
    "[data-test-id=\"price-current-price\"]",
    "[data-test-id=\"default-price\"]",
];

/// Is this host part of the Amazon storefront family (any ccTLD)?
pub fn is_amazon_host(host: &str) -> bool {
    host.to_lowercase()
        .split('.')
        .any(|label| label == "amazon")
}

/// Selector list for a host: adapter selectors first, then the generic base.
/// Amazon hosts get only Amazon and meta selectors; its pages embed too many
/// installment and per-unit prices for the wildcard probes to be safe.
pub fn selectors_for_host(host: &str) -> Vec<&'static str> {
    let lower = host.to_lowercase();
    let mut selectors: Vec<&'static str> = Vec::new();

    if is_amazon_host(&lower) {
        selectors.extend(AMAZON_PRICE_SELECTORS);
        selectors.extend(
            GENERIC_PRICE_SELECTORS
                .iter()
                .filter(|s| s.starts_with("meta[")),
        );
        return selectors;
    }

    if lower.contains("trendyol") {
        selectors.extend(TRENDYOL_PRICE_SELECTORS);
    }
    if lower.contains("hepsiburada") {
        selectors.extend(HEPSIBURADA_PRICE_SELECTORS);
    }
    selectors.extend(GENERIC_PRICE_SELECTORS);
    selectors
}

/// Selectors allowed to win on Amazon hosts. Anything else is installment,
/// per-unit, or third-party listing noise.
pub fn amazon_selector_allowed(selector: &str) -> bool {
    selector.starts_with("#corePrice")
        || selector.starts_with("#priceblock_")
        || selector.starts_with("#price_inside_buybox")
        || selector.starts_with("#apex_")
        || selector.contains("twister-plus-price-data-price")
        || selector.starts_with("meta[itemprop=\"price\"]")
        || selector.starts_with("meta[property=\"og:price:amount\"]")
        || selector.starts_with("meta[property=\"product:price:amount\"]")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amazon_host_family() {
        assert!(is_amazon_host("www.amazon.com"));
        assert!(is_amazon_host("amazon.co.uk"));
        assert!(is_amazon_host("www.amazon.com.tr"));
        assert!(is_amazon_host("smile.amazon.de"));
        assert!(!is_amazon_host("amazonia-plants.com"));
        assert!(!is_amazon_host("www.trendyol.com"));
    }

    #[test]
    fn amazon_selector_set_has_no_wildcards() {
        for sel in selectors_for_host("www.amazon.com") {
            assert!(
                !sel.contains("[class*="),
                "wildcard selector leaked into amazon set: {sel}"
            );
            assert!(!sel.contains("[id*="), "wildcard selector leaked: {sel}");
        }
    }

    #[test]
    fn adapter_selectors_precede_generic() {
        let selectors = selectors_for_host("www.trendyol.com");
        assert_eq!(selectors[0], ".prc-dsc");
        assert!(selectors.contains(&"[itemprop=\"price\"]"));
    }

    #[test]
    fn amazon_gate() {
        assert!(amazon_selector_allowed("#corePrice_feature_div .a-price .a-offscreen"));
        assert!(amazon_selector_allowed("#priceblock_ourprice"));
        assert!(amazon_selector_allowed("meta[itemprop=\"price\"]"));
        assert!(!amazon_selector_allowed("[class*=\"price\"]"));
        assert!(!amazon_selector_allowed(".a-price .a-offscreen"));
    }
}
