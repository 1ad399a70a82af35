//! End-to-end extraction scenarios over realistic page fixtures

use url::Url;

use pricewatch::tracking::extractor::{CandidateSource, PriceExtractor};
use pricewatch::tracking::FxTable;
use pricewatch::StockStatus;

fn extract(html: &str, hint: Option<&str>, url: &str) -> pricewatch::tracking::Extraction {
    PriceExtractor::new().extract(html, hint, &Url::parse(url).unwrap())
}

#[test]
fn shopify_style_page_with_meta_price() {
    let html = r#"<html><head>
        <meta itemprop="price" content="199.99">
        <meta itemprop="priceCurrency" content="USD">
        </head><body>
        <h1>Ceramic Pour-Over Kettle</h1>
        <button type="submit" name="add" class="product-form__submit">Add to Cart</button>
        </body></html>"#;

    let ex = extract(html, None, "https://shop.example.com/products/kettle");
    assert_eq!(ex.price, Some(199.99));
    assert_eq!(ex.currency, "USD");
    assert_eq!(ex.availability.status, StockStatus::InStock);
    assert!(ex.availability.confidence >= 74);
    assert!(ex.confidence >= 74);
}

#[test]
fn amazon_listing_core_price_beats_sidebar_price() {
    let html = r#"<html><body>
        <div id="corePrice_feature_div">
          <span class="a-price"><span class="a-offscreen">$1,299.00</span></span>
        </div>
        <div class="sidebar"><span class="price">$17.99/mo</span></div>
        <button id="add-to-cart-button" name="submit.add-to-cart">Add to Cart</button>
        </body></html>"#;

    let ex = extract(html, None, "https://www.amazon.com/dp/B0EXAMPLE");
    assert_eq!(ex.price, Some(1299.0));
    assert_eq!(ex.currency, "USD");
    assert!(ex.selector_used.unwrap().contains("corePrice"));
    assert_eq!(ex.availability.status, StockStatus::InStock);
}

#[test]
fn amazon_unqualified_buybox_reports_null_price() {
    let html = r#"<html><body>
        <div id="corePrice_feature_div">
          <span class="a-price"><span class="a-offscreen">$499.00</span></span>
        </div>
        <div id="unqualifiedBuyBox_feature_div">
          <a role="button" aria-label="See All Buying Options">See All Buying Options</a>
        </div>
        </body></html>"#;

    let ex = extract(html, None, "https://www.amazon.com/dp/B0EXAMPLE");
    assert_eq!(ex.price, None);
    assert_eq!(ex.availability.status, StockStatus::OutOfStock);
    assert!(ex.confidence >= 88);
}

#[test]
fn turkish_retailer_price_and_usd_conversion() {
    let html = r#"<html><body>
        <div class="product-price-container"><span class="prc-dsc">1.299,90 TL</span></div>
        <button class="add-to-basket">Sepete Ekle</button>
        </body></html>"#;

    let ex = extract(html, None, "https://www.trendyol.com/marka/urun-p-1");
    assert_eq!(ex.price, Some(1299.9));
    assert_eq!(ex.currency, "TRY");

    let fx = FxTable::new("http://127.0.0.1:0/unused");
    let rate = fx.rate("TRY").unwrap();
    let usd = fx.to_usd(ex.price.unwrap(), &ex.currency).unwrap();
    assert!((usd - 1299.9 / rate).abs() < 1e-9);
}

#[test]
fn json_ld_pair_appears_and_wins() {
    let html = r#"<html><head>
        <script type="application/ld+json">
        {"@context":"https://schema.org","@type":"Product","name":"Lamp",
         "offers":{"@type":"Offer","price":"89.00","priceCurrency":"EUR"}}
        </script></head><body>
        <span class="price">€119.00</span>
        </body></html>"#;

    let ex = extract(html, None, "https://shop.example.de/p/lamp");
    assert_eq!(ex.price, Some(89.0));
    assert_eq!(ex.currency, "EUR");
    assert_eq!(ex.source, Some(CandidateSource::JsonLd));
    // The json-ld candidate must be present among the suggestions too
    assert!(ex
        .suggestions
        .iter()
        .any(|s| s.source == CandidateSource::JsonLd && s.price == 89.0));
}

#[test]
fn higher_scored_json_ld_pair_wins_among_json_ld() {
    // Two offers; both are json-ld, ranking falls back to adjustments,
    // and the result must still come from json-ld
    let html = r#"<html><head>
        <script type="application/ld+json">
        {"@type":"Product","offers":[
          {"price":"49.00","priceCurrency":"USD"},
          {"price":"1.50","priceCurrency":"USD"}]}
        </script></head><body></body></html>"#;

    let ex = extract(html, None, "https://shop.example.com/p/x");
    assert_eq!(ex.source, Some(CandidateSource::JsonLd));
    assert_eq!(ex.price, Some(49.0));
}

#[test]
fn amazon_never_selects_wildcard_candidates() {
    // A page with nothing but wildcard-reachable prices yields no price on
    // an Amazon host
    let html = r#"<html><body>
        <span class="deal-price">$23.99</span>
        <div id="lowPriceBadge">$19.99</div>
        </body></html>"#;

    let ex = extract(html, None, "https://www.amazon.co.uk/dp/B0EXAMPLE");
    assert_eq!(ex.price, None);

    // The same page on a generic host extracts fine
    let ex = extract(html, None, "https://shop.example.com/p/1");
    assert!(ex.price.is_some());
}

#[test]
fn variant_page_with_disabled_button_is_in_stock() {
    let html = r#"<html><body>
        <span class="size-label">Select Size</span>
        <select id="size-select" name="size">
          <option value="">Choose</option>
          <option value="42">42</option>
          <option value="43">43</option>
        </select>
        <button class="add-to-cart" disabled>Add to Cart</button>
        <span class="price-now">€74.95</span>
        </body></html>"#;

    let ex = extract(html, None, "https://shop.example.de/p/shoe");
    assert_eq!(ex.availability.status, StockStatus::InStock);
    assert!(ex.availability.confidence >= 72);
    assert_eq!(ex.price, Some(74.95));
}

#[test]
fn structured_oos_token_outweighs_enabled_button() {
    let html = r#"<html><head>
        <script type="application/ld+json">
        {"@type":"Product","offers":{"price":"30.00","priceCurrency":"USD",
         "availability":"https://schema.org/OutOfStock"}}
        </script></head><body>
        <button>Add to Cart</button>
        </body></html>"#;

    let ex = extract(html, None, "https://shop.example.com/p/1");
    assert_eq!(ex.availability.status, StockStatus::OutOfStock);
    assert!(ex.availability.confidence >= 94);
    // Non-Amazon host: the residual price is still reported
    assert_eq!(ex.price, Some(30.0));
}

#[test]
fn hepsiburada_data_test_id_selector() {
    let html = r#"<html><body>
        <span data-test-id="price-current-price">2.449,00 TL</span>
        </body></html>"#;

    let ex = extract(html, None, "https://www.hepsiburada.com/urun-p-ABC");
    assert_eq!(ex.price, Some(2449.0));
    assert_eq!(ex.currency, "TRY");
}

#[test]
fn custom_selector_hint_beats_generic_probes() {
    let html = r#"<html><body>
        <div class="price">$99.00</div>
        <div id="actual-price">$79.00</div>
        </body></html>"#;

    let ex = extract(html, Some("actual-price"), "https://shop.example.com/p/1");
    assert_eq!(ex.price, Some(79.0));
    assert_eq!(ex.source, Some(CandidateSource::Custom));
}
