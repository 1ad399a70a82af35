//! Multilingual availability term tables and text folding
//!
//! All availability matching runs over folded text: lowercase, diacritics
//! stripped, Turkish dotless ı mapped to i, whitespace collapsed. The term
//! lists below are stored pre-folded.

/// Out-of-stock phrases. Longer phrases carry more weight in the fuzzy match.
pub const OUT_OF_STOCK_TERMS: &[&str] = &[
    // English
    "out of stock",
    "sold out",
    "currently unavailable",
    "temporarily out of stock",
    "no longer available",
    "discontinued",
    "unavailable",
    "notify me when available",
    "back in stock soon",
    "email me when available",
    // Turkish (folded)
    "stokta yok",
    "tukendi",
    "stoklar tukendi",
    "mevcut degil",
    "satista degil",
    "gelince haber ver",
    // German
    "ausverkauft",
    "nicht verfugbar",
    "derzeit nicht verfugbar",
    // Spanish
    "agotado",
    "no disponible",
    // French
    "rupture de stock",
    "epuise",
    "indisponible",
    // Portuguese
    "esgotado",
    // Italian
    "esaurito",
    "non disponibile",
    // Dutch
    "niet op voorraad",
    "uitverkocht",
    // Polish
    "brak w magazynie",
    "niedostepny",
    // Russian (transliterated)
    "net v nalichii",
];

/// In-stock phrases.
pub const IN_STOCK_TERMS: &[&str] = &[
    // English
    "in stock",
    "available now",
    "ready to ship",
    "ships today",
    "add to cart",
    "add to basket",
    "buy now",
    // Turkish (folded)
    "stokta",
    "stokta var",
    "sepete ekle",
    "hemen al",
    "satin al",
    // German
    "auf lager",
    "sofort lieferbar",
    // Spanish / French / Portuguese / Italian
    "disponible",
    "en stock",
    "disponivel",
    "disponibile",
    // Dutch
    "op voorraad",
    // Polish
    "dostepny",
    // Russian (transliterated)
    "v nalichii",
];

/// Purchase-action labels, folded.
pub const PURCHASE_TERMS: &[&str] = &[
    "add to cart",
    "add to basket",
    "addtocart",
    "add-to-cart",
    "buy now",
    "buynow",
    "buy-now",
    "checkout",
    "sepete ekle",
    "hemen al",
    "satin al",
];

/// "See all buying options" style labels: the primary offer is gone and only
/// marketplace listings remain.
pub const BUYING_OPTIONS_TERMS: &[&str] = &[
    "see all buying options",
    "see buying options",
    "view buying options",
    "satin alma seceneklerini gor",
    "tum satin alma seceneklerini gor",
];

/// Back-in-stock notification labels.
pub const NOTIFY_TERMS: &[&str] = &[
    "notify me",
    "email me",
    "alert me",
    "haber ver",
    "gelince haber ver",
];

/// Variant-selection prompts shown instead of a live purchase button.
pub const VARIANT_PROMPT_TERMS: &[&str] = &[
    "select size",
    "choose size",
    "select a size",
    "select colour",
    "select color",
    "choose an option",
    "select an option",
    "beden sec",
    "beden seciniz",
    "numara sec",
    "renk sec",
];

/// Attribute fragments that mark a variant selector widget.
pub const VARIANT_ATTR_TERMS: &[&str] =
    &["size", "beden", "numara", "renk", "color", "colour", "variant", "option"];

/// Keyboard modifier words; on Amazon a "buy now" string next to one of these
/// is shortcut help text, not a purchase button.
pub const MODIFIER_TERMS: &[&str] = &["shift", "alt", "ctrl", "cmd"];

/// Fold text for term matching: lowercase, strip diacritics, map Turkish
/// dotless ı to i, collapse runs of whitespace to single spaces.
pub fn fold_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = true;
    for c in text.chars() {
        if c.is_whitespace() {
            if !last_was_space {
                out.push(' ');
                last_was_space = true;
            }
            continue;
        }
        last_was_space = false;
        for folded in fold_char(c) {
            out.push(folded);
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

/// Fold a single character to its ASCII base form where one exists.
///
/// Lowercasing İ produces `i` plus a combining dot above, which is dropped.
fn fold_char(c: char) -> impl Iterator<Item = char> {
    c.to_lowercase().filter_map(|l| {
        let mapped = match l {
            'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' => 'a',
            'ç' | 'ć' | 'č' => 'c',
            'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ę' => 'e',
            'ğ' => 'g',
            'ì' | 'í' | 'î' | 'ï' | 'ı' => 'i',
            'ł' => 'l',
            'ñ' | 'ń' => 'n',
            'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' => 'o',
            'ś' | 'ş' | 'š' => 's',
            'ù' | 'ú' | 'û' | 'ü' | 'ū' => 'u',
            'ý' | 'ÿ' => 'y',
            'ź' | 'ż' | 'ž' => 'z',
            '\u{0307}' => return None,
            other => other,
        };
        Some(mapped)
    })
}

/// Does the folded haystack contain any of the (pre-folded) terms?
pub fn contains_term<'a>(folded: &str, terms: &[&'a str]) -> Option<&'a str> {
    terms.iter().find(|t| folded.contains(*t)).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_lowercases_and_collapses_whitespace() {
        assert_eq!(fold_text("  Out   OF\n Stock "), "out of stock");
    }

    #[test]
    fn fold_strips_diacritics() {
        assert_eq!(fold_text("Ausverkauft / nicht verfügbar"), "ausverkauft / nicht verfugbar");
        assert_eq!(fold_text("épuisé"), "epuise");
        assert_eq!(fold_text("indisponível"), "indisponivel");
    }

    #[test]
    fn fold_handles_turkish() {
        assert_eq!(fold_text("Stokta Yok"), "stokta yok");
        assert_eq!(fold_text("TÜKENDİ"), "tukendi");
        assert_eq!(fold_text("Satın Al"), "satin al");
        assert_eq!(fold_text("Beden Seçiniz"), "beden seciniz");
    }

    #[test]
    fn term_lookup_matches_folded_input() {
        let folded = fold_text("Bu ürün TÜKENDİ");
        assert_eq!(contains_term(&folded, OUT_OF_STOCK_TERMS), Some("tukendi"));

        let folded = fold_text("Sepete Ekle");
        assert_eq!(contains_term(&folded, PURCHASE_TERMS), Some("sepete ekle"));

        let folded = fold_text("regular description");
        assert_eq!(contains_term(&folded, OUT_OF_STOCK_TERMS), None);
    }

    #[test]
    fn term_tables_are_prefolded() {
        for list in [
            OUT_OF_STOCK_TERMS,
            IN_STOCK_TERMS,
            PURCHASE_TERMS,
            BUYING_OPTIONS_TERMS,
            NOTIFY_TERMS,
            VARIANT_PROMPT_TERMS,
        ] {
            for term in list {
                assert_eq!(&fold_text(term), term, "term not pre-folded: {term}");
            }
        }
    }
}
