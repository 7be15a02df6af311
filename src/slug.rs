//! SEO-friendly filename slugs.
//!
//! - `"Red Running Shoe"` → `"red-running-shoe"`
//! - `"summer_sale__2026!"` → `"summer-sale-2026"`
//! - `"产品 照片"` → `"chan-pin-zhao-pian"` (one toneless pinyin syllable per ideograph)
//! - `"!!!"` → `"image"`

use pinyin::ToPinyin;

const FALLBACK: &str = "image";

fn is_cjk(c: char) -> bool {
    ('\u{4E00}'..='\u{9FA5}').contains(&c)
}

/// Turn an arbitrary name into a lowercase, hyphenated, filename-safe slug.
///
/// Total: never fails, never returns an empty string.
pub fn optimize_filename(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.trim().chars().flat_map(char::to_lowercase) {
        if is_cjk(c) {
            if let Some(syllable) = c.to_pinyin() {
                if !slug.is_empty() {
                    slug.push('-');
                }
                // `ü` has no ASCII form; `v` is the usual pinyin keyboard spelling.
                slug.push_str(&syllable.plain().replace('ü', "v"));
                pending_dash = true;
            }
            continue;
        }
        let c = if c.is_whitespace() || c == '_' { '-' } else { c };
        if c == '-' {
            pending_dash = true;
        } else if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        }
    }

    if slug.is_empty() {
        FALLBACK.to_string()
    } else {
        slug
    }
}
