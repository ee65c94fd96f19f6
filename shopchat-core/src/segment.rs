// ABOUTME: Heuristic that decides where a product carousel is spliced into bot reply text
// ABOUTME: Phrase priorities and split extension thresholds are declarative tables

use crate::message::Product;

/// Lowercased substrings that make a reply eligible for an inline carousel
pub const TRIGGER_WORDS: &[&str] = &["recommendations", "products", "help"];

/// Introductory phrases, most specific first. The first one found wins.
pub const INTRO_PHRASES: &[&str] = &[
    "here are some products that might be helpful",
    "here are some product recommendations",
    "here are some recommendations",
    "now, here are some products",
    "here are some products",
    "product recommendations that can help",
    "recommendations that can help",
    "products that might help",
    "some products that",
    "recommendations:",
    "here are products",
    "some product recommendations",
    "product suggestions",
    "recommended products",
    "these products",
];

/// How far past a matched phrase the split point may move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtensionRule {
    pub delimiter: &'static str,
    /// The delimiter must start fewer than this many characters after the phrase
    pub window: usize,
    /// Skip whitespace following the delimiter
    pub skip_whitespace: bool,
}

/// Tried in order; the first rule whose delimiter falls inside its window applies
pub const EXTENSION_RULES: &[ExtensionRule] = &[
    ExtensionRule {
        delimiter: ":",
        window: 30,
        skip_whitespace: true,
    },
    ExtensionRule {
        delimiter: "\n\n",
        window: 100,
        skip_whitespace: false,
    },
    ExtensionRule {
        delimiter: "\n",
        window: 50,
        skip_whitespace: false,
    },
    ExtensionRule {
        delimiter: ".",
        window: 100,
        skip_whitespace: true,
    },
];

/// Byte offset in the full reply text where the carousel goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitPoint {
    offset: usize,
    phrase: Option<&'static str>,
}

impl SplitPoint {
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The introductory phrase that anchored the split, if any matched
    pub fn phrase(&self) -> Option<&'static str> {
        self.phrase
    }

    /// Split the full reply into the text before and after the carousel
    pub fn split<'a>(&self, full: &'a str) -> (&'a str, &'a str) {
        self.apply(full)
    }

    /// Split a partially revealed prefix of the reply. The "after" part stays
    /// empty until the reveal has passed the split point.
    pub fn apply<'a>(&self, displayed: &'a str) -> (&'a str, &'a str) {
        let cut = self.offset.min(displayed.len());
        let after = if displayed.len() > self.offset {
            &displayed[self.offset..]
        } else {
            ""
        };
        (&displayed[..cut], after)
    }

    /// Whether the carousel should be drawn for the given reveal progress
    pub fn carousel_visible(&self, displayed_len: usize, typing: bool) -> bool {
        !typing || displayed_len >= self.offset
    }
}

/// Decide whether and where to embed the carousel.
///
/// Returns `None` when the reply has no products or none of the trigger
/// words, in which case nothing is embedded inline. When a reply qualifies
/// but no introductory phrase matches, the split point is the end of text.
pub fn segment(text: &str, products: &[Product]) -> Option<SplitPoint> {
    if products.is_empty() {
        return None;
    }
    // ASCII folding keeps byte offsets identical between `text` and `lower`
    let lower = text.to_ascii_lowercase();
    if !TRIGGER_WORDS.iter().any(|word| lower.contains(word)) {
        return None;
    }
    Some(find_split_point(text, &lower))
}

fn find_split_point(text: &str, lower: &str) -> SplitPoint {
    for &phrase in INTRO_PHRASES {
        if let Some(start) = lower.find(phrase) {
            let phrase_end = start + phrase.len();
            return SplitPoint {
                offset: extend_split(text, phrase_end),
                phrase: Some(phrase),
            };
        }
    }
    SplitPoint {
        offset: text.len(),
        phrase: None,
    }
}

fn extend_split(text: &str, phrase_end: usize) -> usize {
    let rest = &text[phrase_end..];
    for rule in EXTENSION_RULES {
        let Some(idx) = rest.find(rule.delimiter) else {
            continue;
        };
        if rest[..idx].chars().count() >= rule.window {
            continue;
        }
        let offset = phrase_end + idx + rule.delimiter.len();
        return if rule.skip_whitespace {
            skip_whitespace(text, offset)
        } else {
            offset
        };
    }
    phrase_end
}

fn skip_whitespace(text: &str, from: usize) -> usize {
    text[from..]
        .char_indices()
        .find(|(_, c)| !c.is_whitespace())
        .map(|(i, _)| from + i)
        .unwrap_or(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn products() -> Vec<Product> {
        vec![Product {
            id: "1".to_string(),
            name: "Serum".to_string(),
            ..Default::default()
        }]
    }

    fn split(text: &str) -> (String, String) {
        let point = segment(text, &products()).expect("segmentation should apply");
        let (before, after) = point.split(text);
        (before.to_string(), after.to_string())
    }

    #[test]
    fn test_colon_split_skips_whitespace() {
        let (before, after) = split("Here are some recommendations: item A, item B");
        assert!(before.ends_with("recommendations: "));
        assert_eq!(before.trim_end(), "Here are some recommendations:");
        assert_eq!(after, "item A, item B");
    }

    #[test]
    fn test_no_trigger_means_no_segmentation() {
        let text = "Drink water and sleep well.";
        assert!(segment(text, &products()).is_none());
    }

    #[test]
    fn test_no_products_means_no_segmentation() {
        assert!(segment("Here are some recommendations: A", &[]).is_none());
    }

    #[test]
    fn test_trigger_without_phrase_splits_at_end() {
        let text = "I hope this helps your routine.";
        let point = segment(text, &products()).unwrap();
        assert_eq!(point.offset(), text.len());
        assert!(point.phrase().is_none());
        assert_eq!(point.split(text).1, "");
    }

    #[test]
    fn test_specific_phrase_beats_generic() {
        let text = "Here are some products that might be helpful for you:\n- A";
        let point = segment(text, &products()).unwrap();
        assert_eq!(
            point.phrase(),
            Some("here are some products that might be helpful")
        );
        assert_eq!(point.split(text).1, "- A");
    }

    #[test]
    fn test_double_newline_extension() {
        let text = "Here are some product recommendations for oily skin\n\nCOSRX cleanser";
        let (before, after) = split(text);
        assert!(before.ends_with("oily skin\n\n"));
        assert_eq!(after, "COSRX cleanser");
    }

    #[test]
    fn test_single_newline_extension() {
        let text = "These products work well\nSerum one";
        let (before, after) = split(text);
        assert_eq!(before, "These products work well\n");
        assert_eq!(after, "Serum one");
    }

    #[test]
    fn test_period_extension_skips_whitespace() {
        let text = "Try these products for a calmer complexion. Use daily.";
        let (before, after) = split(text);
        assert_eq!(before, "Try these products for a calmer complexion. ");
        assert_eq!(after, "Use daily.");
    }

    #[test]
    fn test_colon_outside_window_falls_through() {
        let pad = "x".repeat(30);
        let text = format!("These products {}: tail. More", pad);
        let point = segment(&text, &products()).unwrap();
        let (before, after) = point.split(&text);
        // Colon is 31 chars past the phrase, so the period rule applies
        assert!(before.ends_with("tail. "));
        assert_eq!(after, "More");
    }

    #[test]
    fn test_no_extension_splits_at_phrase_end() {
        let text = "Check recommended products";
        let point = segment(text, &products()).unwrap();
        assert_eq!(point.offset(), text.len());
        assert_eq!(point.phrase(), Some("recommended products"));
    }

    #[test]
    fn test_apply_during_reveal() {
        let text = "Here are some recommendations: item A";
        let point = segment(text, &products()).unwrap();
        let partial = &text[..10];
        assert_eq!(point.apply(partial), (partial, ""));
        assert!(!point.carousel_visible(partial.len(), true));
        assert!(point.carousel_visible(partial.len(), false));
        assert!(point.carousel_visible(point.offset(), true));
    }

    #[test]
    fn test_non_ascii_text_keeps_char_boundaries() {
        let text = "✨ Here are some recommendations: সিরাম";
        let (before, after) = split(text);
        assert!(before.starts_with('✨'));
        assert_eq!(after, "সিরাম");
    }
}
