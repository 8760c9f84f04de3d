use regex::Regex;

/// Entities left in text that did not come through `scrape::extract_article`
/// (records built from raw HTML fragments or other sources). Scraped text is
/// already decoded.
const ENTITIES: &[(&str, &str)] = &[
    ("&nbsp;", " "),
    ("&amp;", "&"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&rsquo;", "'"),
    ("&lt;", "<"),
    ("&gt;", ">"),
];

/// Strips markup residue and page furniture from scraped transcript text.
pub struct Normalizer {
    tag: Regex,
    furniture: Regex,
    blank_runs: Regex,
}

impl Normalizer {
    pub fn new() -> Self {
        Self {
            tag: Regex::new(r"<[^>]+>").expect("tag pattern"),
            furniture: Regex::new(r"(?im)^[ \t]*(?:image[ \t]+source|advertisement)\b[^\n]*")
                .expect("furniture pattern"),
            blank_runs: Regex::new(r"\n{3,}").expect("blank-run pattern"),
        }
    }

    /// Normalize raw scraped text. Idempotent.
    ///
    /// Every rewrite step only ever shortens the text, so repeating the pass
    /// until nothing changes always terminates and leaves a fixpoint.
    pub fn normalize(&self, raw: &str) -> String {
        let mut current = raw.to_string();
        loop {
            let next = self.pass(&current);
            if next == current {
                return current;
            }
            current = next;
        }
    }

    fn pass(&self, text: &str) -> String {
        let mut out = self.tag.replace_all(text, "").into_owned();
        for (entity, replacement) in ENTITIES {
            if out.contains(entity) {
                out = out.replace(entity, replacement);
            }
        }
        out = out.replace('\u{a0}', " ");
        out = self.furniture.replace_all(&out, "").into_owned();

        let trimmed: Vec<&str> = out.lines().map(str::trim).collect();
        let joined = trimmed.join("\n");
        let collapsed = self.blank_runs.replace_all(&joined, "\n\n");
        collapsed.trim().to_string()
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_tags_and_furniture() {
        let n = Normalizer::new();
        let raw = "<p>Revenue grew <b>strongly</b>.</p>\nImage source: The Motley Fool.\nAdvertisement - scroll to continue\nNext line";
        let out = n.normalize(raw);
        assert_eq!(out, "Revenue grew strongly.\n\nNext line");
    }

    #[test]
    fn test_decodes_entities_in_unscraped_text() {
        let n = Normalizer::new();
        let out = n.normalize("Questions &amp; Answers&nbsp;follow &quot;now&quot;");
        assert_eq!(out, "Questions & Answers follow \"now\"");
    }

    #[test]
    fn test_collapses_blank_runs_and_trims_lines() {
        let n = Normalizer::new();
        let out = n.normalize("  first  \n\n\n\n   \n  second\t\n");
        assert_eq!(out, "first\n\nsecond");
    }

    #[test]
    fn test_advertisement_mid_sentence_is_kept() {
        let n = Normalizer::new();
        let out = n.normalize("Our advertisement revenue rose sharply.");
        assert_eq!(out, "Our advertisement revenue rose sharply.");
    }

    #[test]
    fn test_idempotent_on_nested_markup() {
        let n = Normalizer::new();
        let inputs = [
            "<<b>a>text",
            "&lt;b&gt;bold&lt;/b&gt; words",
            "x\n\n\n\n<i>\n\n\n</i>\n\ny",
            "  Image source: x\n\n\nAdvertisement\n  body  ",
            "",
            "\u{a0}\u{a0}spaced\u{a0}",
        ];
        for input in inputs {
            let once = n.normalize(input);
            assert_eq!(n.normalize(&once), once, "input: {:?}", input);
        }
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(Normalizer::new().normalize("   \n\n  "), "");
    }
}
