use regex::Regex;
use std::sync::OnceLock;

fn newline_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\r\n]+").expect("valid newline regex"))
}

fn whitespace_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace regex"))
}

// Word characters, whitespace, the Arabic block and the sentence terminals
// the segmenter splits on.
fn outside_alphabet() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[^\w\s\x{0600}-\x{06FF}.?!]").expect("valid alphabet regex")
    })
}

/// Produces the single-line canonical form of extracted text.
pub fn normalize_text(text: &str) -> String {
    let single_line = newline_runs().replace_all(text, " ");
    let stripped = outside_alphabet().replace_all(&single_line, " ");
    let collapsed = whitespace_runs().replace_all(&stripped, " ");
    collapsed.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::normalize_text;

    #[test]
    fn newlines_and_spaces_collapse() {
        let input = "A  \t  lot\n\n\nof   spacing\r\n";
        assert_eq!(normalize_text(input), "A lot of spacing");
    }

    #[test]
    fn symbols_outside_the_alphabet_become_spaces() {
        assert_eq!(normalize_text("cost: $5 (approx) — fine!"), "cost 5 approx fine!");
    }

    #[test]
    fn arabic_text_and_punctuation_survive() {
        let input = "ما هي أهمية العلم؟ العلم نور، والجهل ظلام.";
        assert_eq!(normalize_text(input), input);
    }

    #[test]
    fn normalization_is_idempotent() {
        let samples = [
            "",
            "   ",
            "plain text",
            "Line one.\nLine two?\n\nLine three!",
            "«اقتباس» — مع رموز * و # و @",
            "tabs\tand\u{a0}nbsp\u{2003}em-space",
            "...???!!!",
            "mixed العربية and English, 123_456.",
            "\u{feff}bom and \u{200f}rtl marks",
        ];

        for sample in samples {
            let once = normalize_text(sample);
            assert_eq!(normalize_text(&once), once, "sample {sample:?}");
            assert!(!once.contains('\n'));
            assert_eq!(once.trim(), once);
        }
    }
}
