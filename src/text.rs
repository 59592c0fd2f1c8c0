use std::collections::BTreeMap;

use regex::RegexBuilder;

// ---------------------------------------------------------------------------
// Label normalization
// ---------------------------------------------------------------------------

/// Convert a raw category value to Pascal Case, treating underscores as word
/// separators: `road_traffic accident` → `Road Traffic Accident`.
pub fn to_pascal_case(text: &str) -> String {
    text.replace('_', " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Insert spaces into a PascalCase column name, keeping acronyms together:
/// `VMDProductNo` → `VMD Product No`.
pub fn split_pascal_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if i > 0 && c.is_uppercase() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).map(|n| n.is_lowercase()).unwrap_or(false);
            if prev.is_lowercase() || (prev.is_uppercase() && next_is_lower) {
                out.push(' ');
            }
        }
        out.push(c);
    }
    out
}

// ---------------------------------------------------------------------------
// Abbreviation annotation
// ---------------------------------------------------------------------------

/// One span of an annotated note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Plain(String),
    /// A recognised abbreviation and its expansion, rendered with a hover
    /// tooltip by the UI.
    Abbrev { text: String, meaning: String },
}

/// Split free text into plain spans and recognised abbreviations.
/// Matching is whole-word and case-insensitive; the map's keys are expected
/// uppercased (see `loader::load_abbreviations`).
pub fn annotate_abbreviations(text: &str, abbreviations: &BTreeMap<String, String>) -> Vec<Segment> {
    if text.is_empty() {
        return Vec::new();
    }
    if abbreviations.is_empty() {
        return vec![Segment::Plain(text.to_string())];
    }

    let pattern = format!(
        r"\b({})\b",
        abbreviations
            .keys()
            .map(|k| regex::escape(k))
            .collect::<Vec<String>>()
            .join("|")
    );
    let regex = match RegexBuilder::new(&pattern).case_insensitive(true).build() {
        Ok(re) => re,
        // An unbuildable pattern only happens with degenerate config input;
        // fall back to unannotated text.
        Err(_) => return vec![Segment::Plain(text.to_string())],
    };

    let mut segments = Vec::new();
    let mut cursor = 0;
    for hit in regex.find_iter(text) {
        if hit.start() > cursor {
            segments.push(Segment::Plain(text[cursor..hit.start()].to_string()));
        }
        let meaning = abbreviations
            .get(&hit.as_str().to_uppercase())
            .cloned()
            .unwrap_or_else(|| "Unknown abbreviation".to_string());
        segments.push(Segment::Abbrev {
            text: hit.as_str().to_string(),
            meaning,
        });
        cursor = hit.end();
    }
    if cursor < text.len() {
        segments.push(Segment::Plain(text[cursor..].to_string()));
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abbrevs() -> BTreeMap<String, String> {
        [
            ("RTA".to_string(), "road traffic accident".to_string()),
            ("BAR".to_string(), "bright, alert, responsive".to_string()),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn pascal_case_handles_underscores_and_mixed_case() {
        assert_eq!(to_pascal_case("vaccination"), "Vaccination");
        assert_eq!(to_pascal_case("road_traffic accident"), "Road Traffic Accident");
        assert_eq!(to_pascal_case("GASTROENTERIC"), "Gastroenteric");
        assert_eq!(to_pascal_case(""), "");
    }

    #[test]
    fn pascal_names_split_on_word_boundaries() {
        assert_eq!(split_pascal_case("VMDProductNo"), "VMD Product No");
        assert_eq!(split_pascal_case("TargetSpecies"), "Target Species");
        assert_eq!(split_pascal_case("MAHolder"), "MA Holder");
        assert_eq!(split_pascal_case("Name"), "Name");
    }

    #[test]
    fn annotation_matches_whole_words_case_insensitively() {
        let segments = annotate_abbreviations("seen after rta, now bar.", &abbrevs());
        assert_eq!(
            segments,
            vec![
                Segment::Plain("seen after ".to_string()),
                Segment::Abbrev {
                    text: "rta".to_string(),
                    meaning: "road traffic accident".to_string()
                },
                Segment::Plain(", now ".to_string()),
                Segment::Abbrev {
                    text: "bar".to_string(),
                    meaning: "bright, alert, responsive".to_string()
                },
                Segment::Plain(".".to_string()),
            ]
        );
    }

    #[test]
    fn partial_words_are_not_annotated() {
        let segments = annotate_abbreviations("barbiturate given", &abbrevs());
        assert_eq!(
            segments,
            vec![Segment::Plain("barbiturate given".to_string())]
        );
    }

    #[test]
    fn empty_inputs_produce_no_annotations() {
        assert!(annotate_abbreviations("", &abbrevs()).is_empty());
        assert_eq!(
            annotate_abbreviations("no change", &BTreeMap::new()),
            vec![Segment::Plain("no change".to_string())]
        );
    }
}
