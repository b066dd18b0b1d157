//! Modifier template normalization.
//!
//! A bare template like "wave" is ambiguous to an image model. Each semantic tag
//! owns one rule that either recognizes the template as already unambiguous or
//! rewrites it into a topic-anchored phrase. Rules run in tag order, each on the
//! output of the previous one.
//!
//! Table constraints keeping `normalize` idempotent:
//! - every rewrite and affix contains one of its own rule's markers
//! - no exact-match key contains any marker of any rule

/// How a rule rewrites a template it does not recognize.
#[derive(Debug, Clone, Copy)]
enum Affix {
    Prefix(&'static str),
    Suffix(&'static str),
}

#[derive(Debug)]
struct TagRule {
    tag: &'static str,
    /// Substrings showing the template already names the topic
    markers: &'static [&'static str],
    /// Whole-template rewrites, checked before the affix
    rewrites: &'static [(&'static str, &'static str)],
    affix: Affix,
}

impl TagRule {
    fn apply(&self, template: String) -> String {
        if self.markers.iter().any(|m| template.contains(m)) {
            return template;
        }
        if let Some((_, rewrite)) = self.rewrites.iter().find(|(key, _)| *key == template) {
            return rewrite.to_string();
        }
        match self.affix {
            Affix::Prefix(p) => format!("{p}{template}"),
            Affix::Suffix(s) => format!("{template}{s}"),
        }
    }
}

const RULES: &[TagRule] = &[
    TagRule {
        tag: "hair",
        markers: &["hair", "braid", "ponytail", "bangs", "bun"],
        rewrites: &[
            ("wave", "soft loose waves in the hair"),
            ("waves", "soft loose waves in the hair"),
            ("curl", "defined curls in the hair"),
            ("curls", "defined curls in the hair"),
            ("volume", "voluminous hair"),
            ("shine", "glossy shine in the hair"),
            ("length", "long flowing hair"),
        ],
        affix: Affix::Suffix(" in the hair"),
    },
    TagRule {
        tag: "eyes",
        markers: &["eye", "gaze", "iris", "pupil"],
        rewrites: &[("glow", "softly glowing eyes"), ("sparkle", "sparkling eyes")],
        affix: Affix::Suffix(" in the eyes"),
    },
    TagRule {
        tag: "face",
        markers: &["face", "facial", "cheek", "jaw"],
        rewrites: &[],
        affix: Affix::Prefix("facial "),
    },
    TagRule {
        tag: "environment",
        markers: &["environment", "background", "scenery", "setting", "landscape"],
        rewrites: &[("fog", "fog in the background environment")],
        affix: Affix::Suffix(" in the background environment"),
    },
    TagRule {
        tag: "lighting",
        markers: &["light", "illuminat", "shadow"],
        rewrites: &[
            ("rim", "rim lighting"),
            ("warm", "warm lighting"),
            ("soft", "soft diffused lighting"),
        ],
        affix: Affix::Suffix(" lighting"),
    },
    TagRule {
        tag: "camera",
        markers: &["shot", "angle", "camera", "lens", "view", "close-up", "perspective"],
        rewrites: &[
            ("wide", "wide angle shot"),
            ("close", "close-up shot"),
            ("low", "low angle shot"),
        ],
        affix: Affix::Suffix(" camera angle"),
    },
    TagRule {
        tag: "color",
        markers: &["color", "colour", "hue", "tone", "tint"],
        rewrites: &[],
        affix: Affix::Suffix(" color tones"),
    },
    TagRule {
        tag: "materials",
        markers: &["material", "texture", "surface", "made of"],
        rewrites: &[],
        affix: Affix::Suffix(" material texture"),
    },
    TagRule {
        tag: "clothing",
        markers: &["clothing", "outfit", "garment", "wear", "dress", "attire"],
        rewrites: &[],
        affix: Affix::Suffix(" clothing"),
    },
    TagRule {
        tag: "fabric",
        markers: &["fabric", "cloth", "silk", "cotton", "leather", "lace", "weave"],
        rewrites: &[],
        affix: Affix::Suffix(" fabric"),
    },
    TagRule {
        tag: "armor",
        markers: &["armor", "armour", "plate", "mail", "gauntlet", "helm"],
        rewrites: &[],
        affix: Affix::Suffix(" armor plating"),
    },
    TagRule {
        tag: "magic",
        markers: &["magic", "spell", "arcane", "enchant", "rune", "aura"],
        rewrites: &[],
        affix: Affix::Suffix(" magical aura"),
    },
    TagRule {
        tag: "expression",
        markers: &["expression", "smil", "frown", "grin", "pout"],
        rewrites: &[],
        affix: Affix::Suffix(" facial expression"),
    },
    TagRule {
        tag: "pose",
        markers: &["pose", "posture", "stance", "standing", "sitting", "kneel", "leaning"],
        rewrites: &[],
        affix: Affix::Suffix(" pose"),
    },
];

/// Tags with a rewrite rule.
pub fn known_tags() -> impl Iterator<Item = &'static str> {
    RULES.iter().map(|r| r.tag)
}

/// Disambiguate a modifier template using its semantic tags.
///
/// Unknown tags are ignored. Empty templates stay empty.
pub fn normalize<S: AsRef<str>>(template: &str, tags: &[S]) -> String {
    let mut out = template.trim().to_lowercase();
    if out.is_empty() {
        return out;
    }
    for tag in tags {
        let tag = tag.as_ref().trim().to_lowercase();
        if let Some(rule) = RULES.iter().find(|r| r.tag == tag) {
            out = rule.apply(out);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::Itertools;
    use rstest::rstest;

    const SAMPLES: &[&str] = &[
        "wave", "glow", "fog", "rim", "wide", "Close", "  Shimmer ", "crimson", "steel", "hair",
        "soft", "sparkle", "volume", "battle-worn", "",
    ];

    #[test]
    fn given_wave_with_hair_tag_when_normalizing_then_rewrites_to_hair_phrase() {
        assert_eq!(normalize("Wave", &["hair"]), "soft loose waves in the hair");
    }

    #[test]
    fn given_unknown_tag_when_normalizing_then_only_lowercases_and_trims() {
        assert_eq!(normalize("  Neon Glow ", &["unknown"]), "neon glow");
    }

    #[test]
    fn given_marker_present_when_normalizing_then_leaves_template_untouched() {
        assert_eq!(normalize("braided crown", &["hair"]), "braided crown");
    }

    #[rstest]
    #[case("shimmer", &["eyes"], "shimmer in the eyes")]
    #[case("freckles", &["face"], "facial freckles")]
    #[case("rim", &["lighting"], "rim lighting")]
    #[case("crimson", &["color"], "crimson color tones")]
    #[case("runic", &["armor", "magic"], "runic armor plating magical aura")]
    #[case("wave", &["hair", "eyes"], "soft loose waves in the hair in the eyes")]
    fn given_tags_when_normalizing_then_rules_compose_in_tag_order(
        #[case] template: &str,
        #[case] tags: &[&str],
        #[case] expected: &str,
    ) {
        assert_eq!(normalize(template, tags), expected);
    }

    #[test]
    fn given_any_tag_combination_when_normalizing_twice_then_result_is_stable() {
        let tags: Vec<&str> = known_tags().collect();
        let mut tag_sets: Vec<Vec<&str>> = tags.iter().map(|t| vec![*t]).collect();
        tag_sets.extend(tags.iter().copied().permutations(2).map(|p| p.to_vec()));
        tag_sets.push(tags.clone());

        for set in &tag_sets {
            for sample in SAMPLES {
                let once = normalize(sample, set);
                let twice = normalize(&once, set);
                assert_eq!(once, twice, "not idempotent for {sample:?} with {set:?}");
            }
        }
    }

    #[test]
    fn given_rule_table_then_rewrite_keys_contain_no_markers() {
        let markers: Vec<&str> = RULES.iter().flat_map(|r| r.markers.iter().copied()).collect();
        for rule in RULES {
            for (key, rewrite) in rule.rewrites {
                assert!(
                    !markers.iter().any(|m| key.contains(m)),
                    "rewrite key {key:?} contains a marker"
                );
                assert!(
                    rule.markers.iter().any(|m| rewrite.contains(m)),
                    "rewrite {rewrite:?} lacks a {} marker",
                    rule.tag
                );
            }
        }
    }
}
