//! Abstract-answer expansion.
//!
//! Short or ambiguous answer labels ("Subtle", "Strong") say little on their own.
//! Expansion turns them into descriptive phrases using the question they answered.
//! All heuristics are finite ordered tables evaluated top to bottom.

/// Question fragments marking an anatomical bust/chest question.
const ANATOMICAL_CONTEXT: &[&str] = &["breast", "bust", "chest anatomy", "upper torso", "torso shape"];

/// Intensity adjectives: abstract labels that only make sense relative to a topic.
pub const INTENSITY_ADJECTIVES: &[&str] = &[
    "subtle", "slight", "mild", "gentle", "soft", "minimal", "moderate", "medium", "balanced",
    "strong", "bold", "intense", "heavy", "dramatic", "extreme", "maximum",
];

/// Anatomical shape keywords.
pub const ANATOMICAL_SHAPES: &[&str] = &[
    "round", "teardrop", "natural", "perky", "full", "athletic", "slender", "petite", "wide-set",
    "close-set", "bell", "asymmetric",
];

/// Hand-authored phrases for anatomical context, covering every intensity adjective and
/// every shape keyword.
const ANATOMICAL_PHRASES: &[(&str, &str)] = &[
    ("subtle", "subtle breast definition with gentle anatomical silhouette"),
    ("slight", "slight bust contour with understated anatomical silhouette"),
    ("mild", "mild bust definition with soft natural contours"),
    ("gentle", "gentle bust curvature with smooth anatomical transitions"),
    ("soft", "soft rounded bust with relaxed natural silhouette"),
    ("minimal", "minimal bust projection with flat anatomical silhouette"),
    ("moderate", "moderate bust definition with balanced anatomical proportions"),
    ("medium", "medium bust volume with balanced anatomical proportions"),
    ("balanced", "balanced bust proportions with harmonious torso silhouette"),
    ("strong", "strong bust definition with pronounced anatomical contours"),
    ("bold", "bold bust silhouette with confident anatomical presence"),
    ("intense", "intense bust definition with sharply sculpted contours"),
    ("heavy", "heavy full bust with weighted natural drape"),
    ("dramatic", "dramatic bust silhouette with striking anatomical curvature"),
    ("extreme", "extreme bust proportions with exaggerated anatomical curvature"),
    ("maximum", "maximum bust volume with fully emphasized anatomical silhouette"),
    ("round", "round full breast shape with even upper and lower fullness"),
    ("teardrop", "teardrop breast shape with fuller lower curve and sloped upper line"),
    ("natural", "natural breast shape with realistic soft slope"),
    ("perky", "perky breast shape with lifted upward projection"),
    ("full", "full breast shape with generous rounded volume"),
    ("athletic", "athletic breast shape with firm toned chest beneath"),
    ("slender", "slender breast shape with narrow tapered silhouette"),
    ("petite", "petite breast shape with small delicate proportions"),
    ("wide-set", "wide-set breast shape with generous spacing across the chest"),
    ("close-set", "close-set breast shape with minimal spacing at the center"),
    ("bell", "bell breast shape with narrow top widening toward the base"),
    ("asymmetric", "asymmetric breast shape with natural uneven proportions"),
];

/// Topic detected from question text, paired with the phrase appended to the adjective.
struct Topic {
    keywords: &'static [&'static str],
    phrase: &'static str,
}

/// Priority order: first match wins.
const TOPICS: &[Topic] = &[
    Topic {
        keywords: &["otherworldly", "supernatural", "ethereal", "mystical", "magical", "fantasy", "divine", "demonic"],
        phrase: "otherworldly aura",
    },
    Topic {
        keywords: &["intensity", "strength", "strong", "power", "how much", "degree"],
        phrase: "intensity",
    },
    Topic {
        keywords: &["mood", "emotion", "feeling", "atmosphere", "vibe"],
        phrase: "emotional atmosphere",
    },
    Topic {
        keywords: &["style", "aesthetic", "artistic", "rendering"],
        phrase: "stylistic treatment",
    },
    Topic {
        keywords: &["camera", "perspective", "angle", "shot", "framing", "viewpoint"],
        phrase: "camera perspective",
    },
    Topic {
        keywords: &["lighting", "light", "illumination", "shadow"],
        phrase: "lighting",
    },
    Topic {
        keywords: &["hair"],
        phrase: "hair styling",
    },
    Topic {
        keywords: &["body", "build", "physique", "figure", "muscle"],
        phrase: "body definition",
    },
];

const FALLBACK_PHRASE: &str = "visual effect";

/// Whether a raw label is an abstract intensity adjective.
pub fn is_intensity_adjective(label: &str) -> bool {
    let label = label.trim().to_lowercase();
    INTENSITY_ADJECTIVES.contains(&label.as_str())
}

/// Whether question text asks about bust/chest anatomy.
pub fn is_anatomical_context(question: &str) -> bool {
    let question = question.to_lowercase();
    ANATOMICAL_CONTEXT.iter().any(|k| question.contains(k))
}

/// Expand an answer label into a descriptive phrase using the question it answered.
///
/// Labels that are neither anatomical nor abstract come back lower-cased and trimmed.
pub fn expand(raw_label: &str, question_text: &str) -> String {
    let label = raw_label.trim().to_lowercase();

    if is_anatomical_context(question_text) {
        return ANATOMICAL_PHRASES
            .iter()
            .find(|(key, _)| *key == label)
            .map(|(_, phrase)| phrase.to_string())
            .unwrap_or(label);
    }

    if !INTENSITY_ADJECTIVES.contains(&label.as_str()) {
        return label;
    }

    let question = question_text.to_lowercase();
    let phrase = TOPICS
        .iter()
        .find(|t| t.keywords.iter().any(|k| question.contains(k)))
        .map(|t| t.phrase)
        .unwrap_or(FALLBACK_PHRASE);

    format!("{label} {phrase}")
}
