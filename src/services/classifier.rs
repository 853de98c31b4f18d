use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::Intent;

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("valid intent pattern"))
        .collect()
}

/// Intent families in priority order. A query matching several families gets the first.
static INTENT_PATTERNS: Lazy<Vec<(Intent, Vec<Regex>)>> = Lazy::new(|| {
    vec![
        (
            Intent::Direct,
            compile(&[
                r"(?i)^\s*i\s+(?:want|would\s+like|'d\s+like)\s+to\s+(?:eat|make|cook|have)\b",
                r"(?i)^\s*(?:make|cook)\s+me\b",
                r"(?i)^\s*give\s+me\s+(?:a|the)\s+recipe\b",
                r"(?i)^\s*how\s+(?:do\s+i|to)\s+(?:make|cook|prepare)\b",
                r"(?i)\b(?:recipe|dish)\s*[?.!]*\s*$",
            ]),
        ),
        (
            Intent::Discovery,
            compile(&[
                r"(?i)\bwhat\s+(?:goes|pairs)\s+(?:well\s+)?with\b",
                r"(?i)\bbest\s+(?:dishes|recipes|meals|foods)\s+(?:for|with|to)\b",
                r"(?i)\b(?:suggest|recommend)\w*\b",
                r"(?i)\bideas?\s+for\b",
                r"(?i)\bwhat\s+should\s+i\s+(?:eat|cook|make)\b",
            ]),
        ),
        (
            Intent::Ingredients,
            compile(&[
                r"(?i)^\s*i\s+(?:have|'ve\s+got|got)\b",
                r"(?i)\busing\b",
                r"(?i)\bwith\s+(?:only|just|some)\b",
                r"(?i)\bleftovers?\b",
            ]),
        ),
        (
            Intent::Context,
            compile(&[
                r"(?i)\b(?:breakfast|brunch|lunch|dinner|supper|snacks?|dessert|late[-\s]night)\b",
                r"(?i)\b(?:vegan|vegetarian|gluten[-\s]free|keto|paleo|low[-\s](?:carb|fat|calorie)|high[-\s]protein|dairy[-\s]free|healthy|quick|spicy|comfort)\b",
            ]),
        ),
    ]
});

/// Bucket a free-text query into an intent. Queries matching no family are `Direct`.
pub fn classify(query: &str) -> Intent {
    INTENT_PATTERNS
        .iter()
        .find(|(_, patterns)| patterns.iter().any(|re| re.is_match(query)))
        .map(|(intent, _)| *intent)
        .unwrap_or(Intent::Direct)
}
