//! Turns free-text provider completions into structured fields.
//!
//! Providers are asked to answer with `TAG: value` lines. Nothing here fails: a field that
//! cannot be recovered is simply `None`, and the orchestrator decides what that means.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::enrichment::{
    clamp_to, CALORIES_RANGE, CARBS_RANGE, FAT_RANGE, PREP_TIME_RANGE, PROTEIN_RANGE,
};
use crate::models::{CulturalInfo, IngredientList, RecipeSuggestion, Substitution};
use crate::services::estimator::{GENERIC_RATIO, GENERIC_SUBSTITUTE};

/// Tags whose value may continue over following lines until the next tag or a blank line.
const MULTI_LINE_TAGS: &[&str] = &[
    "HISTORY",
    "CULTURAL",
    "SERVING",
    "TIPS",
    "DESCRIPTION",
    "INGREDIENTS",
];

/// Tags recognized regardless of case. Any other ALL-CAPS label still ends a section.
const KNOWN_TAGS: &[&str] = &[
    "PREP_TIME",
    "CALORIES",
    "PROTEIN",
    "CARBS",
    "FAT",
    "ALT1",
    "ALT2",
    "ALT3",
    "ORIGIN",
    "HISTORY",
    "CULTURAL",
    "SEASON",
    "SERVING",
    "TIPS",
    "STEP",
    "NAME",
    "DESCRIPTION",
    "INGREDIENT",
    "INGREDIENTS",
    "CUISINE",
    "TIME",
];

const MAX_SUGGESTIONS: usize = 4;
const MAX_STEPS: usize = 10;
const MIN_HEURISTIC_SENTENCE: usize = 20;
const PLACEHOLDER_ORIGINALS: [&str; 3] = ["main ingredient", "second ingredient", "third ingredient"];

static TAG_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(?:[*#>\-]+\s*)*([A-Za-z][A-Za-z0-9_]*)(?:\s+(\d+))?\s*(?:\*\*)?\s*:\s*(?:\*\*)?\s*(.*)$",
    )
    .expect("valid tag line regex")
});

static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d[\d,]*").expect("valid number regex"));

static NUMBERED_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\d+[.)]\s+(.+)$").expect("valid numbered line regex"));

static SENTENCE_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?]+(?:\s+|$)").expect("valid sentence regex"));

static COOKING_VERB: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:heat|add|cook|stir|mix|bake|fry|simmer|serve|remove|place|cover|reduce|boil|pour)(?:s|ed|ing)?\b",
    )
    .expect("valid cooking verb regex")
});

static BULLET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:[-*•]+|\d+[.)])\s*").expect("valid bullet regex"));

/// What the prompt asked the provider to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedShape {
    Enrichment,
    Recipe,
    Suggestions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedResponse {
    Enrichment(ParsedEnrichment),
    Recipe(ParsedRecipe),
    Suggestions(Vec<RecipeSuggestion>),
}

/// Fields recovered from one completion. `None` means "not recovered".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedEnrichment {
    pub prep_time_minutes: Option<u32>,
    pub calories: Option<u32>,
    pub protein_grams: Option<u32>,
    pub carbs_grams: Option<u32>,
    pub fat_grams: Option<u32>,
    pub alternatives: [Option<String>; 3],
    pub cultural_info: Option<CulturalInfo>,
    pub instructions: Option<Vec<String>>,
}

impl ParsedEnrichment {
    pub fn has_nutrition(&self) -> bool {
        self.calories.is_some()
            || self.protein_grams.is_some()
            || self.carbs_grams.is_some()
            || self.fat_grams.is_some()
    }

    /// Prep time or nutrition recovered. Without either the answer is not worth keeping.
    pub fn has_headline(&self) -> bool {
        self.prep_time_minutes.is_some() || self.has_nutrition()
    }

    /// Always three slots; unrecovered ones read "similar ingredient", ratio "1:1".
    pub fn substitutions(&self, ingredients: &IngredientList) -> Vec<Substitution> {
        self.alternatives
            .iter()
            .enumerate()
            .map(|(i, alt)| Substitution {
                original: ingredients
                    .get(i)
                    .unwrap_or(PLACEHOLDER_ORIGINALS[i])
                    .to_string(),
                substitute: alt.clone().unwrap_or_else(|| GENERIC_SUBSTITUTE.to_string()),
                ratio: GENERIC_RATIO.to_string(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedRecipe {
    pub name: Option<String>,
    pub description: Option<String>,
    pub ingredients: Vec<String>,
    pub enrichment: ParsedEnrichment,
}

impl ParsedRecipe {
    pub fn is_usable(&self) -> bool {
        self.name.is_some() && !self.ingredients.is_empty()
    }
}

pub fn parse(raw_text: &str, shape: ExpectedShape) -> ParsedResponse {
    match shape {
        ExpectedShape::Enrichment => ParsedResponse::Enrichment(parse_enrichment(raw_text)),
        ExpectedShape::Recipe => ParsedResponse::Recipe(parse_recipe(raw_text)),
        ExpectedShape::Suggestions => ParsedResponse::Suggestions(parse_suggestions(raw_text)),
    }
}

fn parse_enrichment(raw_text: &str) -> ParsedEnrichment {
    let tagged = TaggedText::scan(raw_text);
    enrichment_from(&tagged)
}

fn parse_recipe(raw_text: &str) -> ParsedRecipe {
    let tagged = TaggedText::scan(raw_text);

    let mut ingredients: Vec<String> = tagged
        .all("INGREDIENT")
        .filter_map(|s| non_empty(&s.first))
        .collect();

    if ingredients.is_empty() {
        if let Some(block) = tagged.multi("INGREDIENTS") {
            ingredients = block
                .lines()
                .filter_map(|line| non_empty(&BULLET.replace(line, "")))
                .collect();
        }
    }

    ParsedRecipe {
        name: tagged.single("NAME"),
        description: tagged.multi("DESCRIPTION"),
        ingredients,
        enrichment: enrichment_from(&tagged),
    }
}

fn parse_suggestions(raw_text: &str) -> Vec<RecipeSuggestion> {
    let tagged = TaggedText::scan(raw_text);
    let mut suggestions: Vec<RecipeSuggestion> = Vec::new();
    // A nameless block is dropped along with its fields.
    let mut open = false;

    for section in &tagged.sections {
        if section.tag == "NAME" {
            if suggestions.len() == MAX_SUGGESTIONS {
                break;
            }
            open = match non_empty(&section.first) {
                Some(name) => {
                    suggestions.push(RecipeSuggestion {
                        name,
                        description: None,
                        cuisine: None,
                        prep_time_minutes: None,
                    });
                    true
                }
                None => false,
            };
            continue;
        }

        if !open {
            continue;
        }
        let Some(current) = suggestions.last_mut() else {
            continue;
        };
        match section.tag.as_str() {
            "DESCRIPTION" if current.description.is_none() => {
                current.description = non_empty(&section.joined());
            }
            "CUISINE" if current.cuisine.is_none() => {
                current.cuisine = non_empty(&section.first);
            }
            "TIME" | "PREP_TIME" if current.prep_time_minutes.is_none() => {
                current.prep_time_minutes =
                    first_integer(&section.first).map(|n| clamp_to(PREP_TIME_RANGE, n));
            }
            _ => {}
        }
    }

    suggestions
}

fn enrichment_from(tagged: &TaggedText<'_>) -> ParsedEnrichment {
    let number = |tag: &str, range: (u32, u32)| {
        tagged
            .single(tag)
            .and_then(|v| first_integer(&v))
            .map(|n| clamp_to(range, n))
    };

    let cultural = CulturalInfo {
        origin: tagged.single("ORIGIN"),
        history: tagged.multi("HISTORY"),
        significance: tagged.multi("CULTURAL"),
        season: tagged.single("SEASON"),
        serving: tagged.multi("SERVING"),
        tips: tagged.multi("TIPS"),
    };

    ParsedEnrichment {
        prep_time_minutes: number("PREP_TIME", PREP_TIME_RANGE),
        calories: number("CALORIES", CALORIES_RANGE),
        protein_grams: number("PROTEIN", PROTEIN_RANGE),
        carbs_grams: number("CARBS", CARBS_RANGE),
        fat_grams: number("FAT", FAT_RANGE),
        alternatives: ["ALT1", "ALT2", "ALT3"].map(|tag| tagged.single(tag).map(|v| v.to_lowercase())),
        cultural_info: (!cultural.is_empty()).then_some(cultural),
        instructions: extract_steps(tagged),
    }
}

/// Three tiers, first non-empty wins: `STEP:` lines, numbered lines, then cooking sentences.
/// Every tier keeps at most `MAX_STEPS`.
fn extract_steps(tagged: &TaggedText<'_>) -> Option<Vec<String>> {
    let explicit: Vec<String> = tagged
        .all("STEP")
        .filter_map(|s| non_empty(&s.first))
        .filter(|s| is_substantive(s))
        .take(MAX_STEPS)
        .collect();
    if !explicit.is_empty() {
        return Some(explicit);
    }

    let numbered: Vec<String> = tagged
        .untagged
        .iter()
        .filter_map(|line| NUMBERED_LINE.captures(line))
        .filter_map(|caps| non_empty(&caps[1]))
        .filter(|s| is_substantive(s))
        .take(MAX_STEPS)
        .collect();
    if !numbered.is_empty() {
        return Some(numbered);
    }

    let prose = tagged.untagged.join("\n");
    let sentences: Vec<String> = prose
        .lines()
        .flat_map(|line| SENTENCE_END.split(line))
        .map(str::trim)
        .filter(|s| s.chars().count() >= MIN_HEURISTIC_SENTENCE && COOKING_VERB.is_match(s))
        .take(MAX_STEPS)
        .map(str::to_string)
        .collect();

    (!sentences.is_empty()).then_some(sentences)
}

fn is_substantive(step: &str) -> bool {
    step.chars().filter(|c| c.is_alphabetic()).count() >= 3
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim().trim_matches('*').trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Leading integer of a capture. Digit runs too long for `u64` saturate.
fn first_integer(value: &str) -> Option<u32> {
    let digits = NUMBER.find(value)?.as_str().replace(',', "");
    let n = digits.parse::<u64>().unwrap_or(u64::MAX);
    Some(n.min(u32::MAX as u64) as u32)
}

#[derive(Debug)]
struct Section {
    tag: String,
    first: String,
    rest: Vec<String>,
}

impl Section {
    fn joined(&self) -> String {
        std::iter::once(self.first.as_str())
            .chain(self.rest.iter().map(String::as_str))
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A completion split into tag sections plus the lines that belong to no section.
struct TaggedText<'a> {
    sections: Vec<Section>,
    untagged: Vec<&'a str>,
}

impl<'a> TaggedText<'a> {
    fn scan(raw: &'a str) -> Self {
        let mut sections: Vec<Section> = Vec::new();
        let mut untagged = Vec::new();
        let mut collecting = false;

        for line in raw.lines() {
            if line.trim().is_empty() {
                collecting = false;
                untagged.push(line);
                continue;
            }
            if let Some((tag, first)) = tag_line(line) {
                collecting = MULTI_LINE_TAGS.contains(&tag.as_str());
                sections.push(Section {
                    tag,
                    first,
                    rest: Vec::new(),
                });
                continue;
            }

            match sections.last_mut() {
                Some(section) if collecting => section.rest.push(line.to_string()),
                _ => untagged.push(line),
            }
        }

        Self { sections, untagged }
    }

    fn all<'s>(&'s self, tag: &'s str) -> impl Iterator<Item = &'s Section> + 's {
        self.sections.iter().filter(move |s| s.tag == tag)
    }

    fn single(&self, tag: &str) -> Option<String> {
        self.all(tag).next().and_then(|s| non_empty(&s.first))
    }

    fn multi(&self, tag: &str) -> Option<String> {
        self.all(tag).next().and_then(|s| non_empty(&s.joined()))
    }
}

/// `(normalized tag, rest of line)` when the line opens a section.
fn tag_line(line: &str) -> Option<(String, String)> {
    let caps = TAG_LINE.captures(line)?;
    let label = &caps[1];
    let upper = label.to_uppercase();

    let known = KNOWN_TAGS.contains(&upper.as_str());
    let shouting = label.len() >= 3 && label == upper && label.chars().any(|c| c.is_ascii_alphabetic());
    if !known && !shouting {
        return None;
    }

    Some((upper, caps[3].to_string()))
}
