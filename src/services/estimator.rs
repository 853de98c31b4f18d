//! Deterministic, offline estimates used when no provider answers and as the seed that
//! provider answers override.

use crate::models::{EnrichmentRecord, Nutrition, RecipeContext, SourceProvider, Substitution};

pub const GENERIC_SUBSTITUTE: &str = "similar ingredient";
pub const GENERIC_RATIO: &str = "1:1";

/// Base calories by recipe-name keyword. When several rows match, the last one wins.
const CALORIE_BASES: &[(&[&str], u32)] = &[
    (&["curry", "rice", "biryani"], 300),
    (&["soup", "salad"], 150),
    (&["pasta", "noodle"], 350),
    (&["bread", "pizza"], 280),
    (&["chicken", "meat"], 320),
];
const DEFAULT_CALORIE_BASE: u32 = 200;

/// Ingredient keyword → (substitute, ratio). Checked in order; the first contained key wins.
const SUBSTITUTES: &[(&str, &str, &str)] = &[
    ("oil", "butter or avocado oil", "1:1"),
    ("onion", "shallots or leeks", "1:1"),
    ("garlic", "garlic powder", "1 clove:1/8 tsp"),
    ("tomato", "tomato paste + water", "1:3"),
    ("chickpeas", "cannellini beans", "1:1"),
    ("lentils", "split peas", "1:1"),
    ("quinoa", "brown rice", "1:1"),
    ("tofu", "tempeh", "1:1"),
    ("coconut milk", "cashew milk", "1:1"),
    ("ginger", "ground ginger", "1 inch:1/4 tsp"),
    ("paneer", "halloumi cheese", "1:1"),
    ("chicken", "tofu or seitan", "1:1"),
    ("mozzarella", "provolone cheese", "1:1"),
    ("soy sauce", "tamari or coconut aminos", "1:1"),
];

pub fn estimate_prep_time(ingredient_count: usize) -> u32 {
    match ingredient_count {
        0..=5 => 25,
        6..=10 => 45,
        11..=15 => 60,
        _ => 75,
    }
}

pub fn estimate_nutrition(recipe_name: &str, ingredients: &[String]) -> Nutrition {
    let name = recipe_name.to_lowercase();
    let base = CALORIE_BASES
        .iter()
        .rev()
        .find(|(keywords, _)| keywords.iter().any(|k| name.contains(k)))
        .map(|(_, base)| *base)
        .unwrap_or(DEFAULT_CALORIE_BASE);

    Nutrition {
        calories: base + ingredients.len() as u32 * 10,
        protein_grams: base / 25 + 5,
        carbs_grams: base / 15 + 10,
        fat_grams: base / 50 + 3,
    }
    .clamped()
}

/// Table lookup for a single ingredient, `None` when no keyword matches.
pub fn lookup_substitute(ingredient: &str) -> Option<(&'static str, &'static str)> {
    let cleaned: String = ingredient
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_ascii_digit())
        .collect();
    let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

    SUBSTITUTES
        .iter()
        .find(|(key, _, _)| cleaned.contains(key))
        .map(|(_, substitute, ratio)| (*substitute, *ratio))
}

pub fn generate_alternatives(main_ingredients: &[String]) -> Vec<Substitution> {
    main_ingredients
        .iter()
        .map(|ingredient| {
            let (substitute, ratio) =
                lookup_substitute(ingredient).unwrap_or((GENERIC_SUBSTITUTE, GENERIC_RATIO));
            Substitution {
                original: ingredient.clone(),
                substitute: substitute.to_string(),
                ratio: ratio.to_string(),
            }
        })
        .collect()
}

/// The record used when every provider failed or none is configured.
pub fn local_record(context: &RecipeContext) -> EnrichmentRecord {
    let ingredients = context.ingredients.as_slice();
    EnrichmentRecord {
        prep_time_minutes: estimate_prep_time(ingredients.len()),
        nutrition: estimate_nutrition(&context.name, ingredients),
        substitutions: generate_alternatives(context.ingredients.leading(3)),
        cultural_info: None,
        instructions: None,
        image: None,
        source_provider: SourceProvider::LocalEstimate,
    }
}
