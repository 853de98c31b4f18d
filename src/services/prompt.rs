//! Prompt templates. Every template spells out the `TAG: value` contract the parser reads;
//! the numeric ranges in the text are requests, the parser clamps regardless.

use crate::models::{Intent, RecipeContext, RecipeQuery};

/// How much a provider can be asked to do in one prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptStyle {
    /// Large instruction-following models (Gemini).
    Detailed,
    /// Small hosted inference models (Hugging Face).
    Compact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageStyle {
    Photo,
    Diffusion,
}

const COMPACT_INGREDIENT_LIMIT: usize = 5;

fn nth_or<'a>(context: &'a RecipeContext, i: usize, fallback: &'a str) -> &'a str {
    context.ingredients.get(i).unwrap_or(fallback)
}

fn enrichment_tags(context: &RecipeContext) -> String {
    format!(
        "PREP_TIME: [number between 15-120]\n\
         CALORIES: [number between 150-800]\n\
         PROTEIN: [number between 5-50]\n\
         CARBS: [number between 10-100]\n\
         FAT: [number between 2-40]\n\
         ALT1: [alternative for {}]\n\
         ALT2: [alternative for {}]\n\
         ALT3: [alternative for {}]\n\
         ORIGIN: [specific country/region of origin with historical context]\n\
         HISTORY: [detailed 2-3 sentence history of this dish including dates and cultural development]\n\
         CULTURAL: [cultural significance, traditions, and symbolism in the origin culture]\n\
         SEASON: [traditional season, festivals, or occasions when this dish is eaten]\n\
         SERVING: [authentic traditional way this dish is served in its culture of origin]\n\
         TIPS: [authentic cultural cooking tips and traditional techniques]\n\
         STEP: [one cooking instruction per line, 5-10 STEP lines in order]",
        nth_or(context, 0, "main ingredient"),
        nth_or(context, 1, "second ingredient"),
        nth_or(context, 2, "third ingredient"),
    )
}

/// Ask for the full enrichment of a selected recipe.
pub fn enrichment_prompt(context: &RecipeContext, style: PromptStyle) -> String {
    match style {
        PromptStyle::Detailed => format!(
            "Analyze this recipe and provide detailed information. Research the cultural \
             background and provide authentic information:\n\n\
             Recipe: {}\n\
             Description: {}\n\
             Ingredients: {}\n\n\
             Please provide EXACTLY in this format, one field per line:\n{}",
            context.name,
            context.description,
            context.ingredients.as_slice().join(", "),
            enrichment_tags(context),
        ),
        PromptStyle::Compact => format!(
            "Recipe: {}. Ingredients: {}.\n\
             Answer using these lines only:\n{}",
            context.name,
            context
                .ingredients
                .leading(COMPACT_INGREDIENT_LIMIT)
                .join(", "),
            enrichment_tags(context),
        ),
    }
}

/// Prompt for a classified query: one full recipe for `direct`, four suggestions otherwise.
pub fn query_prompt(query: &RecipeQuery, style: PromptStyle) -> String {
    match query.intent() {
        Intent::Direct => recipe_prompt(query.text(), style),
        intent => suggestion_prompt(intent, query.text()),
    }
}

fn recipe_prompt(request: &str, style: PromptStyle) -> String {
    let lead = match style {
        PromptStyle::Detailed => {
            "Write a complete, authentic home-cooking recipe for the following request."
        }
        PromptStyle::Compact => "Write a recipe for:",
    };

    format!(
        "{} \"{}\"\n\n\
         Please provide EXACTLY in this format, one field per line:\n\
         NAME: [dish name]\n\
         DESCRIPTION: [one or two sentences]\n\
         INGREDIENT: [quantity and ingredient, one INGREDIENT line each]\n\
         PREP_TIME: [number between 15-120]\n\
         CALORIES: [number between 150-800]\n\
         PROTEIN: [number between 5-50]\n\
         CARBS: [number between 10-100]\n\
         FAT: [number between 2-40]\n\
         ALT1: [alternative for the first ingredient]\n\
         ALT2: [alternative for the second ingredient]\n\
         ALT3: [alternative for the third ingredient]\n\
         ORIGIN: [country/region of origin]\n\
         STEP: [one cooking instruction per line, 5-10 STEP lines in order]",
        lead, request
    )
}

fn suggestion_prompt(intent: Intent, request: &str) -> String {
    let lead = match intent {
        Intent::Discovery => format!("Suggest four dishes that answer this question: \"{}\".", request),
        Intent::Ingredients => format!(
            "Suggest four dishes that can be cooked mainly with what the user has: \"{}\".",
            request
        ),
        Intent::Context => format!(
            "Suggest four dishes that suit this occasion or diet: \"{}\".",
            request
        ),
        Intent::Direct => format!("Suggest four dishes similar to \"{}\".", request),
    };

    format!(
        "{}\n\n\
         For each dish write a block of exactly these lines:\n\
         NAME: [dish name]\n\
         DESCRIPTION: [one sentence]\n\
         CUISINE: [cuisine or region]\n\
         TIME: [total minutes, number between 15-120]\n\n\
         Write four blocks and nothing else.",
        lead
    )
}

pub fn image_prompt(context: &RecipeContext, style: ImageStyle) -> String {
    match style {
        ImageStyle::Photo => format!(
            "A beautiful, appetizing photo of {}, {}. Professional food photography, vibrant \
             colors, restaurant quality presentation, high resolution, natural lighting.",
            context.name, context.description
        ),
        ImageStyle::Diffusion => format!(
            "professional food photography of {}, delicious, appetizing, high quality, \
             restaurant presentation, vibrant colors, natural lighting",
            context.name
        ),
    }
}
