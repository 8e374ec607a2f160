// ABOUTME: Recommendation engine: advice text, wellness guidance, and recipe matching
// ABOUTME: Coverage-weighted recipe scoring with an emotion-affinity bonus
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Plateful

//! Recommendation Engine
//!
//! Food mode produces a short advice paragraph from the analysis totals and
//! the emotion reading. Fridge mode ranks the recipe catalog by ingredient
//! coverage (primary) and comfort-emotion affinity (secondary); recipes
//! under the minimum coverage threshold are excluded outright rather than
//! ranked last, so the client never sees an implausible suggestion.

use crate::config::RecommendationConfig;
use crate::models::{Emotion, EmotionReading, NutritionProfile, RecipeMatch};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Canonical ingredient-label form used for matching
///
/// Lowercased, trimmed, inner whitespace collapsed to underscores, so
/// "Soy Sauce" and "soy_sauce" compare equal.
#[must_use]
pub fn normalize_label(label: &str) -> String {
    label
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// One catalog recipe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub id: String,
    pub name: String,
    /// Required ingredients in canonical label form
    pub ingredients: Vec<String>,
    /// The emotional state this recipe suits best
    pub comfort_emotion: Emotion,
    pub cooking_time_minutes: u32,
}

/// The recipe catalog matched against available ingredients
#[derive(Debug, Clone, Default)]
pub struct RecipeCatalog {
    recipes: Vec<Recipe>,
}

impl RecipeCatalog {
    #[must_use]
    pub fn new(recipes: Vec<Recipe>) -> Self {
        Self { recipes }
    }

    /// Built-in reference catalog
    #[must_use]
    pub fn builtin() -> Self {
        let recipe = |id: &str, name: &str, ingredients: &[&str], emotion: Emotion, minutes: u32| {
            Recipe {
                id: id.to_owned(),
                name: name.to_owned(),
                ingredients: ingredients.iter().map(|i| (*i).to_owned()).collect(),
                comfort_emotion: emotion,
                cooking_time_minutes: minutes,
            }
        };

        Self::new(vec![
            recipe(
                "chicken-stir-fry",
                "Chicken & Broccoli Stir-Fry",
                &["chicken", "broccoli", "onion", "garlic", "soy_sauce"],
                Emotion::Focused,
                25,
            ),
            recipe(
                "chicken-soup",
                "Weeknight Chicken Soup",
                &["chicken", "carrot", "onion", "celery", "garlic"],
                Emotion::Sad,
                45,
            ),
            recipe(
                "salmon-rice-bowl",
                "Salmon Rice Bowl",
                &["salmon", "rice", "avocado", "cucumber"],
                Emotion::Calm,
                20,
            ),
            recipe(
                "veggie-omelette",
                "Vegetable Omelette",
                &["egg", "spinach", "tomato", "onion"],
                Emotion::Happy,
                10,
            ),
            recipe(
                "greek-salad",
                "Greek Salad",
                &["cucumber", "tomato", "feta", "olive", "onion"],
                Emotion::Calm,
                10,
            ),
            recipe(
                "lentil-curry",
                "Coconut Lentil Curry",
                &["lentils", "coconut_milk", "onion", "garlic", "tomato"],
                Emotion::Stressed,
                35,
            ),
            recipe(
                "beef-chili",
                "Slow Beef Chili",
                &["beef", "beans", "tomato", "onion", "garlic"],
                Emotion::Excited,
                90,
            ),
            recipe(
                "banana-oatmeal",
                "Banana Oatmeal",
                &["oats", "banana", "milk", "honey"],
                Emotion::Tired,
                8,
            ),
            recipe(
                "pasta-primavera",
                "Pasta Primavera",
                &["pasta", "zucchini", "tomato", "garlic", "parmesan"],
                Emotion::Happy,
                30,
            ),
            recipe(
                "tofu-noodles",
                "Sesame Tofu Noodles",
                &["tofu", "noodles", "garlic", "soy_sauce", "sesame"],
                Emotion::Anxious,
                20,
            ),
        ])
    }

    #[must_use]
    pub fn recipes(&self) -> &[Recipe] {
        &self.recipes
    }
}

/// Recommendation engine over the recipe catalog
pub struct RecommendationEngine {
    config: RecommendationConfig,
    catalog: RecipeCatalog,
}

impl RecommendationEngine {
    #[must_use]
    pub fn new(config: RecommendationConfig, catalog: RecipeCatalog) -> Self {
        Self { config, catalog }
    }

    /// Engine with the built-in catalog
    #[must_use]
    pub fn with_builtin_catalog(config: RecommendationConfig) -> Self {
        Self::new(config, RecipeCatalog::builtin())
    }

    /// Produce an advice paragraph for a completed food analysis
    #[must_use]
    pub fn recommend(
        &self,
        nutrition: &NutritionProfile,
        emotion: Option<&EmotionReading>,
    ) -> String {
        let mut parts: Vec<String> = Vec::new();

        if nutrition.calories <= 0.0 {
            parts.push(
                "We couldn't compute nutrition totals for this meal, so treat the numbers as incomplete."
                    .to_owned(),
            );
        } else {
            let protein_share = (nutrition.protein_g * 4.0) / nutrition.calories;
            if protein_share < 0.15 {
                parts.push(
                    "This meal is light on protein; consider adding eggs, fish, or legumes."
                        .to_owned(),
                );
            } else if protein_share > 0.30 {
                parts.push("Solid protein content in this meal.".to_owned());
            } else {
                parts.push("Macronutrient balance looks reasonable.".to_owned());
            }

            if nutrition.fiber_g < 5.0 {
                parts.push("Fiber is low; vegetables or whole grains would round it out.".to_owned());
            }
            if nutrition.sodium_mg > 1500.0 {
                parts.push("Sodium is on the high side for a single meal.".to_owned());
            }
        }

        if let Some(reading) = emotion {
            parts.push(Self::emotion_note(reading.emotion).to_owned());
        }

        parts.join(" ")
    }

    /// Short dietary note keyed to the current emotional state
    const fn emotion_note(emotion: Emotion) -> &'static str {
        match emotion {
            Emotion::Calm => "You're in a calm state; a balanced, unhurried meal fits well.",
            Emotion::Happy => "Good mood detected; keep the momentum with something fresh.",
            Emotion::Excited => "Elevated energy; complex carbs will sustain it without a crash.",
            Emotion::Focused => "You're focused; steady glucose from whole grains helps keep it.",
            Emotion::Tired => "You seem fatigued; iron-rich foods and hydration can help.",
            Emotion::Stressed => {
                "Stress signals detected; magnesium-rich foods like leafy greens and nuts may help."
            }
            Emotion::Anxious => {
                "Signs of tension; warm, familiar meals and less caffeine tend to help."
            }
            Emotion::Sad => "Comfort food is fine today; pairing it with protein keeps it steady.",
        }
    }

    /// Rank catalog recipes against the available ingredient set
    ///
    /// Score = coverage x coverage weight + emotion-affinity bonus (exact
    /// match > adjacent category). Without an emotion reading the score is
    /// raw coverage. Ties break toward shorter cooking time.
    #[must_use]
    pub fn match_recipes(
        &self,
        available: &[String],
        emotion: Option<&EmotionReading>,
    ) -> Vec<RecipeMatch> {
        let pantry: std::collections::HashSet<String> =
            available.iter().map(|label| normalize_label(label)).collect();

        let mut matches: Vec<RecipeMatch> = self
            .catalog
            .recipes()
            .iter()
            .filter_map(|recipe| self.score_recipe(recipe, &pantry, emotion))
            .collect();

        matches.sort_by(|a, b| {
            b.match_score
                .total_cmp(&a.match_score)
                .then(a.cooking_time_minutes.cmp(&b.cooking_time_minutes))
        });

        debug!(
            candidates = self.catalog.recipes().len(),
            matched = matches.len(),
            "recipe matching complete"
        );
        matches
    }

    fn score_recipe(
        &self,
        recipe: &Recipe,
        pantry: &std::collections::HashSet<String>,
        emotion: Option<&EmotionReading>,
    ) -> Option<RecipeMatch> {
        if recipe.ingredients.is_empty() {
            return None;
        }

        let missing: Vec<String> = recipe
            .ingredients
            .iter()
            .filter(|ingredient| !pantry.contains(&normalize_label(ingredient)))
            .cloned()
            .collect();
        let total = recipe.ingredients.len();
        let present = total - missing.len();
        let coverage = present as f64 / total as f64;

        if coverage < self.config.min_coverage {
            return None;
        }

        let match_score = match emotion {
            Some(reading) => {
                let bonus = if reading.emotion == recipe.comfort_emotion {
                    self.config.exact_emotion_bonus
                } else if reading.emotion.is_adjacent_to(recipe.comfort_emotion) {
                    self.config.adjacent_emotion_bonus
                } else {
                    0.0
                };
                (coverage * self.config.coverage_weight + bonus).min(1.0)
            }
            None => coverage,
        };

        Some(RecipeMatch {
            recipe_id: recipe.id.clone(),
            recipe_name: recipe.name.clone(),
            match_score,
            available_ingredient_count: present,
            total_ingredient_count: total,
            missing_ingredients: missing,
            cooking_time_minutes: recipe.cooking_time_minutes,
        })
    }

    /// Actionable guidance for a wellness check
    #[must_use]
    pub fn wellness_advice(&self, reading: &EmotionReading) -> Vec<String> {
        let mut advice = vec![Self::emotion_note(reading.emotion).to_owned()];
        match reading.emotion {
            Emotion::Stressed | Emotion::Anxious => {
                advice.push("Try five minutes of slow breathing before your next meal.".to_owned());
                advice.push("Limit caffeine for the rest of the day.".to_owned());
            }
            Emotion::Tired | Emotion::Sad => {
                advice.push("A short walk outside can lift both energy and mood.".to_owned());
                advice.push("Aim for an earlier night; recovery starts with sleep.".to_owned());
            }
            Emotion::Calm | Emotion::Happy | Emotion::Excited | Emotion::Focused => {
                advice.push("Keep your routine steady; hydration and regular meals sustain it.".to_owned());
            }
        }
        advice
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intelligence::EmotionClassifier;
    use crate::models::BiometricReading;

    fn engine() -> RecommendationEngine {
        RecommendationEngine::with_builtin_catalog(RecommendationConfig::default())
    }

    fn owned(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|l| (*l).to_owned()).collect()
    }

    #[test]
    fn test_normalize_label() {
        assert_eq!(normalize_label("  Soy Sauce "), "soy_sauce");
        assert_eq!(normalize_label("CHICKEN"), "chicken");
        assert_eq!(normalize_label("soy_sauce"), "soy_sauce");
    }

    #[test]
    fn test_four_of_five_ingredients_match() {
        let matches = engine().match_recipes(&owned(&["chicken", "broccoli", "onion", "garlic"]), None);

        let stir_fry = matches
            .iter()
            .find(|m| m.recipe_id == "chicken-stir-fry")
            .expect("stir fry must clear the coverage threshold");
        assert_eq!(stir_fry.available_ingredient_count, 4);
        assert_eq!(stir_fry.total_ingredient_count, 5);
        assert!((stir_fry.match_score - 0.8).abs() < 1e-9);
        assert_eq!(stir_fry.missing_ingredients, vec!["soy_sauce".to_owned()]);
    }

    #[test]
    fn test_low_coverage_recipes_excluded() {
        let matches = engine().match_recipes(&owned(&["chicken"]), None);
        // 1/5 = 0.2 coverage: excluded, not ranked last
        assert!(matches.iter().all(|m| m.recipe_id != "chicken-stir-fry"));
    }

    #[test]
    fn test_emotion_bonus_orders_equal_coverage() {
        // Both recipes are fully covered and take 10 minutes; the calm
        // reading's exact comfort-emotion match must outrank the adjacent one.
        let pantry = owned(&[
            "cucumber", "tomato", "feta", "olive", "onion", "egg", "spinach",
        ]);
        let reading = EmotionClassifier::new()
            .classify(&BiometricReading::new(70.0, 65))
            .unwrap();
        assert_eq!(reading.emotion, Emotion::Calm);
        let matches = engine().match_recipes(&pantry, Some(&reading));

        let greek = matches.iter().position(|m| m.recipe_id == "greek-salad").unwrap();
        let omelette = matches
            .iter()
            .position(|m| m.recipe_id == "veggie-omelette")
            .unwrap();
        assert!(greek < omelette);
    }

    #[test]
    fn test_tie_breaks_on_cooking_time() {
        let recipes = vec![
            Recipe {
                id: "slow".into(),
                name: "Slow".into(),
                ingredients: vec!["egg".into(), "rice".into()],
                comfort_emotion: Emotion::Calm,
                cooking_time_minutes: 60,
            },
            Recipe {
                id: "fast".into(),
                name: "Fast".into(),
                ingredients: vec!["egg".into(), "rice".into()],
                comfort_emotion: Emotion::Calm,
                cooking_time_minutes: 10,
            },
        ];
        let engine = RecommendationEngine::new(
            RecommendationConfig::default(),
            RecipeCatalog::new(recipes),
        );
        let matches = engine.match_recipes(&owned(&["egg", "rice"]), None);
        assert_eq!(matches[0].recipe_id, "fast");
        assert_eq!(matches[1].recipe_id, "slow");
    }

    #[test]
    fn test_recommendation_mentions_low_protein() {
        let nutrition = NutritionProfile {
            calories: 600.0,
            protein_g: 8.0,
            ..NutritionProfile::default()
        };
        let text = engine().recommend(&nutrition, None);
        assert!(text.contains("protein"));
    }

    #[test]
    fn test_wellness_advice_nonempty_for_all_emotions() {
        let classifier = EmotionClassifier::new();
        for (hrv, hr) in [(35.0, 95), (70.0, 65), (25.0, 180), (150.0, 45)] {
            let reading = classifier
                .classify(&BiometricReading::new(hrv, hr))
                .unwrap();
            let advice = engine().wellness_advice(&reading);
            assert!(advice.len() >= 2);
        }
    }
}
