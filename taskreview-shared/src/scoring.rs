/// Module scoring and review rotation
///
/// Every employee carries one score per skill module. Managers use the scores
/// to decide which module the next review should cover, and each submitted
/// review folds its self-assessed score back into the matching entry.
///
/// # Rotation
///
/// The suggested module is the weakest one: the entry with the lowest score.
/// When several modules share the lowest score, the one listed first wins.
///
/// # Blending
///
/// A submitted score is averaged with the stored score for that module and
/// rounded to the nearest integer, halves rounding up:
///
/// ```text
/// old = 70, submitted = 50  →  60
/// old = 0,  submitted = 75  →  38
/// ```
///
/// # Example
///
/// ```
/// use taskreview_shared::scoring::{apply_submitted_score, initial_module_scores, suggest_next_module};
///
/// let mut scores = initial_module_scores();
/// apply_submitted_score(&mut scores, 1, 80);
///
/// // Module 1 now scores 40, so module 2 is the first of the weakest modules
/// assert_eq!(suggest_next_module(&scores), Some(2));
/// ```

use serde::{Deserialize, Serialize};

/// Number of skill modules tracked per employee
pub const MODULE_COUNT: i32 = 10;

/// Lowest valid module ID
pub const MIN_MODULE_ID: i32 = 1;

/// Highest valid module ID
pub const MAX_MODULE_ID: i32 = MODULE_COUNT;

/// Lowest valid score
pub const MIN_SCORE: i32 = 0;

/// Highest valid score
pub const MAX_SCORE: i32 = 100;

/// Score held by an employee for one module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleScore {
    /// Module ID (1..=10)
    pub module_id: i32,

    /// Current score (0..=100)
    pub score: i32,
}

impl ModuleScore {
    pub fn new(module_id: i32, score: i32) -> Self {
        Self { module_id, score }
    }
}

/// Returns true if `module_id` names one of the tracked modules
pub fn is_valid_module_id(module_id: i32) -> bool {
    (MIN_MODULE_ID..=MAX_MODULE_ID).contains(&module_id)
}

/// Returns true if `score` is inside the accepted range
pub fn is_valid_score(score: i32) -> bool {
    (MIN_SCORE..=MAX_SCORE).contains(&score)
}

/// Builds the score list for a freshly created user
///
/// One entry per module, in module order, all at zero.
pub fn initial_module_scores() -> Vec<ModuleScore> {
    (MIN_MODULE_ID..=MAX_MODULE_ID)
        .map(|module_id| ModuleScore::new(module_id, 0))
        .collect()
}

/// Picks the module the next review should cover
///
/// Returns the `module_id` of the lowest-scoring entry. Ties go to the entry
/// appearing earliest in `scores`. Returns `None` for an empty list.
pub fn suggest_next_module(scores: &[ModuleScore]) -> Option<i32> {
    // min_by_key keeps the first of several equal minima
    scores
        .iter()
        .min_by_key(|entry| entry.score)
        .map(|entry| entry.module_id)
}

/// Blends a submitted score into an existing one
///
/// With a stored score the result is their mean, rounded half up. Without
/// one the submitted score is taken as-is.
pub fn blend_score(existing: Option<i32>, submitted: i32) -> i32 {
    match existing {
        Some(old) => (old + submitted + 1).div_euclid(2),
        None => submitted,
    }
}

/// Folds a review score into an employee's score list
///
/// Updates the entry for `module_id` in place, or appends a new entry when
/// the module is missing. The list never gains a duplicate module.
///
/// Returns the module's new score.
pub fn apply_submitted_score(scores: &mut Vec<ModuleScore>, module_id: i32, submitted: i32) -> i32 {
    match scores.iter_mut().find(|entry| entry.module_id == module_id) {
        Some(entry) => {
            entry.score = blend_score(Some(entry.score), submitted);
            entry.score
        }
        None => {
            scores.push(ModuleScore::new(module_id, submitted));
            submitted
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn scores_from(values: &[i32]) -> Vec<ModuleScore> {
        values
            .iter()
            .enumerate()
            .map(|(i, &score)| ModuleScore::new(i as i32 + 1, score))
            .collect()
    }

    #[test]
    fn test_initial_scores_cover_every_module() {
        let scores = initial_module_scores();

        assert_eq!(scores.len(), 10);
        for (i, entry) in scores.iter().enumerate() {
            assert_eq!(entry.module_id, i as i32 + 1);
            assert_eq!(entry.score, 0);
        }
    }

    #[test]
    fn test_suggest_picks_lowest_score() {
        let scores = scores_from(&[50, 40, 90, 10, 70, 60, 80, 30, 20, 100]);
        assert_eq!(suggest_next_module(&scores), Some(4));
    }

    #[test]
    fn test_suggest_tie_goes_to_first_entry() {
        let scores = scores_from(&[50, 20, 90, 20, 70, 20, 80, 30, 40, 100]);
        assert_eq!(suggest_next_module(&scores), Some(2));
    }

    #[test]
    fn test_suggest_follows_stored_order_not_module_id() {
        let scores = vec![
            ModuleScore::new(7, 5),
            ModuleScore::new(1, 5),
            ModuleScore::new(3, 9),
        ];
        assert_eq!(suggest_next_module(&scores), Some(7));
    }

    #[test]
    fn test_suggest_on_fresh_user_is_module_one() {
        assert_eq!(suggest_next_module(&initial_module_scores()), Some(1));
    }

    #[test]
    fn test_suggest_empty_is_none() {
        assert_eq!(suggest_next_module(&[]), None);
    }

    #[test]
    fn test_blend_averages_existing_score() {
        assert_eq!(blend_score(Some(70), 50), 60);
        assert_eq!(blend_score(Some(100), 100), 100);
        assert_eq!(blend_score(Some(0), 0), 0);
    }

    #[test]
    fn test_blend_rounds_half_up() {
        assert_eq!(blend_score(Some(0), 75), 38);
        assert_eq!(blend_score(Some(0), 1), 1);
        assert_eq!(blend_score(Some(99), 100), 100);
    }

    #[test]
    fn test_blend_without_existing_takes_submitted() {
        assert_eq!(blend_score(None, 80), 80);
    }

    #[test]
    fn test_apply_updates_existing_entry() {
        let mut scores = initial_module_scores();
        scores[4].score = 70;

        let new_score = apply_submitted_score(&mut scores, 5, 50);

        assert_eq!(new_score, 60);
        assert_eq!(scores[4], ModuleScore::new(5, 60));
        assert_eq!(scores.len(), 10);
    }

    #[test]
    fn test_apply_inserts_missing_module() {
        let mut scores = vec![ModuleScore::new(1, 10)];

        let new_score = apply_submitted_score(&mut scores, 4, 80);

        assert_eq!(new_score, 80);
        assert_eq!(scores, vec![ModuleScore::new(1, 10), ModuleScore::new(4, 80)]);
    }

    #[test]
    fn test_validity_bounds() {
        assert!(is_valid_module_id(1));
        assert!(is_valid_module_id(10));
        assert!(!is_valid_module_id(0));
        assert!(!is_valid_module_id(11));

        assert!(is_valid_score(0));
        assert!(is_valid_score(100));
        assert!(!is_valid_score(-1));
        assert!(!is_valid_score(101));
    }

    proptest! {
        #[test]
        fn prop_suggestion_is_first_minimum(values in proptest::collection::vec(0..=100i32, 10)) {
            let scores = scores_from(&values);
            let min = *values.iter().min().unwrap();
            let first_min_index = values.iter().position(|&v| v == min).unwrap();

            prop_assert_eq!(suggest_next_module(&scores), Some(first_min_index as i32 + 1));
        }

        #[test]
        fn prop_blend_stays_between_inputs(old in 0..=100i32, submitted in 0..=100i32) {
            let blended = blend_score(Some(old), submitted);

            prop_assert!(blended >= old.min(submitted));
            prop_assert!(blended <= old.max(submitted));
            prop_assert!(is_valid_score(blended));
        }

        #[test]
        fn prop_apply_never_duplicates_modules(
            module_id in 1..=10i32,
            submitted in 0..=100i32,
            rounds in 1..5usize,
        ) {
            let mut scores = initial_module_scores();
            for _ in 0..rounds {
                apply_submitted_score(&mut scores, module_id, submitted);
            }

            prop_assert_eq!(scores.len(), 10);
            let matching = scores.iter().filter(|entry| entry.module_id == module_id).count();
            prop_assert_eq!(matching, 1);
        }
    }
}
