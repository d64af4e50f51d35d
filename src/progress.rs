//! Derived-state recomputation: streaks, weak topics, achievement unlocks.
//!
//! Everything here is a pure function over a `StudentProfile` snapshot; the
//! caller is responsible for holding exclusive access to the profile for the
//! whole merge+evaluate+write scope (see `state`). Each returned unlock is a
//! one-time event; the caller turns it into a notification.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::debug;

use crate::domain::{Achievement, StudentProfile};

/// A topic with a recorded score below this is "weak".
pub const WEAK_SCORE_THRESHOLD: f64 = 0.7;

/// Consecutive login days needed for the streak badge.
const STREAK_STARTER_DAYS: u32 = 3;

/// Apply a login on `today` to the streak counter.
///
/// Same-day logins are a no-op. A login the day after `last_login_date`
/// increments the streak; any other gap resets it to 1. `last_login_date`
/// is always set to `today` afterward. Returns the streak badge if this
/// login unlocked it.
pub fn update_streak(profile: &mut StudentProfile, today: NaiveDate) -> Option<Achievement> {
  if profile.last_login_date == Some(today) {
    return None;
  }

  match profile.last_login_date {
    Some(last) if last.succ_opt() == Some(today) => profile.streak += 1,
    _ => profile.streak = 1,
  }
  profile.last_login_date = Some(today);
  debug!(target: "progress", streak = profile.streak, %today, "streak updated");

  if profile.streak >= STREAK_STARTER_DAYS {
    return unlock(profile, Achievement::StreakStarter);
  }
  None
}

/// Merge a batch of new quiz scores into the profile (last write wins per
/// topic) and recompute the weak-topic set from the merged scores.
pub fn merge_scores(profile: &mut StudentProfile, new_scores: &BTreeMap<String, f64>) {
  for (topic, score) in new_scores {
    profile.quiz_scores.insert(topic.clone(), *score);
  }
  recompute_weak_topics(profile);
}

/// Recompute `weak_topics = { topic : quiz_scores[topic] < 0.7 }`.
/// A topic with no recorded score is never weak by this rule.
pub fn recompute_weak_topics(profile: &mut StudentProfile) {
  profile.weak_topics = profile
    .quiz_scores
    .iter()
    .filter(|(_, score)| **score < WEAK_SCORE_THRESHOLD)
    .map(|(topic, _)| topic.clone())
    .collect();
}

/// Evaluate the non-streak achievement predicates against the current
/// profile state. Idempotent: already-held achievements are never re-checked
/// and never removed. Returns the newly unlocked set.
pub fn evaluate_achievements(profile: &mut StudentProfile) -> Vec<Achievement> {
  let mut unlocked = Vec::new();

  if !profile.completed_modules.is_empty() {
    unlocked.extend(unlock(profile, Achievement::FirstStep));
  }

  if profile.quiz_scores.values().any(|s| *s == 1.0) {
    unlocked.extend(unlock(profile, Achievement::QuizWhiz));
  }

  if profile.final_test_score == Some(100) {
    unlocked.extend(unlock(profile, Achievement::Perfectionist));
  }

  unlocked
}

/// Add `achievement` to the profile if not already held.
/// Returns it only when this call performed the unlock.
fn unlock(profile: &mut StudentProfile, achievement: Achievement) -> Option<Achievement> {
  let id = achievement.id();
  if profile.achievements.iter().any(|a| a == id) {
    return None;
  }
  profile.achievements.push(id.to_string());
  debug!(target: "progress", achievement = id, "achievement unlocked");
  Some(achievement)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
  }

  fn scores(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
    pairs.iter().map(|(t, s)| (t.to_string(), *s)).collect()
  }

  #[test]
  fn consecutive_day_login_increments_streak() {
    let mut p = StudentProfile::default();
    update_streak(&mut p, day(1));
    assert_eq!(p.streak, 1);
    update_streak(&mut p, day(2));
    assert_eq!(p.streak, 2);
    assert_eq!(p.last_login_date, Some(day(2)));
  }

  #[test]
  fn same_day_login_is_a_noop() {
    let mut p = StudentProfile::default();
    update_streak(&mut p, day(1));
    update_streak(&mut p, day(2));
    update_streak(&mut p, day(2));
    assert_eq!(p.streak, 2);
  }

  #[test]
  fn gap_resets_streak_to_one() {
    let mut p = StudentProfile::default();
    update_streak(&mut p, day(1));
    update_streak(&mut p, day(2));
    update_streak(&mut p, day(5));
    assert_eq!(p.streak, 1);
    assert_eq!(p.last_login_date, Some(day(5)));
  }

  #[test]
  fn third_consecutive_login_unlocks_streak_starter_once() {
    let mut p = StudentProfile::default();
    assert_eq!(update_streak(&mut p, day(1)), None);
    assert_eq!(update_streak(&mut p, day(2)), None);
    assert_eq!(update_streak(&mut p, day(3)), Some(Achievement::StreakStarter));
    // Already held: day four keeps the streak going but unlocks nothing.
    assert_eq!(update_streak(&mut p, day(4)), None);
    assert_eq!(p.streak, 4);
  }

  #[test]
  fn weak_topics_match_threshold_rule_after_any_merge() {
    let mut p = StudentProfile::default();
    merge_scores(&mut p, &scores(&[("Algebra", 0.9), ("Calculus", 0.4)]));
    assert_eq!(p.weak_topics, vec!["Calculus".to_string()]);

    // Last write wins per topic; weak set follows the merged scores.
    merge_scores(&mut p, &scores(&[("Calculus", 0.8), ("Statistics", 0.69)]));
    assert_eq!(p.quiz_scores["Calculus"], 0.8);
    assert_eq!(p.weak_topics, vec!["Statistics".to_string()]);

    let expected: Vec<String> = p
      .quiz_scores
      .iter()
      .filter(|(_, s)| **s < WEAK_SCORE_THRESHOLD)
      .map(|(t, _)| t.clone())
      .collect();
    assert_eq!(p.weak_topics, expected);
  }

  #[test]
  fn quiz_whiz_requires_an_exact_perfect_score() {
    let mut p = StudentProfile::default();
    merge_scores(&mut p, &scores(&[("Algebra", 0.99)]));
    assert!(evaluate_achievements(&mut p).is_empty());

    merge_scores(&mut p, &scores(&[("Algebra", 1.0)]));
    assert_eq!(evaluate_achievements(&mut p), vec![Achievement::QuizWhiz]);
  }

  #[test]
  fn perfectionist_requires_exactly_one_hundred() {
    let mut p = StudentProfile::default();
    p.final_test_score = Some(99);
    assert!(evaluate_achievements(&mut p).is_empty());

    p.final_test_score = Some(100);
    assert_eq!(evaluate_achievements(&mut p), vec![Achievement::Perfectionist]);
  }

  #[test]
  fn first_step_unlocks_on_first_completed_module() {
    let mut p = StudentProfile::default();
    assert!(evaluate_achievements(&mut p).is_empty());
    p.completed_modules.push("Algebra".into());
    assert_eq!(evaluate_achievements(&mut p), vec![Achievement::FirstStep]);
  }

  #[test]
  fn achievements_are_monotonic() {
    let mut p = StudentProfile::default();
    p.completed_modules.push("Algebra".into());
    merge_scores(&mut p, &scores(&[("Algebra", 1.0)]));
    let first = evaluate_achievements(&mut p);
    assert_eq!(first.len(), 2);

    // No further sequence of updates removes an achievement, and the second
    // evaluation of the same state unlocks nothing.
    merge_scores(&mut p, &scores(&[("Algebra", 0.1)]));
    assert!(evaluate_achievements(&mut p).is_empty());
    assert!(p.achievements.contains(&"quiz_whiz".to_string()));
    assert!(p.achievements.contains(&"first_step".to_string()));
  }
}
