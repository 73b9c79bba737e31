//! Daily streaks and achievement unlocks

use super::effect::Effect;
use super::state::{AppState, DailyStreak};
use crate::catalog::{all_achievements, UnlockRule, DEFAULT_THEME_ID};
use chrono::NaiveDate;
use std::collections::HashSet;

/// Streak after a visit on `today`
///
/// Same day leaves it untouched, the next calendar day extends it, any gap
/// (or a clock that went backwards) restarts it at one.
pub fn advance_streak(streak: &DailyStreak, today: NaiveDate) -> DailyStreak {
    match streak.last_visit {
        Some(last) if last == today => streak.clone(),
        Some(last) if today.pred_opt() == Some(last) => DailyStreak {
            count: streak.count + 1,
            last_visit: Some(today),
        },
        _ => DailyStreak {
            count: 1,
            last_visit: Some(today),
        },
    }
}

/// Evaluate a single unlock rule against current state
pub fn rule_satisfied(rule: UnlockRule, state: &AppState) -> bool {
    match rule {
        UnlockRule::JournalEntries { at_least } => state.journal_entries.len() >= at_least,
        UnlockRule::SavedChats { at_least } => state.saved_chats.len() >= at_least,
        UnlockRule::DistinctPersonasSaved { at_least } => {
            let personas: HashSet<&str> = state
                .saved_chats
                .iter()
                .map(|c| c.persona_id.as_str())
                .collect();
            personas.len() >= at_least
        }
        UnlockRule::StreakDays { at_least } => state.daily_streak.count >= at_least,
        UnlockRule::CustomTheme => state.settings.active_theme_id != DEFAULT_THEME_ID,
        UnlockRule::VisitView { view } => state.current_view == view,
        UnlockRule::ChallengesCompleted { at_least } => {
            state.completed_challenge_dates.len() >= at_least
        }
    }
}

/// Unlock every achievement whose rule now holds
///
/// Already-unlocked ids are skipped, so a second call on unchanged state
/// returns no effects. The last fresh unlock becomes the pending notification.
pub fn recheck_achievements(state: &mut AppState) -> Vec<Effect> {
    let mut effects = Vec::new();
    for achievement in all_achievements() {
        if state.unlocked_achievements.iter().any(|id| id == achievement.id) {
            continue;
        }
        if rule_satisfied(achievement.rule, state) {
            state.unlocked_achievements.push(achievement.id.to_string());
            state.last_unlocked_achievement = Some(achievement.id.to_string());
            effects.push(Effect::notify_achievement(achievement.id));
        }
    }
    effects
}
