use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::ids::UserId;

/// Experience points needed per level.
pub const XP_PER_LEVEL: u32 = 1000;

/// Authenticated learner with their progression stats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub display_name: String,
    pub level: u32,
    pub xp_points: u32,
    pub streak_days: u32,
    pub last_activity: Option<NaiveDate>,
}

impl UserProfile {
    /// A fresh profile at level 1 with no history.
    #[must_use]
    pub fn new(id: UserId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            level: 1,
            xp_points: 0,
            streak_days: 0,
            last_activity: None,
        }
    }

    /// Level implied by an XP total (level 1 starts at 0 XP).
    #[must_use]
    pub fn level_for_xp(xp: u32) -> u32 {
        xp / XP_PER_LEVEL + 1
    }

    /// XP still required to reach the next level.
    #[must_use]
    pub fn xp_to_next_level(&self) -> u32 {
        XP_PER_LEVEL - self.xp_points % XP_PER_LEVEL
    }

    /// Credit a finished quiz: add points, recompute level, extend the daily streak.
    ///
    /// Finishing on the same day as the last activity keeps the streak, the
    /// following day extends it, anything later restarts it at 1.
    pub fn apply_quiz_result(&mut self, points_earned: u32, completed_on: NaiveDate) {
        self.xp_points = self.xp_points.saturating_add(points_earned);
        self.level = Self::level_for_xp(self.xp_points);

        self.streak_days = match self.last_activity {
            Some(last) if last == completed_on => self.streak_days.max(1),
            Some(last) if last.succ_opt() == Some(completed_on) => {
                self.streak_days.saturating_add(1)
            }
            _ => 1,
        };
        self.last_activity = Some(completed_on);
    }
}
