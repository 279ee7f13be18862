//! Goal execution order

use chrono::NaiveDate;

use crate::client::{Client, Goal};
use crate::error::PlanError;
use crate::goals::resolve_term;
use crate::settings::SettingsSnapshot;

/// A goal's slot in the run
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledGoal {
    /// Position in the request
    pub index: usize,
    pub tier: u32,
    pub term: Result<u32, PlanError>,
}

/// Orders goals by tier, then ascending term, then request order. Goals
/// whose term cannot be resolved go last in their tier and keep the error
/// for the calculator boundary.
pub struct GoalScheduler;

impl GoalScheduler {
    pub fn schedule(
        goals: &[Goal],
        client: &Client,
        settings: &SettingsSnapshot,
        date: NaiveDate,
    ) -> Vec<ScheduledGoal> {
        let mut scheduled: Vec<ScheduledGoal> = goals
            .iter()
            .enumerate()
            .map(|(index, goal)| ScheduledGoal {
                index,
                tier: goal.priority_tier(),
                term: resolve_term(goal, client, settings, date),
            })
            .collect();

        scheduled.sort_by_key(|s| match &s.term {
            Ok(term) => (s.tier, false, *term),
            Err(_) => (s.tier, true, 0),
        });
        scheduled
    }
}
