//! Shared pool of undedicated liquid assets
//!
//! Events are kept in chronological order and consumed in place, so a goal
//! processed later only sees what earlier goals left behind.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::client::PlanRequest;

/// Amounts below this are treated as exhausted
const DUST: f64 = 1e-6;

/// Source label of the client's liquid capital event
pub const LIQUID_CAPITAL_SOURCE: &str = "liquid_capital";

/// Pool inflow available from `month` onwards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolEvent {
    pub source: String,
    pub month: u32,
    pub original: f64,
    pub remaining: f64,
}

impl PoolEvent {
    pub fn new(source: &str, month: u32, amount: f64) -> Self {
        let amount = amount.max(0.0);
        Self {
            source: source.to_string(),
            month,
            original: amount,
            remaining: amount,
        }
    }

    pub fn drawn(&self) -> f64 {
        self.original - self.remaining
    }
}

/// Part of one event consumed by a goal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolDraw {
    pub source: String,
    pub month: u32,
    /// Nominal amount taken from the event
    pub amount: f64,
    /// Value of that amount at the goal's horizon
    pub value_at_horizon: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SharedPool {
    events: Vec<PoolEvent>,
}

impl SharedPool {
    pub fn new(mut events: Vec<PoolEvent>) -> Self {
        events.sort_by_key(|e| e.month);
        Self { events }
    }

    /// Client liquid capital at month 0 plus every asset no goal claims
    pub fn from_request(request: &PlanRequest) -> Self {
        let mut events = Vec::new();
        if request.client.liquid_capital > 0.0 {
            events.push(PoolEvent::new(LIQUID_CAPITAL_SOURCE, 0, request.client.liquid_capital));
        }

        for asset in &request.assets {
            if request.goals.iter().any(|g| g.owns_asset(asset)) {
                continue;
            }
            if let Some(goal_id) = &asset.goal_id {
                warn!("Asset {} is linked to unknown goal {}, adding it to the shared pool", asset.id, goal_id);
            }
            events.push(PoolEvent::new(&asset.id, asset.unlock_month, asset.value));
        }

        Self::new(events)
    }

    pub fn events(&self) -> &[PoolEvent] {
        &self.events
    }

    pub fn total_remaining(&self) -> f64 {
        self.events.iter().map(|e| e.remaining).sum()
    }

    /// Cover up to `gap` (valued at `horizon`) from the pool. Each event is
    /// grown at `monthly_yield` from its month to the horizon; events after
    /// the horizon are skipped.
    pub fn draw(&mut self, gap: f64, horizon: u32, monthly_yield: f64) -> Vec<PoolDraw> {
        let mut remaining_gap = gap;
        let mut draws = Vec::new();

        for event in self.events.iter_mut() {
            if remaining_gap <= DUST {
                break;
            }
            if event.month > horizon || event.remaining <= DUST {
                continue;
            }

            let factor = (1.0 + monthly_yield).powi((horizon - event.month) as i32);
            let available = event.remaining * factor;
            let (amount, value) = if available >= remaining_gap {
                (remaining_gap / factor, remaining_gap)
            } else {
                (event.remaining, available)
            };

            event.remaining = (event.remaining - amount).max(0.0);
            remaining_gap -= value;
            debug!("Pool draw {:.2} from {} (month {})", amount, event.source, event.month);
            draws.push(PoolDraw {
                source: event.source.clone(),
                month: event.month,
                amount,
                value_at_horizon: value,
            });
        }

        draws
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{Asset, Client, Goal, GoalType};
    use approx::assert_abs_diff_eq;

    fn asset(id: &str, value: f64, goal_id: Option<&str>, unlock_month: u32) -> Asset {
        Asset {
            id: id.to_string(),
            asset_type: "DEPOSIT".to_string(),
            value,
            goal_id: goal_id.map(str::to_string),
            unlock_month,
        }
    }

    #[test]
    fn test_pool_from_request() {
        let mut goal = Goal::new(GoalType::Investment, "Car", 1_000_000.0, 36);
        goal.id = Some("g1".to_string());
        let request = PlanRequest {
            calculation_date: None,
            client: Client { liquid_capital: 50_000.0, ..Client::default() },
            goals: vec![goal],
            assets: vec![
                asset("a1", 100_000.0, Some("g1"), 0),
                asset("a2", 200_000.0, None, 12),
                asset("a3", 300_000.0, Some("ghost"), 6),
            ],
        };

        let pool = SharedPool::from_request(&request);
        let sources: Vec<&str> = pool.events().iter().map(|e| e.source.as_str()).collect();
        assert_eq!(sources, vec![LIQUID_CAPITAL_SOURCE, "a3", "a2"]);
        assert_abs_diff_eq!(pool.total_remaining(), 550_000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_partial_draw_discounts_to_event_month() {
        let mut pool = SharedPool::new(vec![PoolEvent::new("cash", 0, 100_000.0)]);
        let draws = pool.draw(55_000.0, 12, 0.01);

        assert_eq!(draws.len(), 1);
        assert_abs_diff_eq!(draws[0].value_at_horizon, 55_000.0, epsilon = 1e-9);
        assert_abs_diff_eq!(draws[0].amount, 55_000.0 / 1.01_f64.powi(12), epsilon = 1e-9);
        assert_abs_diff_eq!(pool.events()[0].remaining, 100_000.0 - draws[0].amount, epsilon = 1e-9);
    }

    #[test]
    fn test_draw_walks_events_in_order_and_skips_late_ones() {
        let mut pool = SharedPool::new(vec![
            PoolEvent::new("late", 48, 1_000_000.0),
            PoolEvent::new("b", 6, 10_000.0),
            PoolEvent::new("a", 0, 10_000.0),
        ]);
        let draws = pool.draw(1_000_000.0, 24, 0.0);

        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].source, "a");
        assert_eq!(draws[1].source, "b");
        assert_eq!(pool.events()[2].remaining, 1_000_000.0);
    }

    #[test]
    fn test_never_double_spends() {
        let mut pool = SharedPool::new(vec![PoolEvent::new("a", 0, 30_000.0), PoolEvent::new("b", 3, 20_000.0)]);
        for (gap, horizon) in [(25_000.0, 12), (25_000.0, 6), (25_000.0, 60), (1e9, 120)] {
            pool.draw(gap, horizon, 0.008);
        }
        for event in pool.events() {
            assert!(event.drawn() <= event.original + 1e-9);
            assert!(event.remaining >= 0.0);
        }
        assert!(pool.total_remaining() < 1e-6);
    }
}
