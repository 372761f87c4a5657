//! Pattern-day-trade admission.
//!
//! Only a SELL that takes the position from HOLDING to FLAT is a round trip.
//! Such a sell is rejected once the trailing window already holds
//! `max_day_trades` round trips.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};

use super::ledger::{LedgerSnapshot, Side};
use super::settings::{PortfolioSettings, TrailingWindow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Admit { round_trip: bool },
    Reject { round_trips: u32, max: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeGate {
    max_day_trades: u32,
    window: TrailingWindow,
}

impl TradeGate {
    pub fn new(max_day_trades: u32, window: TrailingWindow) -> Self {
        TradeGate {
            max_day_trades,
            window,
        }
    }

    pub fn from_settings(settings: &PortfolioSettings) -> Self {
        Self::new(settings.max_day_trades, settings.window)
    }

    pub fn max_day_trades(&self) -> u32 {
        self.max_day_trades
    }

    pub fn admit(
        &self,
        history: &[LedgerSnapshot],
        side: Side,
        qty: u64,
        current_position: u64,
        at: NaiveDateTime,
    ) -> GateDecision {
        let closes = side == Side::Sell && qty > 0 && current_position == qty;
        if !closes {
            return GateDecision::Admit { round_trip: false };
        }

        let round_trips = self.round_trips_in_window(history, at);
        if round_trips >= self.max_day_trades {
            GateDecision::Reject {
                round_trips,
                max: self.max_day_trades,
            }
        } else {
            GateDecision::Admit { round_trip: true }
        }
    }

    /// Sum of `day_trades` over the trailing window ending at `at`.
    pub fn round_trips_in_window(&self, history: &[LedgerSnapshot], at: NaiveDateTime) -> u32 {
        match self.window {
            TrailingWindow::Rows(n) => history.iter().rev().take(n).map(|s| s.day_trades).sum(),
            TrailingWindow::Sessions(n) => {
                let today = at.date();
                let start = sessions_back(today, n);
                history
                    .iter()
                    .filter(|s| (start..=today).contains(&s.timestamp.date()))
                    .map(|s| s.day_trades)
                    .sum()
            }
        }
    }
}

fn is_weekday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// First date of an `n`-session window ending on `today`: `today` stepped
/// back over `n - 1` weekdays. Idle days age history out like any other.
fn sessions_back(today: NaiveDate, n: usize) -> NaiveDate {
    let mut start = today;
    let mut remaining = n.saturating_sub(1);
    while remaining > 0 {
        match start.pred_opt() {
            Some(prev) => start = prev,
            None => break,
        }
        if is_weekday(start) {
            remaining -= 1;
        }
    }
    start
}
