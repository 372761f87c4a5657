//! Append-only portfolio ledger for a single instrument.
//!
//! Every accepted trade appends one snapshot; nothing is edited in place.
//! Rejections leave the ledger untouched and are reported as a
//! [`SkipReason`], never as an error.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

use super::error::SlopetraderError;
use super::settings::PortfolioSettings;
use super::trade_gate::{GateDecision, TradeGate};
use crate::ports::ledger_port::LedgerStore;

const NAV_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub timestamp: NaiveDateTime,
    pub cash: f64,
    pub pos: u64,
    pub nav: f64,
    pub day_trades: u32,
}

impl LedgerSnapshot {
    pub fn seed(timestamp: NaiveDateTime, start_cash: f64) -> Self {
        LedgerSnapshot {
            timestamp,
            cash: start_cash,
            pos: 0,
            nav: start_cash,
            day_trades: 0,
        }
    }

    /// Check the invariants a persisted row must satisfy. The mark price is
    /// not stored, so a held position only requires `nav >= cash`.
    pub fn validate(&self, row: usize) -> Result<(), SlopetraderError> {
        let corrupt = |reason: String| SlopetraderError::CorruptLedger { row, reason };
        if !self.cash.is_finite() || self.cash < 0.0 {
            return Err(corrupt(format!("cash {} is negative or not finite", self.cash)));
        }
        if !self.nav.is_finite() {
            return Err(corrupt(format!("nav {} is not finite", self.nav)));
        }
        let tol = NAV_TOLERANCE * self.cash.abs().max(1.0);
        if self.pos == 0 && (self.nav - self.cash).abs() > tol {
            return Err(corrupt(format!(
                "nav {} differs from cash {} with no position",
                self.nav, self.cash
            )));
        }
        if self.pos > 0 && self.nav < self.cash - tol {
            return Err(corrupt(format!(
                "nav {} below cash {} with {} held",
                self.nav, self.cash, self.pos
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => f.write_str("BUY"),
            Side::Sell => f.write_str("SELL"),
        }
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BUY" => Ok(Side::Buy),
            "SELL" => Ok(Side::Sell),
            other => Err(format!("unknown side {:?}, expected BUY or SELL", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeRequest {
    pub side: Side,
    pub price: f64,
    pub timestamp: NaiveDateTime,
    pub qty: u64,
}

impl TradeRequest {
    pub fn new(side: Side, price: f64, timestamp: NaiveDateTime) -> Self {
        TradeRequest {
            side,
            price,
            timestamp,
            qty: 1,
        }
    }

    pub fn with_qty(mut self, qty: u64) -> Self {
        self.qty = qty;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    InvalidRequest(String),
    InsufficientCash { required: f64, available: f64 },
    NoInventory { requested: u64, held: u64 },
    PdtCap { round_trips: u32, max: u32 },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::InvalidRequest(reason) => write!(f, "invalid request: {}", reason),
            SkipReason::InsufficientCash { .. } => f.write_str("insufficient cash"),
            SkipReason::NoInventory { .. } => f.write_str("no inventory"),
            SkipReason::PdtCap { .. } => f.write_str("PDT cap"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BookingOutcome {
    Executed { nav: f64, snapshot: LedgerSnapshot },
    Skipped(SkipReason),
}

impl BookingOutcome {
    pub fn is_executed(&self) -> bool {
        matches!(self, BookingOutcome::Executed { .. })
    }
}

impl fmt::Display for BookingOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingOutcome::Executed { nav, .. } => write!(f, "EXECUTED NAV={:.2}", nav),
            BookingOutcome::Skipped(reason) => write!(f, "SKIPPED {}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioLedger {
    snapshots: Vec<LedgerSnapshot>,
    gate: TradeGate,
}

impl PortfolioLedger {
    /// Fresh ledger with one seed snapshot holding `start_cash`.
    pub fn seeded(start_cash: f64, at: NaiveDateTime, gate: TradeGate) -> Self {
        PortfolioLedger {
            snapshots: vec![LedgerSnapshot::seed(at, start_cash)],
            gate,
        }
    }

    /// Rebuild from persisted history, validating every row.
    pub fn from_history(
        snapshots: Vec<LedgerSnapshot>,
        gate: TradeGate,
    ) -> Result<Self, SlopetraderError> {
        if snapshots.is_empty() {
            return Err(SlopetraderError::CorruptLedger {
                row: 0,
                reason: "history has no rows".into(),
            });
        }
        for (row, snapshot) in snapshots.iter().enumerate() {
            snapshot.validate(row)?;
        }
        Ok(PortfolioLedger { snapshots, gate })
    }

    /// Load the persisted ledger, seeding and persisting a fresh one on
    /// first run.
    pub fn open(
        store: &dyn LedgerStore,
        settings: &PortfolioSettings,
        now: NaiveDateTime,
    ) -> Result<Self, SlopetraderError> {
        let gate = TradeGate::from_settings(settings);
        match store.load()? {
            Some(history) if !history.is_empty() => Self::from_history(history, gate),
            _ => {
                info!(start_cash = settings.start_cash, "seeding new ledger");
                let ledger = Self::seeded(settings.start_cash, now, gate);
                store.append(ledger.current())?;
                Ok(ledger)
            }
        }
    }

    pub fn current(&self) -> &LedgerSnapshot {
        // never empty: constructors guarantee the seed row
        &self.snapshots[self.snapshots.len() - 1]
    }

    pub fn history(&self) -> &[LedgerSnapshot] {
        &self.snapshots
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// The snapshot `request` would append, or why it cannot.
    pub fn propose(&self, request: &TradeRequest) -> Result<LedgerSnapshot, SkipReason> {
        if !(request.price.is_finite() && request.price > 0.0) {
            return Err(SkipReason::InvalidRequest(format!(
                "price {} must be positive",
                request.price
            )));
        }
        if request.qty == 0 {
            return Err(SkipReason::InvalidRequest("quantity must be positive".into()));
        }

        let last = self.current();
        let notional = request.price * request.qty as f64;
        let (cash, pos, day_trades) = match request.side {
            Side::Buy => {
                if last.cash < notional {
                    return Err(SkipReason::InsufficientCash {
                        required: notional,
                        available: last.cash,
                    });
                }
                let pos = last.pos.checked_add(request.qty).ok_or_else(|| {
                    SkipReason::InvalidRequest(format!(
                        "quantity {} overflows position {}",
                        request.qty, last.pos
                    ))
                })?;
                (last.cash - notional, pos, 0)
            }
            Side::Sell => {
                if last.pos < request.qty {
                    return Err(SkipReason::NoInventory {
                        requested: request.qty,
                        held: last.pos,
                    });
                }
                let decision = self.gate.admit(
                    &self.snapshots,
                    Side::Sell,
                    request.qty,
                    last.pos,
                    request.timestamp,
                );
                let day_trades = match decision {
                    GateDecision::Reject { round_trips, max } => {
                        return Err(SkipReason::PdtCap { round_trips, max });
                    }
                    GateDecision::Admit { round_trip } => u32::from(round_trip),
                };
                (last.cash + notional, last.pos - request.qty, day_trades)
            }
        };

        Ok(LedgerSnapshot {
            timestamp: request.timestamp,
            cash,
            pos,
            nav: cash + pos as f64 * request.price,
            day_trades,
        })
    }

    /// Book in memory only.
    pub fn book(&mut self, request: &TradeRequest) -> BookingOutcome {
        match self.propose(request) {
            Ok(snapshot) => {
                let nav = snapshot.nav;
                self.snapshots.push(snapshot.clone());
                BookingOutcome::Executed { nav, snapshot }
            }
            Err(reason) => {
                warn!(side = %request.side, price = request.price, %reason, "trade skipped");
                BookingOutcome::Skipped(reason)
            }
        }
    }

    /// Book and persist. The store is written first; if that fails the
    /// in-memory ledger is left as it was.
    pub fn book_persisted(
        &mut self,
        store: &dyn LedgerStore,
        request: &TradeRequest,
    ) -> Result<BookingOutcome, SlopetraderError> {
        match self.propose(request) {
            Ok(snapshot) => {
                store.append(&snapshot)?;
                let nav = snapshot.nav;
                info!(
                    side = %request.side,
                    qty = request.qty,
                    price = request.price,
                    nav,
                    "trade executed"
                );
                self.snapshots.push(snapshot.clone());
                Ok(BookingOutcome::Executed { nav, snapshot })
            }
            Err(reason) => {
                warn!(side = %request.side, price = request.price, %reason, "trade skipped");
                Ok(BookingOutcome::Skipped(reason))
            }
        }
    }
}
