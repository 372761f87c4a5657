//! Intraday price zone from lower/upper forward-return quantiles.

use std::fmt;

use super::ledger::Side;
use super::settings::IntradaySettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advice {
    Buy,
    Sell,
    Hold,
}

impl Advice {
    pub fn side(self) -> Option<Side> {
        match self {
            Advice::Buy => Some(Side::Buy),
            Advice::Sell => Some(Side::Sell),
            Advice::Hold => None,
        }
    }
}

impl fmt::Display for Advice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Advice::Buy => "BUY",
            Advice::Sell => "SELL",
            Advice::Hold => "HOLD",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceZone {
    pub price: f64,
    pub ret_lo: f64,
    pub ret_hi: f64,
}

impl PriceZone {
    pub fn new(price: f64, ret_lo: f64, ret_hi: f64) -> Self {
        PriceZone {
            price,
            ret_lo,
            ret_hi,
        }
    }

    pub fn low_target(&self) -> f64 {
        self.price * (1.0 + self.ret_lo)
    }

    pub fn high_target(&self) -> f64 {
        self.price * (1.0 + self.ret_hi)
    }

    /// BUY when the whole band is positive and the top clears `edge`; SELL for
    /// the mirror case; otherwise HOLD.
    pub fn advise(&self, edge: f64) -> Advice {
        if self.ret_hi > edge && self.ret_lo > 0.0 {
            Advice::Buy
        } else if self.ret_lo < -edge && self.ret_hi < 0.0 {
            Advice::Sell
        } else {
            Advice::Hold
        }
    }

    pub fn describe(&self, advice: Advice, settings: &IntradaySettings, confidence: f64) -> String {
        match advice {
            Advice::Buy => format!(
                "Buy {} {:.2} now, target >= {:.2} within {} min (conf {:.0}%)",
                settings.symbol,
                self.price,
                self.high_target(),
                settings.horizon_minutes,
                confidence * 100.0
            ),
            Advice::Sell => format!(
                "Sell {} {:.2} now, cover <= {:.2} within {} min (conf {:.0}%)",
                settings.symbol,
                self.price,
                self.low_target(),
                settings.horizon_minutes,
                confidence * 100.0
            ),
            Advice::Hold => format!("No clear edge, hold (conf {:.0}%)", confidence * 100.0),
        }
    }
}
