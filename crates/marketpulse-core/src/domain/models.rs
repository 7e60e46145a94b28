use serde::{Deserialize, Serialize};

use crate::{SessionPhase, Symbol, UtcDateTime, ValidationError};

/// One instrument's market snapshot as shown to consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: Symbol,
    pub name: String,
    pub price: f64,
    /// Absolute, signed move against `previous_close`.
    pub change: f64,
    pub change_percent: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub previous_close: f64,
    pub volume: u64,
    pub sector: String,
    pub market_cap: String,
    pub pe_ratio: Option<f64>,
    /// Percent, e.g. `1.25` for 1.25%.
    pub dividend_yield: Option<f64>,
    pub year_high: Option<f64>,
    pub year_low: Option<f64>,
    pub avg_volume: Option<u64>,
    pub beta: Option<f64>,
    pub last_updated: UtcDateTime,
    pub is_real_data: bool,
    pub market_status: SessionPhase,
    #[serde(default)]
    pub is_closing_price: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stored_at: Option<UtcDateTime>,
}

impl Quote {
    /// Checks the invariants every producer must uphold before handing a quote out.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_positive("price", self.price)?;
        validate_finite("change", self.change)?;
        validate_finite("change_percent", self.change_percent)?;
        validate_positive("open", self.open)?;
        validate_positive("high", self.high)?;
        validate_positive("low", self.low)?;
        validate_positive("previous_close", self.previous_close)?;
        if self.high < self.low {
            return Err(ValidationError::InvalidBarRange);
        }
        Ok(())
    }

    /// Copy marked as served from the closing snapshot.
    pub fn as_closing_price(&self, stored_at: UtcDateTime) -> Self {
        Self {
            is_closing_price: true,
            stored_at: Some(stored_at),
            market_status: SessionPhase::Closed,
            ..self.clone()
        }
    }
}

/// `change / previous_close * 100`, zero when the base is not usable.
pub fn change_percent(change: f64, previous_close: f64) -> f64 {
    if previous_close.is_finite() && previous_close > 0.0 {
        change / previous_close * 100.0
    } else {
        0.0
    }
}

/// Render a market capitalization in rupees with a magnitude suffix.
pub fn format_market_cap(value: Option<f64>) -> String {
    match value {
        Some(cap) if cap.is_finite() && cap > 0.0 => {
            if cap >= 1e12 {
                format!("₹{:.1}T", cap / 1e12)
            } else if cap >= 1e9 {
                format!("₹{:.1}B", cap / 1e9)
            } else if cap >= 1e6 {
                format!("₹{:.1}M", cap / 1e6)
            } else {
                format!("₹{cap}")
            }
        }
        _ => String::from("N/A"),
    }
}

/// OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub ts: UtcDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    pub fn new(
        ts: UtcDateTime,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
    ) -> Result<Self, ValidationError> {
        validate_positive("open", open)?;
        validate_positive("high", high)?;
        validate_positive("low", low)?;
        validate_positive("close", close)?;

        if high < low {
            return Err(ValidationError::InvalidBarRange);
        }

        if open < low || open > high || close < low || close > high {
            return Err(ValidationError::InvalidBarBounds);
        }

        Ok(Self {
            ts,
            open,
            high,
            low,
            close,
            volume,
        })
    }
}

/// Ordered bars for one symbol, with provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarSeries {
    pub symbol: Symbol,
    pub bars: Vec<Bar>,
    pub is_real_data: bool,
}

fn validate_finite(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    Ok(())
}

fn validate_positive(field: &'static str, value: f64) -> Result<(), ValidationError> {
    validate_finite(field, value)?;
    if value <= 0.0 {
        return Err(ValidationError::NonPositiveValue { field });
    }
    Ok(())
}
