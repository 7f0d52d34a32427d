//! Market data source trait and structured error types.
//!
//! The engine never talks to a broker directly. Sources receive an explicit
//! [`BrokerSession`] on every call, so no credential lives in process-wide state.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Bar;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("instrument not found: {instrument}")]
    InstrumentNotFound { instrument: String },
}

/// Broker session context handed to market-data calls.
///
/// Sources that need no authentication (files, fixtures) accept
/// [`BrokerSession::anonymous`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerSession {
    pub api_key: Option<String>,
    pub access_token: Option<String>,
}

impl BrokerSession {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_token(api_key: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            access_token: Some(access_token.into()),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }
}

/// Supplier of reference bars and intraday candles.
pub trait MarketDataSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Daily bar of the last completed session before `session_date`.
    ///
    /// `Ok(None)` means the source has no such bar; callers treat that as
    /// not-found rather than as a zero bar.
    fn reference_bar(
        &self,
        session: &BrokerSession,
        instrument: &str,
        session_date: NaiveDate,
    ) -> Result<Option<Bar>, DataError>;

    /// Intraday candles for `date`, oldest first.
    fn intraday_bars(
        &self,
        session: &BrokerSession,
        instrument: &str,
        date: NaiveDate,
    ) -> Result<Vec<Bar>, DataError>;
}
