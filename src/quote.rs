//! Time-bounded priced offers.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{BookingError, Result},
    fare::FareBreakdown,
    load::LoadSpec,
};

/// How long a quote stays confirmable by default.
pub const DEFAULT_QUOTE_TTL_SECS: i64 = 15 * 60;

/// A priced offer for one load description.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub id: Uuid,
    /// Snapshot of the load at quote time.
    pub load_details: LoadSpec,
    pub price_breakdown: FareBreakdown,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Quote {
    /// Issue a quote valid for `ttl` from `now`.
    pub fn issue(
        load_details: LoadSpec,
        price_breakdown: FareBreakdown,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            load_details,
            price_breakdown,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    /// Confirmable strictly before `expires_at`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    pub fn ensure_valid(&self, now: DateTime<Utc>) -> Result<()> {
        if self.is_valid_at(now) {
            Ok(())
        } else {
            Err(BookingError::QuoteExpired {
                expired_at: self.expires_at,
            })
        }
    }

    /// Time left before expiry, zero once expired.
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).max(Duration::zero())
    }

    /// Short display id, e.g. `QT-1A2B3C4D`.
    pub fn reference(&self) -> String {
        format!("QT-{}", &self.id.simple().to_string()[..8].to_uppercase())
    }
}
