//! Shipment descriptors: the draft edited in the wizard and the booked load.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{
    catalog::TruckCategory,
    error::{BookingError, Result},
};

/// Geographic coordinate pair.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const KARACHI: LatLng = LatLng {
        lat: 24.8607,
        lng: 67.0011,
    };
    pub const LAHORE: LatLng = LatLng {
        lat: 31.5204,
        lng: 74.3587,
    };
}

/// Lifecycle state of a booked load.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStatus {
    Pending,
    InTransit,
    Delivered,
    Cancelled,
}

impl fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LoadStatus::Pending => "pending",
            LoadStatus::InTransit => "in_transit",
            LoadStatus::Delivered => "delivered",
            LoadStatus::Cancelled => "cancelled",
        })
    }
}

const DEFAULT_PICKUP: &str = "Saddar, Karachi";
const DEFAULT_DROP: &str = "Gulberg, Lahore";

/// Partially filled load as edited by the shipper.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadDraft {
    pub pickup_addr: Option<String>,
    pub drop_addr: Option<String>,
    pub pickup_latlng: Option<LatLng>,
    pub drop_latlng: Option<LatLng>,
    pub goods_type: Option<String>,
    pub weight_tons: Option<f64>,
    pub category_required: Option<TruckCategory>,
}

impl LoadDraft {
    /// Initial wizard contents: Karachi to Lahore with a sample cargo.
    pub fn default_route() -> Self {
        Self {
            pickup_addr: Some(DEFAULT_PICKUP.into()),
            drop_addr: Some(DEFAULT_DROP.into()),
            pickup_latlng: Some(LatLng::KARACHI),
            drop_latlng: Some(LatLng::LAHORE),
            goods_type: Some("200 boxes of consumer electronics".into()),
            weight_tons: Some(5.0),
            category_required: Some(TruckCategory::GeneralCargo),
        }
    }

    /// Draft used after "book another": route kept, cargo cleared.
    pub fn reset() -> Self {
        Self {
            goods_type: None,
            weight_tons: None,
            category_required: None,
            ..Self::default_route()
        }
    }

    /// Names of required fields that are absent or blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let blank = |s: &Option<String>| s.as_deref().is_none_or(|v| v.trim().is_empty());

        let mut missing = vec![];
        if blank(&self.pickup_addr) {
            missing.push("pickup address");
        }
        if blank(&self.drop_addr) {
            missing.push("drop address");
        }
        if blank(&self.goods_type) {
            missing.push("goods type");
        }
        if !self.weight_tons.is_some_and(|w| w.is_finite() && w > 0.0) {
            missing.push("weight");
        }
        if self.category_required.is_none() {
            missing.push("truck category");
        }
        missing
    }

    /// Validate and freeze the draft.
    pub fn complete(&self) -> Result<LoadSpec> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(BookingError::IncompleteLoadDetails(missing));
        }
        // missing_fields() guarantees every Option below is Some.
        let text = |s: &Option<String>| s.as_deref().unwrap_or_default().trim().to_string();
        Ok(LoadSpec {
            pickup_addr: text(&self.pickup_addr),
            drop_addr: text(&self.drop_addr),
            pickup_latlng: self.pickup_latlng.unwrap_or(LatLng::KARACHI),
            drop_latlng: self.drop_latlng.unwrap_or(LatLng::LAHORE),
            goods_type: text(&self.goods_type),
            weight_tons: self.weight_tons.unwrap_or_default(),
            category_required: self.category_required.unwrap_or_default(),
        })
    }
}

/// Complete shipment description, as snapshotted into a quote.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoadSpec {
    pub pickup_addr: String,
    pub drop_addr: String,
    pub pickup_latlng: LatLng,
    pub drop_latlng: LatLng,
    pub goods_type: String,
    pub weight_tons: f64,
    pub category_required: TruckCategory,
}

/// A booked shipment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Load {
    pub id: String,
    pub shipper_id: String,
    pub spec: LoadSpec,
    pub status: LoadStatus,
    /// Driver-facing amount in PKR.
    pub payout: i64,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Load {
    /// New pending load with a fresh `LD…` id.
    pub fn pending(shipper_id: impl Into<String>, spec: LoadSpec, payout: i64) -> Self {
        let short = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
        Self {
            id: format!("LD{short}"),
            shipper_id: shipper_id.into(),
            spec,
            status: LoadStatus::Pending,
            payout,
            completed_at: None,
        }
    }

    /// Move the load to `next`, rejecting moves the lifecycle does not allow.
    pub fn transition(&mut self, next: LoadStatus, now: DateTime<Utc>) -> Result<()> {
        use LoadStatus::*;
        let allowed = matches!(
            (self.status, next),
            (Pending, InTransit)
                | (InTransit, Delivered)
                | (Pending, Cancelled)
                | (InTransit, Cancelled)
        );
        if !allowed {
            return Err(BookingError::InvalidTransition {
                state: self.status.to_string(),
                action: match next {
                    Pending => "reopen load",
                    InTransit => "start transit",
                    Delivered => "deliver",
                    Cancelled => "cancel",
                },
            });
        }
        self.status = next;
        if next == Delivered {
            self.completed_at = Some(now);
        }
        Ok(())
    }
}
