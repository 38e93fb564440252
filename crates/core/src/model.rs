//! Domain types for experiments, variants, assignments, and tracking events.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Lifecycle status of an experiment.
///
/// Only `Active` experiments accept first-time assignments. Existing
/// assignments survive any later status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperimentStatus {
    Active,
    Paused,
    Completed,
}

impl ExperimentStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Completed => "completed",
        }
    }

    /// Parses the lowercase database representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "paused" => Some(Self::Paused),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for ExperimentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of a tracking event emitted by the landing flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    PageView,
    Click,
    FormSubmit,
    CtaClick,
    ScrollDepth,
}

impl EventType {
    /// All event types, in breakdown order.
    pub const ALL: [Self; 5] = [
        Self::PageView,
        Self::Click,
        Self::FormSubmit,
        Self::CtaClick,
        Self::ScrollDepth,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PageView => "page_view",
            Self::Click => "click",
            Self::FormSubmit => "form_submit",
            Self::CtaClick => "cta_click",
            Self::ScrollDepth => "scroll_depth",
        }
    }

    /// Parses the snake_case database representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "page_view" => Some(Self::PageView),
            "click" => Some(Self::Click),
            "form_submit" => Some(Self::FormSubmit),
            "cta_click" => Some(Self::CtaClick),
            "scroll_depth" => Some(Self::ScrollDepth),
            _ => None,
        }
    }

    /// Whether this event type counts toward conversions.
    #[must_use]
    pub fn is_conversion(self) -> bool {
        CONVERSION_EVENTS.contains(&self)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event types that count a distinct visitor as converted.
///
/// Fixed business rule: a visitor converts by clicking a CTA or submitting
/// a form at least once.
pub const CONVERSION_EVENTS: [EventType; 2] = [EventType::CtaClick, EventType::FormSubmit];

/// A variant of an experiment with its traffic allocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variant {
    pub id: Uuid,
    pub name: String,
    /// Share of traffic in percent, 0..=100.
    pub traffic_pct: u8,
}

/// An experiment with its ordered variants.
///
/// Variant order is creation order and is fixed for the experiment's
/// lifetime; cumulative traffic boundaries are defined by that order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Experiment {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub status: ExperimentStatus,
    /// Ordered by creation time.
    pub variants: Vec<Variant>,
    /// Parallel to `variants`; sums to 100.
    pub traffic_split: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A persisted visitor-to-variant assignment.
///
/// Unique per (visitor, experiment). Write-once: never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub visitor_id: Uuid,
    pub experiment_id: Uuid,
    pub variant_id: Uuid,
    pub assigned_at: DateTime<Utc>,
}

/// The variant a visitor was assigned, as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignedVariant {
    pub variant_id: Uuid,
    pub variant_name: String,
}

/// A raw tracking event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingEvent {
    pub id: Uuid,
    pub visitor_id: Uuid,
    pub experiment_id: Uuid,
    pub variant_id: Uuid,
    pub event_type: EventType,
    pub metadata: JsonValue,
    pub timestamp: DateTime<Utc>,
}

/// Input for creating an experiment together with its variants.
#[derive(Debug, Clone, Deserialize)]
pub struct NewExperiment {
    pub name: String,
    pub description: String,
    pub variants: Vec<NewVariant>,
    pub traffic_split: Vec<u8>,
}

/// Input for one variant of a new experiment.
#[derive(Debug, Clone, Deserialize)]
pub struct NewVariant {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Partial update for an experiment. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateExperiment {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<ExperimentStatus>,
}

/// Input for ingesting one tracking event.
#[derive(Debug, Clone, Deserialize)]
pub struct NewEvent {
    pub visitor_id: Uuid,
    pub experiment_id: Uuid,
    pub variant_id: Uuid,
    pub event_type: EventType,
    #[serde(default = "empty_metadata")]
    pub metadata: JsonValue,
}

fn empty_metadata() -> JsonValue {
    JsonValue::Object(serde_json::Map::new())
}

/// Raw per-variant counters from the event store, grouped by variant id.
///
/// One row per variant referenced by at least one matching event. A variant
/// id no longer known to the system surfaces with name `"unknown"` so raw
/// counts never silently disappear.
#[derive(Debug, Clone)]
pub struct VariantAggregate {
    pub variant_id: Uuid,
    pub variant_name: String,
    pub total_events: u64,
    pub unique_visitors: u64,
    pub page_views: u64,
    pub clicks: u64,
    pub form_submits: u64,
    pub cta_clicks: u64,
    pub scroll_depths: u64,
    /// Distinct visitors with at least one conversion event.
    pub conversions: u64,
}

/// Derived per-variant statistics, recomputed per query, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct VariantStats {
    pub variant_id: Uuid,
    pub variant_name: String,
    pub total_events: u64,
    pub unique_visitors: u64,
    pub event_breakdown: BTreeMap<EventType, u64>,
    pub conversion_rate: f64,
}

impl VariantStats {
    /// Builds per-variant stats from raw counters, zero-filling absent
    /// event types in the breakdown.
    #[must_use]
    pub fn from_aggregate(agg: &VariantAggregate) -> Self {
        let mut breakdown = BTreeMap::new();
        breakdown.insert(EventType::PageView, agg.page_views);
        breakdown.insert(EventType::Click, agg.clicks);
        breakdown.insert(EventType::FormSubmit, agg.form_submits);
        breakdown.insert(EventType::CtaClick, agg.cta_clicks);
        breakdown.insert(EventType::ScrollDepth, agg.scroll_depths);

        let conversion_rate = if agg.unique_visitors > 0 {
            agg.conversions as f64 / agg.unique_visitors as f64
        } else {
            0.0
        };

        Self {
            variant_id: agg.variant_id,
            variant_name: agg.variant_name.clone(),
            total_events: agg.total_events,
            unique_visitors: agg.unique_visitors,
            event_breakdown: breakdown,
            conversion_rate,
        }
    }
}

/// Derived experiment-level statistics.
#[derive(Debug, Clone, Serialize)]
pub struct ExperimentStats {
    pub experiment_id: Uuid,
    pub experiment_name: String,
    pub total_visitors: u64,
    pub variants: Vec<VariantStats>,
    /// p-value from the chi-squared test; `None` when fewer than two
    /// variants have data.
    pub confidence: Option<f64>,
    pub significance_reached: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            ExperimentStatus::Active,
            ExperimentStatus::Paused,
            ExperimentStatus::Completed,
        ] {
            assert_eq!(ExperimentStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ExperimentStatus::parse("archived"), None);
    }

    #[test]
    fn test_event_type_round_trip() {
        for ty in EventType::ALL {
            assert_eq!(EventType::parse(ty.as_str()), Some(ty));
        }
        assert_eq!(EventType::parse("purchase"), None);
    }

    #[test]
    fn test_event_type_serde_uses_snake_case() {
        let json = serde_json::to_string(&EventType::CtaClick).unwrap();
        assert_eq!(json, "\"cta_click\"");
        let back: EventType = serde_json::from_str("\"scroll_depth\"").unwrap();
        assert_eq!(back, EventType::ScrollDepth);
    }

    #[test]
    fn test_conversion_set() {
        assert!(EventType::CtaClick.is_conversion());
        assert!(EventType::FormSubmit.is_conversion());
        assert!(!EventType::PageView.is_conversion());
        assert!(!EventType::Click.is_conversion());
        assert!(!EventType::ScrollDepth.is_conversion());
    }

    #[test]
    fn test_variant_stats_zero_fills_breakdown() {
        let agg = VariantAggregate {
            variant_id: Uuid::nil(),
            variant_name: "control".to_string(),
            total_events: 3,
            unique_visitors: 2,
            page_views: 3,
            clicks: 0,
            form_submits: 0,
            cta_clicks: 0,
            scroll_depths: 0,
            conversions: 0,
        };

        let stats = VariantStats::from_aggregate(&agg);
        assert_eq!(stats.event_breakdown.len(), 5);
        assert_eq!(stats.event_breakdown[&EventType::PageView], 3);
        assert_eq!(stats.event_breakdown[&EventType::CtaClick], 0);
        assert_eq!(stats.conversion_rate, 0.0);
    }

    #[test]
    fn test_variant_stats_conversion_rate() {
        let agg = VariantAggregate {
            variant_id: Uuid::nil(),
            variant_name: "variant_a".to_string(),
            total_events: 10,
            unique_visitors: 4,
            page_views: 6,
            clicks: 1,
            form_submits: 1,
            cta_clicks: 2,
            scroll_depths: 0,
            conversions: 3,
        };

        let stats = VariantStats::from_aggregate(&agg);
        assert!((stats.conversion_rate - 0.75).abs() < f64::EPSILON);
    }
}
