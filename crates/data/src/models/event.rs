//! Aggregate row model for the events table.

use serde::{Deserialize, Serialize};
use splitflow_core::VariantAggregate;
use uuid::Uuid;

/// One row of the per-variant aggregate query.
///
/// Counts come back from `PostgreSQL` as `bigint`; conversion to the
/// unsigned domain type happens in [`VariantAggregateRow::into_aggregate`].
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct VariantAggregateRow {
    pub variant_id: Uuid,
    pub variant_name: String,
    pub total_events: i64,
    pub unique_visitors: i64,
    pub page_views: i64,
    pub clicks: i64,
    pub form_submits: i64,
    pub cta_clicks: i64,
    pub scroll_depths: i64,
    pub conversions: i64,
}

impl VariantAggregateRow {
    /// Converts the row into the core aggregate type. Counts are
    /// non-negative by construction, so the casts cannot truncate.
    #[must_use]
    pub fn into_aggregate(self) -> VariantAggregate {
        VariantAggregate {
            variant_id: self.variant_id,
            variant_name: self.variant_name,
            total_events: self.total_events as u64,
            unique_visitors: self.unique_visitors as u64,
            page_views: self.page_views as u64,
            clicks: self.clicks as u64,
            form_submits: self.form_submits as u64,
            cta_clicks: self.cta_clicks as u64,
            scroll_depths: self.scroll_depths as u64,
            conversions: self.conversions as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_aggregate_maps_all_counters() {
        let row = VariantAggregateRow {
            variant_id: Uuid::new_v4(),
            variant_name: "control".to_string(),
            total_events: 12,
            unique_visitors: 5,
            page_views: 6,
            clicks: 2,
            form_submits: 1,
            cta_clicks: 2,
            scroll_depths: 1,
            conversions: 3,
        };

        let agg = row.clone().into_aggregate();
        assert_eq!(agg.variant_id, row.variant_id);
        assert_eq!(agg.total_events, 12);
        assert_eq!(agg.unique_visitors, 5);
        assert_eq!(agg.conversions, 3);
        assert_eq!(
            agg.page_views + agg.clicks + agg.form_submits + agg.cta_clicks + agg.scroll_depths,
            agg.total_events
        );
    }
}
