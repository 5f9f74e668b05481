// Builds alert envelopes from confirmed conditions.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use super::model::{default_message, AlertEnvelope, Condition};
use crate::core::location::{Location, LocationLookup, NoLocation};
use crate::core::model::ConditionId;

pub struct EnvelopeBuilder {
    messages: HashMap<ConditionId, String>,
    locator: Arc<dyn LocationLookup>,
    lookup_timeout: Duration,
}

impl EnvelopeBuilder {
    pub fn new(conditions: &[Condition], locator: Arc<dyn LocationLookup>, lookup_timeout: Duration) -> Self {
        Self {
            messages: conditions.iter().map(|c| (c.id, c.message.clone())).collect(),
            locator,
            lookup_timeout,
        }
    }

    /// Builder with no location enrichment.
    pub fn without_location(conditions: &[Condition]) -> Self {
        Self::new(conditions, Arc::new(NoLocation), Duration::ZERO)
    }

    pub fn message(&self, condition: ConditionId) -> &str {
        self.messages
            .get(&condition)
            .map(String::as_str)
            .unwrap_or_else(|| default_message(condition))
    }

    pub fn build(
        &self,
        condition: ConditionId,
        timestamp: Duration,
        detail: Option<String>,
        location: Option<Location>,
    ) -> AlertEnvelope {
        AlertEnvelope {
            condition,
            message: self.message(condition).to_string(),
            timestamp,
            raised_at: Utc::now(),
            detail,
            location,
        }
    }

    /// Look up the location (bounded by the lookup timeout) and build.
    /// A failed or slow lookup yields an envelope without location.
    pub async fn assemble(&self, condition: ConditionId, timestamp: Duration, detail: Option<String>) -> AlertEnvelope {
        let location = match tokio::time::timeout(self.lookup_timeout, self.locator.lookup()).await {
            Ok(location) => location,
            Err(_) => {
                log::warn!(
                    "Location lookup timed out after {}ms, alerting without it",
                    self.lookup_timeout.as_millis()
                );
                None
            }
        };
        self.build(condition, timestamp, detail, location)
    }
}
