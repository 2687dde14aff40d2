//! Per-period result records and the concatenated submission.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::{info, warn};

use super::{truncate, NumericAnomaly, PlanReport, NEGATIVE_TOLERANCE, TRUNCATION_DIGITS};
use crate::optimizer::VariantKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum RecordKind {
    /// Slow charger count of a facility
    #[serde(rename = "SCS")]
    #[strum(serialize = "SCS")]
    SlowCount,
    /// Fast charger count of a facility
    #[serde(rename = "FCS")]
    #[strum(serialize = "FCS")]
    FastCount,
    /// Flow from a facility to a demand point
    #[serde(rename = "DS")]
    #[strum(serialize = "DS")]
    Assignment,
    /// Open indicator of a facility
    #[serde(rename = "OPEN")]
    #[strum(serialize = "OPEN")]
    Open,
}

/// One row of a result artifact. Indices are zero-based.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    #[serde(rename = "year")]
    pub period: String,
    #[serde(rename = "data_type")]
    pub kind: RecordKind,
    #[serde(rename = "demand_point_index")]
    pub customer: Option<usize>,
    #[serde(rename = "supply_point_index")]
    pub facility: usize,
    pub value: f64,
}

impl ResultRecord {
    pub fn facility_level(period: &str, kind: RecordKind, facility: usize, value: f64) -> Self {
        Self {
            period: period.to_string(),
            kind,
            customer: None,
            facility,
            value,
        }
    }

    pub fn assignment(period: &str, customer: usize, facility: usize, value: f64) -> Self {
        Self {
            period: period.to_string(),
            kind: RecordKind::Assignment,
            customer: Some(customer),
            facility,
            value,
        }
    }
}

impl PlanReport {
    /// Result artifact of `period`, values truncated to two decimals.
    ///
    /// Facility-level records come first (slow then fast counts, or open
    /// indicators), followed by every assignment in customer-major order.
    pub fn to_records(&self, period: &str) -> Vec<ResultRecord> {
        let mut records = Vec::with_capacity(
            self.num_facilities() * 2 + self.num_customers() * self.num_facilities(),
        );
        if self.variant == VariantKind::ChargerBuildOut {
            records.extend(self.facilities.iter().map(|f| {
                ResultRecord::facility_level(period, RecordKind::SlowCount, f.facility, f64::from(f.slow))
            }));
            records.extend(self.facilities.iter().map(|f| {
                ResultRecord::facility_level(period, RecordKind::FastCount, f.facility, f64::from(f.fast))
            }));
        } else {
            records.extend(self.facilities.iter().map(|f| {
                let open = if f.open { 1.0 } else { 0.0 };
                ResultRecord::facility_level(period, RecordKind::Open, f.facility, open)
            }));
        }
        for customer in 0..self.num_customers() {
            for facility in 0..self.num_facilities() {
                records.push(ResultRecord::assignment(
                    period,
                    customer,
                    facility,
                    truncate(self.assignment(customer, facility), TRUNCATION_DIGITS),
                ));
            }
        }
        records
    }
}

/// Artifacts of several periods concatenated into one table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Submission {
    pub records: Vec<ResultRecord>,
    /// Records that are still negative after truncation
    pub anomalies: Vec<NumericAnomaly>,
}

impl Submission {
    /// Concatenate `records` in order and truncate every value.
    ///
    /// Negative values are reported, never dropped or clamped.
    pub fn assemble<I>(records: I) -> Self
    where
        I: IntoIterator<Item = ResultRecord>,
    {
        let mut submission = Self::default();
        for (row, mut record) in records.into_iter().enumerate() {
            record.value = truncate(record.value, TRUNCATION_DIGITS);
            if record.value < -NEGATIVE_TOLERANCE {
                warn!(row, value = record.value, "negative value in submission");
                submission.anomalies.push(NumericAnomaly::NegativeRecord {
                    row,
                    value: record.value,
                });
            }
            submission.records.push(record);
        }
        info!(
            records = submission.records.len(),
            anomalies = submission.anomalies.len(),
            "submission assembled"
        );
        submission
    }

    pub fn is_clean(&self) -> bool {
        self.anomalies.is_empty()
    }
}
