//! Payment aggregation: status/method totals, coupon redemptions, the
//! fraud indicator, and the settled-amount bucket series.

use super::Aggregator;
use crate::store::{Filter, GroupBy, GroupRow, PaymentStatus, RecordKind, SumField};
use tally_common::{DateRange, GroupTotals, PaymentStats, Result, Scope, TimeSeries};

/// Failure rate above which the fraud indicator saturates at its cap.
const FRAUD_RATE_CAP_THRESHOLD: f64 = 0.1;

/// Saturated fraud-indicator value.
const FRAUD_INDICATOR_CAP: f64 = 0.9;

/// Fraud indicator from the payment failure rate.
///
/// Linear `min(1, 10·rate)` up to a rate of 0.1; anything above that is
/// capped at 0.9. The indicator is a review hint for the payments team,
/// not a fraud probability.
pub(crate) fn fraud_indicator(failure_rate: f64) -> f64 {
    if failure_rate > FRAUD_RATE_CAP_THRESHOLD {
        FRAUD_INDICATOR_CAP
    } else {
        (10.0 * failure_rate).min(1.0)
    }
}

/// Payment totals and breakdowns, without the bucket series.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaymentTotals {
    pub total_payments: u64,
    pub by_status: Vec<GroupTotals>,
    pub by_method: Vec<GroupTotals>,
    pub average_value: f64,
    pub coupon_redemptions: u64,
    pub coupon_discount: f64,
    pub failure_rate: f64,
    pub fraud_indicator: f64,
}

impl PaymentTotals {
    /// Attach a bucket series to form the full payload stats.
    pub fn into_stats(self, series: TimeSeries) -> PaymentStats {
        PaymentStats {
            total_payments: self.total_payments,
            by_status: self.by_status,
            by_method: self.by_method,
            average_value: self.average_value,
            coupon_redemptions: self.coupon_redemptions,
            coupon_discount: self.coupon_discount,
            failure_rate: self.failure_rate,
            fraud_indicator: self.fraud_indicator,
            series,
        }
    }
}

fn to_totals(rows: Vec<GroupRow>) -> Vec<GroupTotals> {
    rows.into_iter()
        .map(|row| GroupTotals {
            key: row.key,
            count: row.count,
            sum: row.sum,
        })
        .collect()
}

impl<'a> Aggregator<'a> {
    /// Status/method totals, the mean settled value, coupon redemptions,
    /// and the failure-rate-derived fraud indicator.
    pub fn payment_totals(&self, range: &DateRange, scope: &Scope) -> Result<PaymentTotals> {
        let by_status_rows = self.store().grouped(
            RecordKind::Payment,
            range,
            scope,
            &Filter::none(),
            GroupBy::Status,
            Some(SumField::Amount),
        )?;
        let by_method_rows = self.store().grouped(
            RecordKind::Payment,
            range,
            scope,
            &Filter::none(),
            GroupBy::Method,
            Some(SumField::Amount),
        )?;
        let coupon_rows = self.store().grouped(
            RecordKind::Payment,
            range,
            scope,
            &Filter::none(),
            GroupBy::Coupon,
            Some(SumField::Discount),
        )?;

        let total_payments: u64 = by_status_rows.iter().map(|r| r.count).sum();

        let settled = by_status_rows
            .iter()
            .find(|r| r.key == PaymentStatus::Settled.as_str());
        let average_value = match settled {
            Some(row) if row.count > 0 => row.sum / row.count as f64,
            _ => 0.0,
        };

        let failed_count = by_status_rows
            .iter()
            .find(|r| r.key == PaymentStatus::Failed.as_str())
            .map_or(0, |r| r.count);
        let failure_rate = if total_payments == 0 {
            0.0
        } else {
            failed_count as f64 / total_payments as f64
        };

        let redeemed = coupon_rows.iter().find(|r| r.key == "redeemed");

        Ok(PaymentTotals {
            total_payments,
            by_status: to_totals(by_status_rows),
            by_method: to_totals(by_method_rows),
            average_value,
            coupon_redemptions: redeemed.map_or(0, |r| r.count),
            coupon_discount: redeemed.map_or(0.0, |r| r.sum),
            failure_rate,
            fraud_indicator: fraud_indicator(failure_rate),
        })
    }

    /// Zero-filled settled amounts per bucket.
    pub fn payment_series(&self, range: &DateRange, scope: &Scope) -> Result<TimeSeries> {
        self.bucket_series(
            RecordKind::Payment,
            range,
            scope,
            &Filter::with_status(PaymentStatus::Settled),
            Some(SumField::Amount),
        )
    }

    /// Full payment stats in one call, for direct library use.
    pub fn payments(&self, range: &DateRange, scope: &Scope) -> Result<PaymentStats> {
        let totals = self.payment_totals(range, scope)?;
        let series = self.payment_series(range, scope)?;
        Ok(totals.into_stats(series))
    }
}
