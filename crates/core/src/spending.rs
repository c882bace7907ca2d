use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::billing::BillingRecord;
use crate::errors::AggregationError;

/// Locally computed view of the ledger against the profile budget.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpendingSummary {
    pub total_cost: f64,
    pub budget: f64,
    pub budget_variance: f64,
    pub over_budget: bool,
    pub service_costs: BTreeMap<String, f64>,
}

impl SpendingSummary {
    pub fn compute(budget: f64, records: &[BillingRecord]) -> Result<Self, AggregationError> {
        let mut total_cost = 0.0;
        let mut service_costs = BTreeMap::new();

        for (index, record) in records.iter().enumerate() {
            if !record.cost.is_finite() {
                return Err(AggregationError::NonFiniteCost { index });
            }
            let service =
                record.service_key().ok_or(AggregationError::MissingService { index })?;

            total_cost += record.cost;
            *service_costs.entry(service).or_insert(0.0) += record.cost;
        }

        let budget_variance = total_cost - budget;
        Ok(Self {
            total_cost,
            budget,
            budget_variance,
            over_budget: total_cost > budget,
            service_costs,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use crate::domain::billing::BillingRecord;
    use crate::errors::AggregationError;

    use super::SpendingSummary;

    #[test]
    fn totals_subtotals_and_variance() {
        let records = vec![
            BillingRecord::new("compute", 100.0),
            BillingRecord::new("storage", 50.0),
            BillingRecord::new("compute", 250.0),
            BillingRecord::new("compute", 400.0),
            BillingRecord::new("storage", 75.0),
        ];

        let summary = SpendingSummary::compute(600.0, &records).expect("well-formed ledger");

        assert_eq!(summary.total_cost, 875.0);
        assert_eq!(summary.budget, 600.0);
        assert_eq!(summary.budget_variance, 275.0);
        assert!(summary.over_budget);
        assert_eq!(
            summary.service_costs,
            BTreeMap::from([("compute".to_string(), 750.0), ("storage".to_string(), 125.0)])
        );
    }

    #[test]
    fn spending_equal_to_budget_is_not_over() {
        let records = vec![BillingRecord::new("compute", 300.0), BillingRecord::new("db", 300.0)];
        let summary = SpendingSummary::compute(600.0, &records).expect("well-formed ledger");

        assert_eq!(summary.budget_variance, 0.0);
        assert!(!summary.over_budget);
    }

    #[test]
    fn empty_ledger_is_fully_under_budget() {
        let summary = SpendingSummary::compute(250.0, &[]).expect("empty ledger");
        assert_eq!(summary.total_cost, 0.0);
        assert_eq!(summary.budget_variance, -250.0);
        assert!(summary.service_costs.is_empty());
    }

    #[test]
    fn record_without_service_breaks_aggregation() {
        let mut orphan = BillingRecord::new("compute", 10.0);
        orphan.service = None;
        let records = vec![BillingRecord::new("compute", 5.0), orphan];

        assert_eq!(
            SpendingSummary::compute(100.0, &records),
            Err(AggregationError::MissingService { index: 1 })
        );
    }

    #[test]
    fn service_names_are_grouped_verbatim() {
        let records =
            vec![BillingRecord::new("compute", 5.0), BillingRecord::new(" compute ", 7.0)];

        let summary = SpendingSummary::compute(10.0, &records).expect("well-formed ledger");

        assert_eq!(
            summary.service_costs,
            BTreeMap::from([("compute".to_string(), 5.0), (" compute ".to_string(), 7.0)])
        );
    }

    #[test]
    fn empty_service_name_is_still_a_service() {
        let summary = SpendingSummary::compute(10.0, &[BillingRecord::new("", 5.0)])
            .expect("present service key");

        assert_eq!(summary.service_costs, BTreeMap::from([(String::new(), 5.0)]));
        assert_eq!(summary.total_cost, 5.0);
    }
}
