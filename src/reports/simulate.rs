use std::collections::{HashMap, HashSet};

use super::{derive, error::ReportError};
use crate::models::{
    BudgetAllocation, BudgetSimulation, ChannelAggregate, ChannelProjection, SimulationTotals,
};

/// Project revenue for proposed per-channel spend using each channel's
/// current ROAS.
///
/// Each channel may appear once. Spend must be finite, non-negative and small
/// enough that the projection stays finite.
pub fn simulate(
    channels: &[ChannelAggregate],
    allocations: &[BudgetAllocation],
) -> Result<BudgetSimulation, ReportError> {
    let current: HashMap<&str, &ChannelAggregate> =
        channels.iter().map(|c| (c.name.as_str(), c)).collect();

    let mut projections = Vec::with_capacity(allocations.len());
    let mut totals = SimulationTotals::default();
    let mut seen = HashSet::with_capacity(allocations.len());

    for allocation in allocations {
        if !allocation.spend.is_finite() || allocation.spend < 0.0 {
            return Err(ReportError::InvalidAllocation {
                channel: allocation.channel.clone(),
                reason: "spend must be a non-negative number".into(),
            });
        }

        if !seen.insert(allocation.channel.as_str()) {
            return Err(ReportError::InvalidAllocation {
                channel: allocation.channel.clone(),
                reason: "channel is allocated more than once".into(),
            });
        }

        let existing = current.get(allocation.channel.as_str()).copied();
        let (current_spend, current_revenue, roas) = existing
            .map(|c| (c.total_spend, c.total_revenue, c.roas))
            .unwrap_or((0.0, 0.0, 0.0));
        let projected = allocation.spend * roas;
        if !projected.is_finite() {
            return Err(ReportError::InvalidAllocation {
                channel: allocation.channel.clone(),
                reason: "projected revenue is out of range".into(),
            });
        }
        let projected_revenue = derive::round2(projected);

        totals.current_spend += current_spend;
        totals.proposed_spend += allocation.spend;
        totals.projected_revenue += projected_revenue;
        if !totals.proposed_spend.is_finite() || !totals.projected_revenue.is_finite() {
            return Err(ReportError::InvalidAllocation {
                channel: allocation.channel.clone(),
                reason: "total proposed spend is out of range".into(),
            });
        }

        projections.push(ChannelProjection {
            channel: allocation.channel.clone(),
            known: existing.is_some(),
            current_spend,
            proposed_spend: derive::round2(allocation.spend),
            roas,
            current_revenue,
            projected_revenue,
            revenue_delta: derive::round2(projected_revenue - current_revenue),
        });
    }

    totals.current_spend = derive::round2(totals.current_spend);
    totals.proposed_spend = derive::round2(totals.proposed_spend);
    totals.projected_revenue = derive::round2(totals.projected_revenue);
    totals.projected_roas = derive::roas(totals.projected_revenue, totals.proposed_spend);

    Ok(BudgetSimulation {
        channels: projections,
        totals,
    })
}
