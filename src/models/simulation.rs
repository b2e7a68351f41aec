use serde::{Deserialize, Serialize};

/// Proposed spend for one channel.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BudgetAllocation {
    pub channel: String,
    pub spend: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SimulationRequest {
    #[serde(default)]
    pub allocations: Vec<BudgetAllocation>,
}

/// Projected outcome for one channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelProjection {
    pub channel: String,
    /// Whether the channel exists in the current channels report. Unknown
    /// channels project no revenue.
    pub known: bool,
    pub current_spend: f64,
    pub proposed_spend: f64,
    pub roas: f64,
    pub current_revenue: f64,
    pub projected_revenue: f64,
    pub revenue_delta: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SimulationTotals {
    pub current_spend: f64,
    pub proposed_spend: f64,
    pub projected_revenue: f64,
    pub projected_roas: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetSimulation {
    pub channels: Vec<ChannelProjection>,
    pub totals: SimulationTotals,
}
