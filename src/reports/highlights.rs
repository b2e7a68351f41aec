use crate::models::{MonthHighlights, MonthlyAggregate};

/// Pick the standout months of a series. Ties go to the earliest month.
pub fn month_highlights(rows: &[MonthlyAggregate]) -> MonthHighlights {
    let mut ordered: Vec<&MonthlyAggregate> = rows.iter().collect();
    ordered.sort_by(|a, b| a.month.cmp(&b.month));

    let mut highest_spend: Option<&MonthlyAggregate> = None;
    let mut best: Option<&MonthlyAggregate> = None;
    let mut worst: Option<&MonthlyAggregate> = None;

    for row in ordered {
        if highest_spend.is_none_or(|m| row.total_spend > m.total_spend) {
            highest_spend = Some(row);
        }
        if best.is_none_or(|m| row.roas > m.roas) {
            best = Some(row);
        }
        if worst.is_none_or(|m| row.roas < m.roas) {
            worst = Some(row);
        }
    }

    MonthHighlights {
        highest_spend_month: highest_spend.map(|m| m.month.clone()),
        best_roas_month: best.map(|m| m.month.clone()),
        best_roas_value: best.map(|m| m.roas),
        worst_roas_month: worst.map(|m| m.month.clone()),
        worst_roas_value: worst.map(|m| m.roas),
    }
}
