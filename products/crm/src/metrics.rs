//! Derived pipeline figures. Everything here is a pure function of one
//! snapshot and is recomputed per call.

use std::collections::BTreeMap;

use entity::{Dataset, Opportunity, Stage};
use serde::Serialize;

/// Sum of `amount` over opportunities whose status is `Open`.
pub fn pipeline_value(data: &Dataset) -> i64 {
    data.opportunities
        .iter()
        .filter(|opp| opp.is_open())
        .map(|opp| opp.amount)
        .fold(0, i64::saturating_add)
}

pub fn closed_won_value(data: &Dataset) -> i64 {
    stage_value(data, Stage::ClosedWon)
}

pub fn stage_value(data: &Dataset, stage: Stage) -> i64 {
    data.opportunities
        .iter()
        .filter(|opp| opp.stage == stage)
        .map(|opp| opp.amount)
        .fold(0, i64::saturating_add)
}

/// Every stage is present, including those with no opportunities.
pub fn stage_counts(data: &Dataset) -> BTreeMap<Stage, usize> {
    let mut counts: BTreeMap<Stage, usize> = Stage::ALL.into_iter().map(|s| (s, 0)).collect();
    for opp in &data.opportunities {
        *counts.entry(opp.stage).or_default() += 1;
    }
    counts
}

/// Probability-weighted value of open opportunities.
pub fn expected_value(data: &Dataset) -> i64 {
    data.opportunities
        .iter()
        .filter(|opp| opp.is_open())
        .map(weighted_amount)
        .fold(0, i64::saturating_add)
}

/// Totals saturate instead of overflowing on extreme amounts.
fn weighted_amount(opp: &Opportunity) -> i64 {
    let weighted = i128::from(opp.amount) * i128::from(opp.stage.probability()) / 100;
    i64::try_from(weighted).unwrap_or(i64::MAX)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTotals {
    pub stage: Stage,
    pub count: usize,
    pub amount: i64,
    pub expected_amount: i64,
}

pub fn stage_totals(data: &Dataset) -> Vec<StageTotals> {
    Stage::ALL
        .into_iter()
        .map(|stage| {
            let at_stage = data.opportunities.iter().filter(|opp| opp.stage == stage);
            let (count, amount, expected_amount) =
                at_stage.fold((0, 0, 0), |(count, amount, expected), opp| {
                    (
                        count + 1,
                        i64::saturating_add(amount, opp.amount),
                        i64::saturating_add(expected, weighted_amount(opp)),
                    )
                });
            StageTotals {
                stage,
                count,
                amount,
                expected_amount,
            }
        })
        .collect()
}

/// One kanban column.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineColumn {
    pub stage: Stage,
    pub total_amount: i64,
    pub opportunities: Vec<Opportunity>,
}

/// Columns in stage order; cards within a column sorted by name.
pub fn pipeline_board(data: &Dataset) -> Vec<PipelineColumn> {
    let sorted = data.opportunities_sorted();
    Stage::ALL
        .into_iter()
        .map(|stage| {
            let opportunities: Vec<Opportunity> = sorted
                .iter()
                .filter(|opp| opp.stage == stage)
                .map(|opp| (*opp).clone())
                .collect();
            PipelineColumn {
                stage,
                total_amount: opportunities
                    .iter()
                    .map(|opp| opp.amount)
                    .fold(0, i64::saturating_add),
                opportunities,
            }
        })
        .collect()
}

/// Dashboard summary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub total_accounts: usize,
    pub total_contacts: usize,
    pub total_opportunities: usize,
    pub open_opportunities: usize,
    pub pipeline_value: i64,
    pub closed_won_value: i64,
    pub expected_value: i64,
}

impl Metrics {
    pub fn compute(data: &Dataset) -> Self {
        Self {
            total_accounts: data.accounts.len(),
            total_contacts: data.contacts.len(),
            total_opportunities: data.opportunities.len(),
            open_opportunities: data.opportunities.iter().filter(|o| o.is_open()).count(),
            pipeline_value: pipeline_value(data),
            closed_won_value: closed_won_value(data),
            expected_value: expected_value(data),
        }
    }
}
