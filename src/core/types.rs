use serde::Serialize;

use super::error::ModelError;
use super::tax::BracketTable;

/// One marginal tier: income in `(previous upper, upper]` is taxed at `rate`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct Bracket {
    pub upper: f64,
    pub rate: f64,
}

impl Bracket {
    pub const fn new(upper: f64, rate: f64) -> Self {
        Self { upper, rate }
    }

    pub const fn unbounded(rate: f64) -> Self {
        Self {
            upper: f64::INFINITY,
            rate,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.upper == f64::INFINITY
    }
}

/// Longest horizon a single projection may simulate.
pub const MAX_YEARS: u32 = 1_000;

#[derive(Debug, Clone)]
pub struct ProjectionInputs {
    pub initial_income: f64,
    pub years: u32,
    pub nominal_return: f64,
    pub inflation: f64,
    pub income_growth: f64,
    pub contribution_cap: f64,
    pub brackets: BracketTable,
}

impl ProjectionInputs {
    pub fn real_return(&self) -> f64 {
        self.nominal_return - self.inflation
    }

    /// Rejects parameters the year loop cannot give a meaningful answer for.
    /// Runs before any year is simulated.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.years > MAX_YEARS {
            return Err(ModelError::invalid("years", format!("must be <= {MAX_YEARS}")));
        }

        if !self.initial_income.is_finite() || self.initial_income < 0.0 {
            return Err(ModelError::invalid("initial_income", "must be finite and >= 0"));
        }

        if !self.contribution_cap.is_finite() || self.contribution_cap < 0.0 {
            return Err(ModelError::invalid("contribution_cap", "must be finite and >= 0"));
        }

        for (name, rate) in [
            ("nominal_return", self.nominal_return),
            ("inflation", self.inflation),
            ("income_growth", self.income_growth),
        ] {
            if !rate.is_finite() {
                return Err(ModelError::invalid(name, "must be finite"));
            }
        }

        if self.income_growth < -1.0 {
            return Err(ModelError::invalid(
                "income_growth",
                "must be >= -1 (income cannot fall below zero)",
            ));
        }

        Ok(())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionResult {
    pub taxadvantaged_balance: f64,
    pub taxable_balance: f64,
}

impl ProjectionResult {
    pub fn total_balance(&self) -> f64 {
        self.taxadvantaged_balance + self.taxable_balance
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearResult {
    pub year: u32,
    pub gross_income: f64,
    pub tax: f64,
    pub net_income: f64,
    pub effective_tax_rate: f64,
    pub marginal_rate: f64,
    pub contribution_taxadvantaged: f64,
    pub contribution_taxable: f64,
    pub end_balance_taxadvantaged: f64,
    pub end_balance_taxable: f64,
    pub end_balance_total: f64,
}
