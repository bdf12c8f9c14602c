use serde::Serialize;

use super::error::ModelError;
use super::types::Bracket;

/// Total tax on `income` under ascending marginal `brackets`.
///
/// Each bracket taxes only the slice of income between the previous bracket's
/// upper bound (0 for the first) and its own. Income above the last bound is
/// left untaxed, so callers that cannot guarantee an unbounded final bracket
/// should go through [`BracketTable`].
pub fn compute_tax(income: f64, brackets: &[Bracket]) -> f64 {
    let mut tax_due = 0.0;
    let mut lower = 0.0;

    for bracket in brackets {
        if income <= lower {
            break;
        }
        let taxable_in_bracket = income.min(bracket.upper) - lower;
        tax_due += taxable_in_bracket * bracket.rate;
        lower = bracket.upper;
    }

    tax_due
}

/// Ascending, gap-free bracket schedule ending in an unbounded bracket.
///
/// Only constructible through [`BracketTable::new`], so every table in the
/// model taxes all reachable income.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct BracketTable {
    brackets: Vec<Bracket>,
}

impl BracketTable {
    pub fn new(brackets: Vec<Bracket>) -> Result<Self, ModelError> {
        if brackets.is_empty() {
            return Err(ModelError::malformed("at least one bracket is required"));
        }

        let mut previous_upper = 0.0;
        for (idx, bracket) in brackets.iter().enumerate() {
            if !bracket.rate.is_finite() || !(0.0..1.0).contains(&bracket.rate) {
                return Err(ModelError::malformed(format!(
                    "bracket {idx} rate {} must be in [0, 1)",
                    bracket.rate
                )));
            }
            if bracket.upper.is_nan() || bracket.upper <= previous_upper {
                return Err(ModelError::malformed(format!(
                    "bracket {idx} upper bound {} must be greater than {previous_upper}",
                    bracket.upper
                )));
            }
            if bracket.is_unbounded() && idx + 1 != brackets.len() {
                return Err(ModelError::malformed(format!(
                    "bracket {idx} is unbounded but is not the last bracket"
                )));
            }
            previous_upper = bracket.upper;
        }

        if !brackets[brackets.len() - 1].is_unbounded() {
            return Err(ModelError::malformed(format!(
                "last bracket must be unbounded; income above {previous_upper} would go untaxed"
            )));
        }

        Ok(Self { brackets })
    }

    /// 2024-style single-filer schedule used as the default example table.
    pub fn us_2024_single() -> Self {
        Self {
            brackets: vec![
                Bracket::new(11_600.0, 0.10),
                Bracket::new(47_150.0, 0.12),
                Bracket::new(100_525.0, 0.22),
                Bracket::new(191_950.0, 0.24),
                Bracket::new(243_725.0, 0.32),
                Bracket::new(609_350.0, 0.35),
                Bracket::unbounded(0.37),
            ],
        }
    }

    pub fn brackets(&self) -> &[Bracket] {
        &self.brackets
    }

    pub fn tax_for(&self, income: f64) -> f64 {
        compute_tax(income, &self.brackets)
    }

    /// Rate applied to the last dollar of `income`. Zero income reports the
    /// first bracket's rate.
    pub fn marginal_rate(&self, income: f64) -> f64 {
        self.brackets
            .iter()
            .find(|bracket| income <= bracket.upper)
            .or(self.brackets.last())
            .map_or(0.0, |bracket| bracket.rate)
    }

    pub fn effective_rate(&self, income: f64) -> f64 {
        if income <= 0.0 {
            return 0.0;
        }
        self.tax_for(income) / income
    }
}
