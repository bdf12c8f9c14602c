use tracing::{debug, trace};

use super::error::ModelError;
use super::types::{ProjectionInputs, ProjectionResult, YearResult};

#[derive(Debug)]
struct ProjectionState {
    income: f64,
    balance_taxadvantaged: f64,
    balance_taxable: f64,
}

impl ProjectionState {
    fn new(initial_income: f64) -> Self {
        Self {
            income: initial_income,
            balance_taxadvantaged: 0.0,
            balance_taxable: 0.0,
        }
    }

    fn is_finite(&self) -> bool {
        self.income.is_finite()
            && self.balance_taxadvantaged.is_finite()
            && self.balance_taxable.is_finite()
    }
}

#[derive(Debug, Clone, Copy)]
struct YearFlow {
    gross_income: f64,
    tax: f64,
    net_income: f64,
    contribution_taxadvantaged: f64,
    contribution_taxable: f64,
}

/// Terminal balances after `inputs.years` years of taxed, capped saving.
pub fn project(inputs: &ProjectionInputs) -> Result<ProjectionResult, ModelError> {
    inputs.validate()?;
    let state = run_years(inputs, |_, _, _| {})?;
    let result = ProjectionResult {
        taxadvantaged_balance: state.balance_taxadvantaged,
        taxable_balance: state.balance_taxable,
    };
    debug!(
        years = inputs.years,
        taxadvantaged = result.taxadvantaged_balance,
        taxable = result.taxable_balance,
        "projection complete"
    );
    Ok(result)
}

/// Same simulation as [`project`], recording every year.
pub fn run_yearly_trace(inputs: &ProjectionInputs) -> Result<Vec<YearResult>, ModelError> {
    inputs.validate()?;
    let mut years = Vec::with_capacity(inputs.years as usize);
    run_years(inputs, |year, flow, state| {
        years.push(YearResult {
            year,
            gross_income: flow.gross_income,
            tax: flow.tax,
            net_income: flow.net_income,
            effective_tax_rate: inputs.brackets.effective_rate(flow.gross_income),
            marginal_rate: inputs.brackets.marginal_rate(flow.gross_income),
            contribution_taxadvantaged: flow.contribution_taxadvantaged,
            contribution_taxable: flow.contribution_taxable,
            end_balance_taxadvantaged: state.balance_taxadvantaged,
            end_balance_taxable: state.balance_taxable,
            end_balance_total: state.balance_taxadvantaged + state.balance_taxable,
        });
    })?;
    Ok(years)
}

fn run_years<F>(inputs: &ProjectionInputs, mut on_year: F) -> Result<ProjectionState, ModelError>
where
    F: FnMut(u32, &YearFlow, &ProjectionState),
{
    let real_return = inputs.real_return();
    let mut state = ProjectionState::new(inputs.initial_income);
    debug!(
        years = inputs.years,
        real_return,
        brackets = inputs.brackets.brackets().len(),
        "starting projection"
    );

    for year in 1..=inputs.years {
        let flow = advance_year(inputs, real_return, &mut state);
        trace!(
            year,
            gross_income = flow.gross_income,
            tax = flow.tax,
            taxadvantaged = state.balance_taxadvantaged,
            taxable = state.balance_taxable,
            "year simulated"
        );
        if !state.is_finite() {
            return Err(ModelError::NonFinite { year });
        }
        on_year(year, &flow, &state);
    }

    Ok(state)
}

// Balances are not clamped: a negative real return may shrink them below zero.
fn advance_year(
    inputs: &ProjectionInputs,
    real_return: f64,
    state: &mut ProjectionState,
) -> YearFlow {
    let gross_income = state.income;
    let tax = inputs.brackets.tax_for(gross_income);
    let net_income = gross_income - tax;

    let contribution_taxadvantaged = inputs.contribution_cap.min(net_income);
    state.balance_taxadvantaged =
        (state.balance_taxadvantaged + contribution_taxadvantaged) * (1.0 + real_return);

    let contribution_taxable = (net_income - contribution_taxadvantaged).max(0.0);
    state.balance_taxable = (state.balance_taxable + contribution_taxable) * (1.0 + real_return);

    // Grown income is only seen by the next year.
    state.income *= 1.0 + inputs.income_growth;

    YearFlow {
        gross_income,
        tax,
        net_income,
        contribution_taxadvantaged,
        contribution_taxable,
    }
}
