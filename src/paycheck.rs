//! Paycheck-raise estimator.
//!
//! A one-step approximation that assumes the current take-home ratio carries
//! over to the raised salary. It shares no state with the projection engine.

use serde::Serialize;
use tracing::debug;

use crate::core::ModelError;

pub const DEFAULT_PAY_PERIODS: u32 = 26;
pub const DEFAULT_RAISE_PERCENT: f64 = 6.0;

#[derive(Debug, Clone, Copy)]
pub struct RaiseInputs {
    pub gross_per_paycheck: f64,
    pub net_per_paycheck: f64,
    pub pay_periods: u32,
    pub raise_percent: f64,
    pub additional_annual_amount: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RaiseEstimate {
    pub take_home_percent: f64,
    pub old_annual_gross: f64,
    pub new_annual_gross_after_raise: f64,
    pub final_annual_gross: f64,
    pub approximate_new_annual_net: f64,
    pub approximate_new_net_per_paycheck: f64,
    pub net_increase_per_paycheck: f64,
    pub annual_net_increase: f64,
}

pub fn estimate_raise(inputs: &RaiseInputs) -> Result<RaiseEstimate, ModelError> {
    validate(inputs)?;

    let periods = inputs.pay_periods as f64;
    let take_home_ratio = inputs.net_per_paycheck / inputs.gross_per_paycheck;

    let old_annual_gross = inputs.gross_per_paycheck * periods;
    let new_annual_gross_after_raise = old_annual_gross * (1.0 + inputs.raise_percent / 100.0);
    let final_annual_gross = new_annual_gross_after_raise + inputs.additional_annual_amount;

    let approximate_new_annual_net = final_annual_gross * take_home_ratio;
    let approximate_new_net_per_paycheck = approximate_new_annual_net / periods;

    let estimate = RaiseEstimate {
        take_home_percent: take_home_ratio * 100.0,
        old_annual_gross,
        new_annual_gross_after_raise,
        final_annual_gross,
        approximate_new_annual_net,
        approximate_new_net_per_paycheck,
        net_increase_per_paycheck: approximate_new_net_per_paycheck - inputs.net_per_paycheck,
        annual_net_increase: approximate_new_annual_net - inputs.net_per_paycheck * periods,
    };
    debug!(
        take_home_percent = estimate.take_home_percent,
        new_net_per_paycheck = estimate.approximate_new_net_per_paycheck,
        "raise estimated"
    );
    Ok(estimate)
}

fn validate(inputs: &RaiseInputs) -> Result<(), ModelError> {
    if !inputs.gross_per_paycheck.is_finite() || inputs.gross_per_paycheck <= 0.0 {
        return Err(ModelError::invalid("gross_per_paycheck", "must be > 0"));
    }
    if !inputs.net_per_paycheck.is_finite()
        || inputs.net_per_paycheck < 0.0
        || inputs.net_per_paycheck > inputs.gross_per_paycheck
    {
        return Err(ModelError::invalid(
            "net_per_paycheck",
            "must be between 0 and gross_per_paycheck",
        ));
    }
    if inputs.pay_periods == 0 {
        return Err(ModelError::invalid("pay_periods", "must be > 0"));
    }
    if !inputs.raise_percent.is_finite() || inputs.raise_percent <= -100.0 {
        return Err(ModelError::invalid("raise_percent", "must be > -100"));
    }
    if !inputs.additional_annual_amount.is_finite() {
        return Err(ModelError::invalid("additional_annual_amount", "must be finite"));
    }
    Ok(())
}
