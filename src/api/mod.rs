use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::core::{
    Bracket, BracketTable, ModelError, ProjectionInputs, ProjectionResult, YearResult, project,
    run_yearly_trace,
};
use crate::paycheck::{
    DEFAULT_PAY_PERIODS, DEFAULT_RAISE_PERCENT, RaiseEstimate, RaiseInputs, estimate_raise,
};

#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("failed to read bracket file {}: {source}", path.display())]
    BracketFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid bracket file {}: {source}", path.display())]
    BracketFileParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Parser, Debug)]
#[command(
    name = "nestegg",
    about = "Progressive-tax retirement savings projector (capped tax-advantaged + taxable account)"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Project tax-advantaged and taxable balances year by year
    Project(ProjectArgs),
    /// Approximate take-home pay after a raise
    Paycheck(PaycheckArgs),
    /// Serve the JSON HTTP API
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
}

#[derive(Args, Debug)]
pub struct ProjectArgs {
    #[arg(long, default_value_t = 112_000.0, help = "Gross income in the first year")]
    initial_income: f64,
    #[arg(long, default_value_t = 20, help = "Number of years to simulate (at most 1000)")]
    years: u32,
    #[arg(
        long,
        default_value_t = 5.0,
        allow_negative_numbers = true,
        help = "Nominal annual return in percent"
    )]
    nominal_return: f64,
    #[arg(
        long,
        default_value_t = 3.0,
        allow_negative_numbers = true,
        help = "Annual inflation in percent"
    )]
    inflation_rate: f64,
    #[arg(
        long,
        default_value_t = 5.0,
        allow_negative_numbers = true,
        help = "Annual income growth in percent"
    )]
    income_growth_rate: f64,
    #[arg(
        long,
        default_value_t = 23_000.0,
        help = "Maximum yearly contribution to the tax-advantaged account"
    )]
    contribution_cap: f64,
    #[arg(
        long = "bracket",
        value_name = "UPPER:RATE",
        value_parser = parse_bracket_arg,
        help = "Marginal bracket as upper bound and rate in percent, e.g. 11600:10; use inf for the top bracket. Repeat in ascending order; defaults to the 2024 single-filer table"
    )]
    brackets: Vec<Bracket>,
    #[arg(
        long,
        conflicts_with = "brackets",
        help = "JSON file with an ordered array of {\"upper\": number|null, \"rate\": percent}"
    )]
    brackets_file: Option<PathBuf>,
    #[arg(long, help = "Print the per-year breakdown")]
    trace: bool,
    #[arg(long, help = "Emit JSON instead of text")]
    json: bool,
}

#[derive(Args, Debug)]
pub struct PaycheckArgs {
    #[arg(long)]
    gross_per_paycheck: f64,
    #[arg(long)]
    net_per_paycheck: f64,
    #[arg(long, default_value_t = DEFAULT_PAY_PERIODS)]
    pay_periods: u32,
    #[arg(
        long,
        default_value_t = DEFAULT_RAISE_PERCENT,
        allow_negative_numbers = true,
        help = "Raise in percent"
    )]
    raise_percent: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        allow_negative_numbers = true,
        help = "Extra yearly gross on top of the raise, e.g. a bonus"
    )]
    additional_annual_amount: f64,
    #[arg(long, help = "Emit JSON instead of text")]
    json: bool,
}

/// Wire form of one bracket; `upper: null` (or absent) marks the top bracket
/// and `rate` is in percent.
#[derive(Copy, Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BracketSpec {
    #[serde(default)]
    upper: Option<f64>,
    rate: f64,
}

impl From<BracketSpec> for Bracket {
    fn from(spec: BracketSpec) -> Self {
        Bracket::new(spec.upper.unwrap_or(f64::INFINITY), spec.rate / 100.0)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectPayload {
    initial_income: Option<f64>,
    years: Option<u32>,
    nominal_return: Option<f64>,
    inflation: Option<f64>,
    income_growth: Option<f64>,
    contribution_cap: Option<f64>,
    brackets: Option<Vec<BracketSpec>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PaycheckPayload {
    gross_per_paycheck: Option<f64>,
    net_per_paycheck: Option<f64>,
    pay_periods: Option<u32>,
    raise_percent: Option<f64>,
    additional_annual_amount: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectResponse {
    real_return: f64,
    taxadvantaged_balance: f64,
    taxable_balance: f64,
    total_balance: f64,
    brackets: BracketTable,
    years: Vec<YearResult>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_bracket_arg(raw: &str) -> Result<Bracket, String> {
    let Some((upper, rate)) = raw.split_once(':') else {
        return Err(format!("expected UPPER:RATE, got {raw:?}"));
    };

    let upper = match upper.trim() {
        "inf" | "max" | "" => f64::INFINITY,
        value => value
            .parse::<f64>()
            .map_err(|e| format!("invalid bracket upper bound {value:?}: {e}"))?,
    };
    let rate = rate
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid bracket rate {rate:?}: {e}"))?;

    Ok(Bracket::new(upper, rate / 100.0))
}

fn load_bracket_file(path: &Path) -> Result<BracketTable, DriverError> {
    let raw = std::fs::read_to_string(path).map_err(|source| DriverError::BracketFileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let specs = serde_json::from_str::<Vec<BracketSpec>>(&raw).map_err(|source| {
        DriverError::BracketFileParse {
            path: path.to_path_buf(),
            source,
        }
    })?;
    debug!(path = %path.display(), brackets = specs.len(), "loaded bracket file");
    Ok(BracketTable::new(
        specs.into_iter().map(Bracket::from).collect(),
    )?)
}

fn build_inputs(args: &ProjectArgs) -> Result<ProjectionInputs, DriverError> {
    let brackets = if let Some(path) = &args.brackets_file {
        load_bracket_file(path)?
    } else if args.brackets.is_empty() {
        BracketTable::us_2024_single()
    } else {
        BracketTable::new(args.brackets.clone())?
    };

    let inputs = ProjectionInputs {
        initial_income: args.initial_income,
        years: args.years,
        nominal_return: args.nominal_return / 100.0,
        inflation: args.inflation_rate / 100.0,
        income_growth: args.income_growth_rate / 100.0,
        contribution_cap: args.contribution_cap,
        brackets,
    };
    inputs.validate()?;
    Ok(inputs)
}

fn build_raise_inputs(args: &PaycheckArgs) -> RaiseInputs {
    RaiseInputs {
        gross_per_paycheck: args.gross_per_paycheck,
        net_per_paycheck: args.net_per_paycheck,
        pay_periods: args.pay_periods,
        raise_percent: args.raise_percent,
        additional_annual_amount: args.additional_annual_amount,
    }
}

fn build_project_response(inputs: &ProjectionInputs) -> Result<ProjectResponse, ModelError> {
    let result = project(inputs)?;
    let years = run_yearly_trace(inputs)?;
    Ok(ProjectResponse {
        real_return: inputs.real_return(),
        taxadvantaged_balance: result.taxadvantaged_balance,
        taxable_balance: result.taxable_balance,
        total_balance: result.total_balance(),
        brackets: inputs.brackets.clone(),
        years,
    })
}

pub fn run_project_command(args: &ProjectArgs) -> Result<String, DriverError> {
    let inputs = build_inputs(args)?;
    info!(
        years = inputs.years,
        initial_income = inputs.initial_income,
        "running projection"
    );

    if args.json {
        let response = build_project_response(&inputs)?;
        return Ok(serde_json::to_string_pretty(&response)?);
    }

    let result = project(&inputs)?;
    let mut out = String::new();
    if args.trace {
        out.push_str(&render_trace(&run_yearly_trace(&inputs)?));
        out.push('\n');
    }
    out.push_str(&render_summary(&result));
    Ok(out)
}

pub fn run_paycheck_command(args: &PaycheckArgs) -> Result<String, DriverError> {
    let estimate = estimate_raise(&build_raise_inputs(args))?;
    if args.json {
        return Ok(serde_json::to_string_pretty(&estimate)?);
    }
    Ok(render_raise_estimate(args, &estimate))
}

fn render_summary(result: &ProjectionResult) -> String {
    format!(
        "Future tax-advantaged balance : {}\nFuture taxable balance        : {}\nFuture total balance          : {}",
        format_currency(result.taxadvantaged_balance, 0),
        format_currency(result.taxable_balance, 0),
        format_currency(result.total_balance(), 0),
    )
}

fn render_trace(years: &[YearResult]) -> String {
    let mut out = format!(
        "{:>4} {:>14} {:>12} {:>14} {:>8} {:>12} {:>14} {:>16} {:>16}\n",
        "year",
        "gross",
        "tax",
        "net",
        "marginal",
        "tax-adv in",
        "taxable in",
        "tax-adv balance",
        "taxable balance"
    );
    for year in years {
        let _ = writeln!(
            out,
            "{:>4} {:>14} {:>12} {:>14} {:>7.1}% {:>12} {:>14} {:>16} {:>16}",
            year.year,
            format_currency(year.gross_income, 0),
            format_currency(year.tax, 0),
            format_currency(year.net_income, 0),
            year.marginal_rate * 100.0,
            format_currency(year.contribution_taxadvantaged, 0),
            format_currency(year.contribution_taxable, 0),
            format_currency(year.end_balance_taxadvantaged, 0),
            format_currency(year.end_balance_taxable, 0),
        );
    }
    out
}

fn render_raise_estimate(args: &PaycheckArgs, estimate: &RaiseEstimate) -> String {
    format!(
        "Current take-home percentage        : {:.2}%\n\
         Old annual gross                    : {}\n\
         New annual gross after {}% raise    : {}\n\
         Final annual gross (adding {})      : {}\n\
         Approx. new annual net              : {}\n\
         Approx. new net per paycheck        : {}\n\
         Approx. increase per paycheck       : {}",
        estimate.take_home_percent,
        format_currency(estimate.old_annual_gross, 2),
        args.raise_percent,
        format_currency(estimate.new_annual_gross_after_raise, 2),
        format_currency(args.additional_annual_amount, 2),
        format_currency(estimate.final_annual_gross, 2),
        format_currency(estimate.approximate_new_annual_net, 2),
        format_currency(estimate.approximate_new_net_per_paycheck, 2),
        format_currency(estimate.net_increase_per_paycheck, 2),
    )
}

/// `$1,234.56`-style rendering with comma thousands separators.
fn format_currency(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let fixed = format!("{:.*}", decimals, value.abs());
    let (whole, fraction) = match fixed.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (fixed.as_str(), None),
    };

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (idx, ch) in whole.chars().enumerate() {
        if idx > 0 && (whole.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let negative = value < 0.0 && fixed.chars().any(|c| matches!(c, '1'..='9'));
    let sign = if negative { "-" } else { "" };
    match fraction {
        Some(fraction) => format!("{sign}${grouped}.{fraction}"),
        None => format!("{sign}${grouped}"),
    }
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/api/health", get(health_handler))
        .route(
            "/api/project",
            get(project_get_handler).post(project_post_handler),
        )
        .route(
            "/api/paycheck",
            get(paycheck_get_handler).post(paycheck_post_handler),
        )
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    info!("nestegg HTTP API listening on http://{addr}");
    info!("Local access: http://127.0.0.1:{port}/api/project");

    axum::serve(listener, app).await
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, HealthResponse { status: "ok" })
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn project_get_handler(Query(payload): Query<ProjectPayload>) -> Response {
    project_handler_impl(payload)
}

async fn project_post_handler(Json(payload): Json<ProjectPayload>) -> Response {
    project_handler_impl(payload)
}

async fn paycheck_get_handler(Query(payload): Query<PaycheckPayload>) -> Response {
    paycheck_handler_impl(payload)
}

async fn paycheck_post_handler(Json(payload): Json<PaycheckPayload>) -> Response {
    paycheck_handler_impl(payload)
}

fn project_handler_impl(payload: ProjectPayload) -> Response {
    let response = project_inputs_from_payload(payload)
        .and_then(|inputs| build_project_response(&inputs).map_err(DriverError::from));
    match response {
        Ok(response) => {
            debug!(years = response.years.len(), "projection request served");
            json_response(StatusCode::OK, response)
        }
        Err(e) => {
            warn!(error = %e, "rejected projection request");
            error_response(StatusCode::BAD_REQUEST, &e.to_string())
        }
    }
}

fn paycheck_handler_impl(payload: PaycheckPayload) -> Response {
    match estimate_raise(&raise_inputs_from_payload(payload)) {
        Ok(estimate) => json_response(StatusCode::OK, estimate),
        Err(e) => {
            warn!(error = %e, "rejected paycheck request");
            error_response(StatusCode::BAD_REQUEST, &e.to_string())
        }
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn project_inputs_from_json(json: &str) -> Result<ProjectionInputs, DriverError> {
    let payload = serde_json::from_str::<ProjectPayload>(json)?;
    project_inputs_from_payload(payload)
}

fn project_inputs_from_payload(payload: ProjectPayload) -> Result<ProjectionInputs, DriverError> {
    let mut args = default_project_args_for_api();

    if let Some(v) = payload.initial_income {
        args.initial_income = v;
    }
    if let Some(v) = payload.years {
        args.years = v;
    }
    if let Some(v) = payload.nominal_return {
        args.nominal_return = v;
    }
    if let Some(v) = payload.inflation {
        args.inflation_rate = v;
    }
    if let Some(v) = payload.income_growth {
        args.income_growth_rate = v;
    }
    if let Some(v) = payload.contribution_cap {
        args.contribution_cap = v;
    }
    if let Some(specs) = payload.brackets {
        args.brackets = specs.into_iter().map(Bracket::from).collect();
        if args.brackets.is_empty() {
            return Err(ModelError::MalformedBrackets(
                "at least one bracket is required".to_string(),
            )
            .into());
        }
    }

    build_inputs(&args)
}

fn raise_inputs_from_payload(payload: PaycheckPayload) -> RaiseInputs {
    let mut args = default_paycheck_args_for_api();

    if let Some(v) = payload.gross_per_paycheck {
        args.gross_per_paycheck = v;
    }
    if let Some(v) = payload.net_per_paycheck {
        args.net_per_paycheck = v;
    }
    if let Some(v) = payload.pay_periods {
        args.pay_periods = v;
    }
    if let Some(v) = payload.raise_percent {
        args.raise_percent = v;
    }
    if let Some(v) = payload.additional_annual_amount {
        args.additional_annual_amount = v;
    }

    build_raise_inputs(&args)
}

fn default_project_args_for_api() -> ProjectArgs {
    ProjectArgs {
        initial_income: 112_000.0,
        years: 20,
        nominal_return: 5.0,
        inflation_rate: 3.0,
        income_growth_rate: 5.0,
        contribution_cap: 23_000.0,
        brackets: Vec::new(),
        brackets_file: None,
        trace: false,
        json: true,
    }
}

fn default_paycheck_args_for_api() -> PaycheckArgs {
    PaycheckArgs {
        gross_per_paycheck: 4_556.24,
        net_per_paycheck: 1_923.43,
        pay_periods: DEFAULT_PAY_PERIODS,
        raise_percent: DEFAULT_RAISE_PERCENT,
        additional_annual_amount: 11_456.0,
        json: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::fs;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn assert_relative(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol * expected.abs().max(1.0),
            "expected {expected}, got {actual}, relative tolerance {tol}"
        );
    }

    fn sample_args() -> ProjectArgs {
        default_project_args_for_api()
    }

    fn parse_project_args(extra: &[&str]) -> ProjectArgs {
        let mut argv = vec!["nestegg", "project"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).expect("args should parse").command {
            Command::Project(args) => args,
            other => panic!("expected project command, got {other:?}"),
        }
    }

    fn temp_bracket_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "nestegg-{}-{name}.json",
            std::process::id()
        ));
        fs::write(&path, contents).expect("failed to write bracket file");
        path
    }

    fn assert_golden_snapshot(path: &str, actual: &str) {
        let update = matches!(
            std::env::var("UPDATE_GOLDEN").as_deref(),
            Ok("1") | Ok("true") | Ok("TRUE")
        );
        let snapshot_path = Path::new(path);

        if update {
            if let Some(parent) = snapshot_path.parent() {
                fs::create_dir_all(parent).expect("failed to create snapshot directory");
            }
            fs::write(snapshot_path, actual).expect("failed to write golden snapshot");
            return;
        }

        let expected = fs::read_to_string(snapshot_path).unwrap_or_else(|_| {
            panic!("missing golden snapshot at {path}; run with UPDATE_GOLDEN=1 to generate")
        });
        assert_eq!(
            actual, expected,
            "snapshot mismatch for {path}; run with UPDATE_GOLDEN=1 to refresh if expected"
        );
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn cli_defaults_reproduce_reference_example() {
        let args = parse_project_args(&[]);
        let inputs = build_inputs(&args).expect("valid inputs");
        assert_eq!(inputs.brackets, BracketTable::us_2024_single());

        let result = project(&inputs).expect("valid inputs");
        assert_relative(result.taxadvantaged_balance, 570_016.295_482_609_7, 1e-6);
        assert_relative(result.taxable_balance, 2_945_511.016_241_205_4, 1e-6);
    }

    #[test]
    fn cli_parses_repeated_brackets_in_percent() {
        let args = parse_project_args(&[
            "--bracket",
            "10:10",
            "--bracket",
            "inf:20",
            "--initial-income",
            "25",
            "--years",
            "1",
            "--nominal-return",
            "0",
            "--inflation-rate",
            "0",
        ]);
        let inputs = build_inputs(&args).expect("valid inputs");
        assert_eq!(inputs.brackets.brackets().len(), 2);
        assert_approx(inputs.brackets.tax_for(25.0), 4.0);
    }

    #[test]
    fn cli_accepts_negative_rates() {
        let args = parse_project_args(&["--income-growth-rate", "-2.5", "--nominal-return", "-1"]);
        let inputs = build_inputs(&args).expect("valid inputs");
        assert_approx(inputs.income_growth, -0.025);
        assert_approx(inputs.nominal_return, -0.01);
    }

    #[test]
    fn cli_rejects_brackets_with_brackets_file() {
        let argv = [
            "nestegg",
            "project",
            "--bracket",
            "inf:10",
            "--brackets-file",
            "table.json",
        ];
        assert!(Cli::try_parse_from(argv).is_err());
    }

    #[test]
    fn parse_bracket_arg_accepts_inf_and_rejects_garbage() {
        let top = parse_bracket_arg("inf:37").expect("valid bracket");
        assert!(top.is_unbounded());
        assert_approx(top.rate, 0.37);

        let first = parse_bracket_arg("11600:10").expect("valid bracket");
        assert_approx(first.upper, 11_600.0);
        assert_approx(first.rate, 0.10);

        assert!(parse_bracket_arg("11600").is_err());
        assert!(parse_bracket_arg("abc:10").is_err());
        assert!(parse_bracket_arg("100:ten").is_err());
    }

    #[test]
    fn build_inputs_rejects_table_without_top_bracket() {
        let mut args = sample_args();
        args.brackets = vec![Bracket::new(10_000.0, 0.10)];
        let err = build_inputs(&args).expect_err("must reject bounded table");
        assert!(matches!(
            err,
            DriverError::Model(ModelError::MalformedBrackets(_))
        ));
    }

    #[test]
    fn build_inputs_rejects_negative_income_and_cap() {
        let mut args = sample_args();
        args.initial_income = -1.0;
        let err = build_inputs(&args).expect_err("must reject negative income");
        assert!(err.to_string().contains("initial_income"));

        let mut args = sample_args();
        args.contribution_cap = -5.0;
        let err = build_inputs(&args).expect_err("must reject negative cap");
        assert!(err.to_string().contains("contribution_cap"));
    }

    #[test]
    fn build_inputs_loads_bracket_file() {
        let path = temp_bracket_file(
            "valid",
            r#"[{"upper": 10, "rate": 10}, {"upper": null, "rate": 20}]"#,
        );
        let mut args = sample_args();
        args.brackets_file = Some(path.clone());
        let inputs = build_inputs(&args);
        let _ = fs::remove_file(&path);

        let inputs = inputs.expect("valid bracket file");
        assert_approx(inputs.brackets.tax_for(25.0), 4.0);
    }

    #[test]
    fn build_inputs_reports_bad_bracket_files() {
        let mut args = sample_args();
        args.brackets_file = Some(PathBuf::from("/nonexistent/nestegg-brackets.json"));
        let err = build_inputs(&args).expect_err("must fail on missing file");
        assert!(matches!(err, DriverError::BracketFileRead { .. }));

        let path = temp_bracket_file("garbled", r#"{"upper": 10}"#);
        args.brackets_file = Some(path.clone());
        let err = build_inputs(&args).expect_err("must fail on bad json");
        let _ = fs::remove_file(&path);
        assert!(matches!(err, DriverError::BracketFileParse { .. }));
    }

    #[test]
    fn project_inputs_from_json_parses_web_keys() {
        let json = r#"{
          "initialIncome": 90000,
          "years": 30,
          "nominalReturn": 6,
          "inflation": 2.5,
          "incomeGrowth": 3,
          "contributionCap": 20000,
          "brackets": [
            {"upper": 50000, "rate": 15},
            {"rate": 30}
          ]
        }"#;
        let inputs = project_inputs_from_json(json).expect("json should parse");

        assert_approx(inputs.initial_income, 90_000.0);
        assert_eq!(inputs.years, 30);
        assert_approx(inputs.nominal_return, 0.06);
        assert_approx(inputs.inflation, 0.025);
        assert_approx(inputs.income_growth, 0.03);
        assert_approx(inputs.contribution_cap, 20_000.0);
        assert_eq!(
            inputs.brackets.brackets(),
            &[Bracket::new(50_000.0, 0.15), Bracket::unbounded(0.30)]
        );
    }

    #[test]
    fn project_inputs_from_json_falls_back_to_defaults() {
        let inputs = project_inputs_from_json("{}").expect("json should parse");
        assert_approx(inputs.initial_income, 112_000.0);
        assert_eq!(inputs.years, 20);
        assert_eq!(inputs.brackets, BracketTable::us_2024_single());
    }

    #[test]
    fn project_inputs_from_json_rejects_bad_payloads() {
        let err = project_inputs_from_json(r#"{"brackets": []}"#).expect_err("empty table");
        assert!(err.to_string().contains("at least one bracket"));

        let err = project_inputs_from_json(r#"{"years": -3}"#).expect_err("negative years");
        assert!(matches!(err, DriverError::Json(_)));

        let err = project_inputs_from_json(r#"{"brackets": [{"upper": 10, "rate": 10}]}"#)
            .expect_err("bounded table");
        assert!(err.to_string().contains("last bracket must be unbounded"));

        let err = project_inputs_from_json(r#"{"incomeGrowth": -150}"#)
            .expect_err("income growth below -100%");
        assert!(err.to_string().contains("income_growth"));

        let err = project_inputs_from_json(r#"{"years": 4294967295}"#)
            .expect_err("horizon beyond the year limit");
        assert!(matches!(
            err,
            DriverError::Model(ModelError::InvalidParameter { name: "years", .. })
        ));
    }

    #[test]
    fn build_project_response_rejects_overflowing_projection() {
        let inputs = project_inputs_from_json(r#"{"incomeGrowth": 1e302}"#)
            .expect("finite growth passes validation");
        let err = build_project_response(&inputs).expect_err("income overflows to infinity");
        assert!(matches!(err, ModelError::NonFinite { .. }));
    }

    #[test]
    fn raise_inputs_from_payload_overlays_defaults() {
        let payload = serde_json::from_str::<PaycheckPayload>(
            r#"{"grossPerPaycheck": 3000, "netPerPaycheck": 2100, "raisePercent": 4}"#,
        )
        .expect("json should parse");
        let inputs = raise_inputs_from_payload(payload);
        assert_approx(inputs.gross_per_paycheck, 3_000.0);
        assert_approx(inputs.net_per_paycheck, 2_100.0);
        assert_approx(inputs.raise_percent, 4.0);
        assert_eq!(inputs.pay_periods, DEFAULT_PAY_PERIODS);
        assert_approx(inputs.additional_annual_amount, 11_456.0);
    }

    #[test]
    fn run_project_command_prints_formatted_summary() {
        let mut args = sample_args();
        args.json = false;
        let out = run_project_command(&args).expect("command should succeed");
        assert!(out.contains("Future tax-advantaged balance : $570,016"));
        assert!(out.contains("Future taxable balance        : $2,945,511"));
        assert!(!out.contains("year"));
    }

    #[test]
    fn run_project_command_trace_lists_every_year() {
        let mut args = sample_args();
        args.json = false;
        args.trace = true;
        args.years = 3;
        let out = run_project_command(&args).expect("command should succeed");
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].contains("year"));
        assert!(lines[1].trim_start().starts_with("1 "));
        assert!(lines[3].trim_start().starts_with("3 "));
        assert!(lines[1].contains("$112,000"));
        assert!(lines[1].contains("24.0%"));
    }

    #[test]
    fn run_project_command_json_contains_expected_fields() {
        let out = run_project_command(&sample_args()).expect("command should succeed");
        let value: serde_json::Value = serde_json::from_str(&out).expect("valid json");
        assert_eq!(value["years"].as_array().map(Vec::len), Some(20));
        assert!(value["realReturn"].is_number());
        assert!(value["taxadvantagedBalance"].is_number());
        assert!(value["totalBalance"].is_number());
        assert!(value["brackets"][6]["upper"].is_null());
        assert!(value["years"][0]["marginalRate"].is_number());
    }

    #[test]
    fn run_paycheck_command_renders_worked_example() {
        let mut args = default_paycheck_args_for_api();
        args.json = false;
        let out = run_paycheck_command(&args).expect("command should succeed");
        assert!(out.contains("42.22%"));
        assert!(out.contains("$118,462.24"));
        assert!(out.contains("$137,025.97"));
        assert!(out.contains("$2,224.84"));
    }

    #[test]
    fn run_paycheck_command_surfaces_validation_errors() {
        let mut args = default_paycheck_args_for_api();
        args.pay_periods = 0;
        let err = run_paycheck_command(&args).expect_err("must reject zero pay periods");
        assert!(err.to_string().contains("pay_periods"));
    }

    #[test]
    fn format_currency_groups_thousands() {
        assert_eq!(format_currency(570_016.295_482_609_7, 0), "$570,016");
        assert_eq!(format_currency(2_945_511.016, 0), "$2,945,511");
        assert_eq!(format_currency(118_462.24, 2), "$118,462.24");
        assert_eq!(format_currency(999.0, 0), "$999");
        assert_eq!(format_currency(1_000.0, 0), "$1,000");
        assert_eq!(format_currency(-1_234.5, 2), "-$1,234.50");
        assert_eq!(format_currency(-0.4, 0), "$0");
    }

    #[test]
    fn golden_snapshot_two_year_projection_json() {
        let json = r#"{
          "initialIncome": 30000,
          "years": 2,
          "nominalReturn": 0,
          "inflation": 0,
          "incomeGrowth": 0,
          "contributionCap": 5000,
          "brackets": [
            {"upper": 10000, "rate": 50},
            {"upper": null, "rate": 25}
          ]
        }"#;
        let inputs = project_inputs_from_json(json).expect("json should parse");
        let response = build_project_response(&inputs).expect("valid inputs");
        let json = format!(
            "{}\n",
            serde_json::to_string(&response).expect("response should serialize")
        );

        assert_golden_snapshot("tests/golden/two_year_projection.json", &json);
    }
}
