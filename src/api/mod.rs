use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::core::{
    Cadence, MILESTONE_BALANCE, PeriodRecord, SimulationConfig, first_milestone_crossing,
    simulate,
};

mod input;

const INDEX_HTML: &str = include_str!("../../web/index.html");
const STYLES_CSS: &str = include_str!("../../web/styles.css");
const APP_JS: &str = include_str!("../../web/app.js");

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliCadence {
    Monthly,
    SemiAnnual,
    Annual,
}

impl From<CliCadence> for Cadence {
    fn from(value: CliCadence) -> Self {
        match value {
            CliCadence::Monthly => Cadence::Monthly,
            CliCadence::SemiAnnual => Cadence::SemiAnnual,
            CliCadence::Annual => Cadence::Annual,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
enum ApiCadence {
    Monthly,
    #[serde(alias = "semiAnnual", alias = "semi_annual", alias = "half-yearly")]
    SemiAnnual,
    #[serde(alias = "yearly")]
    Annual,
}

impl From<ApiCadence> for CliCadence {
    fn from(value: ApiCadence) -> Self {
        match value {
            ApiCadence::Monthly => CliCadence::Monthly,
            ApiCadence::SemiAnnual => CliCadence::SemiAnnual,
            ApiCadence::Annual => CliCadence::Annual,
        }
    }
}

impl From<Cadence> for ApiCadence {
    fn from(value: Cadence) -> Self {
        match value {
            Cadence::Monthly => ApiCadence::Monthly,
            Cadence::SemiAnnual => ApiCadence::SemiAnnual,
            Cadence::Annual => ApiCadence::Annual,
        }
    }
}

/// Capital accepted either as a JSON number or as form text that still
/// carries thousands separators or full-width digits.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CapitalInput {
    Number(f64),
    Text(String),
}

impl CapitalInput {
    fn resolve(&self) -> Result<f64, String> {
        match self {
            CapitalInput::Number(value) => Ok(*value),
            CapitalInput::Text(text) => input::parse_capital(text),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    starting_capital: Option<CapitalInput>,
    annual_rate: Option<f64>,
    tax_rate: Option<f64>,
    cadence: Option<ApiCadence>,
    horizon_years: Option<u32>,
    min_rate: Option<f64>,
    max_rate: Option<f64>,
    include_range: Option<bool>,
}

#[derive(Parser, Debug)]
#[command(
    name = "snowball",
    about = "Compound growth projector with year-end tax withholding and a 100M milestone check"
)]
struct Cli {
    #[arg(long, default_value_t = 5_000_000.0, help = "Starting capital in currency units")]
    starting_capital: f64,
    #[arg(
        long,
        default_value_t = 118.0,
        help = "Assumed annual growth rate (CAGR) in percent"
    )]
    annual_rate: f64,
    #[arg(
        long,
        default_value_t = 20.315,
        help = "Tax rate withheld from realized annual profit in percent"
    )]
    tax_rate: f64,
    #[arg(long, value_enum, default_value_t = CliCadence::Monthly)]
    cadence: CliCadence,
    #[arg(long, default_value_t = 5, help = "Projection horizon in years (1-10)")]
    horizon_years: u32,
    #[arg(
        long,
        default_value_t = 68.0,
        help = "Benchmark minimum annual rate in percent"
    )]
    min_rate: f64,
    #[arg(
        long,
        default_value_t = 145.9,
        help = "Benchmark maximum annual rate in percent"
    )]
    max_rate: f64,
    #[arg(long, help = "Also project at the min/max benchmark rates")]
    range: bool,
}

#[derive(Copy, Clone, Debug)]
struct RangeSettings {
    min_rate: f64,
    max_rate: f64,
}

#[derive(Debug)]
struct ProjectionRequest {
    config: SimulationConfig,
    range: Option<RangeSettings>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MilestoneHit {
    index: usize,
    period_label: String,
    elapsed_years: f64,
    balance: i64,
    /// Balance as a multiple of the starting capital.
    multiple: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RangePoint {
    elapsed_years: f64,
    min_balance: i64,
    max_balance: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    cadence: ApiCadence,
    horizon_years: u32,
    starting_capital: i64,
    annual_rate: f64,
    tax_rate: f64,
    milestone: i64,
    records: Vec<PeriodRecord>,
    milestone_hit: Option<MilestoneHit>,
    range: Option<Vec<RangePoint>>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_request(cli: Cli) -> Result<ProjectionRequest, String> {
    if !cli.starting_capital.is_finite() || cli.starting_capital <= 0.0 {
        return Err("--starting-capital must be > 0".to_string());
    }

    if !cli.annual_rate.is_finite() || cli.annual_rate <= -100.0 {
        return Err("--annual-rate must be > -100".to_string());
    }

    if !(0.0..=100.0).contains(&cli.tax_rate) {
        return Err("--tax-rate must be between 0 and 100".to_string());
    }

    if !(1..=10).contains(&cli.horizon_years) {
        return Err("--horizon-years must be between 1 and 10".to_string());
    }

    let range = if cli.range {
        if !cli.min_rate.is_finite() || cli.min_rate <= -100.0 {
            return Err("--min-rate must be > -100".to_string());
        }
        if !cli.max_rate.is_finite() || cli.max_rate <= -100.0 {
            return Err("--max-rate must be > -100".to_string());
        }
        if cli.min_rate > cli.max_rate {
            return Err("--min-rate cannot exceed --max-rate".to_string());
        }
        Some(RangeSettings {
            min_rate: cli.min_rate,
            max_rate: cli.max_rate,
        })
    } else {
        None
    };

    Ok(ProjectionRequest {
        config: SimulationConfig {
            starting_capital: cli.starting_capital,
            annual_rate_percent: cli.annual_rate,
            tax_rate_percent: cli.tax_rate,
            cadence: cli.cadence.into(),
            horizon_years: cli.horizon_years,
        },
        range,
    })
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route("/styles.css", get(styles_handler))
        .route("/app.js", get(app_js_handler))
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    println!("snowball HTTP API listening on http://{addr}");
    println!("Local access: http://127.0.0.1:{port}/");

    axum::serve(listener, app).await
}

async fn index_handler() -> impl IntoResponse {
    with_cache_control(Html(INDEX_HTML))
}

async fn styles_handler() -> impl IntoResponse {
    with_cache_control((
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        STYLES_CSS,
    ))
}

async fn app_js_handler() -> impl IntoResponse {
    with_cache_control((
        [(
            header::CONTENT_TYPE,
            "application/javascript; charset=utf-8",
        )],
        APP_JS,
    ))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_get_handler(Query(payload): Query<SimulatePayload>) -> Response {
    simulate_handler_impl(payload)
}

async fn simulate_post_handler(Json(payload): Json<SimulatePayload>) -> Response {
    simulate_handler_impl(payload)
}

fn simulate_handler_impl(payload: SimulatePayload) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };
    json_response(StatusCode::OK, run_projection(&request))
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
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
fn api_request_from_json(json: &str) -> Result<ProjectionRequest, String> {
    let payload = serde_json::from_str::<SimulatePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload)
}

fn api_request_from_payload(payload: SimulatePayload) -> Result<ProjectionRequest, String> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.starting_capital {
        cli.starting_capital = v.resolve()?;
    }
    if let Some(v) = payload.annual_rate {
        cli.annual_rate = v;
    }
    if let Some(v) = payload.tax_rate {
        cli.tax_rate = v;
    }
    if let Some(v) = payload.cadence {
        cli.cadence = v.into();
    }
    if let Some(v) = payload.horizon_years {
        cli.horizon_years = v;
    }
    if let Some(v) = payload.min_rate {
        cli.min_rate = v;
    }
    if let Some(v) = payload.max_rate {
        cli.max_rate = v;
    }
    if let Some(v) = payload.include_range {
        cli.range = v;
    }

    build_request(cli)
}

fn default_cli_for_api() -> Cli {
    Cli {
        starting_capital: 5_000_000.0,
        annual_rate: 118.0,
        tax_rate: 20.315,
        cadence: CliCadence::Monthly,
        horizon_years: 5,
        min_rate: 68.0,
        max_rate: 145.9,
        range: true,
    }
}

fn run_projection(request: &ProjectionRequest) -> SimulateResponse {
    let records = simulate(&request.config);

    let milestone_hit = first_milestone_crossing(&records, MILESTONE_BALANCE).map(|index| {
        let record = &records[index];
        MilestoneHit {
            index,
            period_label: record.period_label.clone(),
            elapsed_years: record.elapsed_years,
            balance: record.balance,
            multiple: record.balance as f64 / request.config.starting_capital,
        }
    });

    let range = request
        .range
        .map(|settings| build_range_band(&request.config, settings));

    SimulateResponse {
        cadence: request.config.cadence.into(),
        horizon_years: request.config.horizon_years,
        starting_capital: request.config.starting_capital as i64,
        annual_rate: request.config.annual_rate_percent,
        tax_rate: request.config.tax_rate_percent,
        milestone: MILESTONE_BALANCE,
        records,
        milestone_hit,
        range,
    }
}

/// Runs the projection twice more at the benchmark rates and pairs the two
/// trajectories step by step. The runs are independent pure calls; only the
/// assumed rate differs from the user's own projection.
fn build_range_band(config: &SimulationConfig, settings: RangeSettings) -> Vec<RangePoint> {
    let min_run = simulate(&SimulationConfig {
        annual_rate_percent: settings.min_rate,
        ..config.clone()
    });
    let max_run = simulate(&SimulationConfig {
        annual_rate_percent: settings.max_rate,
        ..config.clone()
    });

    min_run
        .iter()
        .zip(max_run.iter())
        .map(|(lo, hi)| RangePoint {
            elapsed_years: lo.elapsed_years,
            min_balance: lo.balance,
            max_balance: hi.balance,
        })
        .collect()
}

/// One-shot CLI mode: run a single projection and print it as text.
pub fn run_projection_cli() {
    let cli = Cli::parse();
    let request = match build_request(cli) {
        Ok(request) => request,
        Err(msg) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
    };
    print_projection(&run_projection(&request));
}

fn print_projection(response: &SimulateResponse) {
    println!(
        "Projection: capital {} at {}%/year, tax {}% on annual profit, {} year(s)",
        input::group_thousands(response.starting_capital),
        response.annual_rate,
        response.tax_rate,
        response.horizon_years,
    );
    println!();
    println!(
        "{:<18} {:>16} {:>14} {:>16} {:>13}",
        "period", "balance", "profit", "annual profit", "tax"
    );
    for (index, record) in response.records.iter().enumerate() {
        let marker = match &response.milestone_hit {
            Some(hit) if hit.index == index => "  <- milestone",
            _ => "",
        };
        println!(
            "{:<18} {:>16} {:>14} {:>16} {:>13}{marker}",
            record.period_label,
            input::group_thousands(record.balance),
            input::group_thousands(record.period_profit),
            input::group_thousands(record.cumulative_annual_profit),
            input::group_thousands(record.tax_withheld),
        );
    }
    println!();

    match &response.milestone_hit {
        Some(hit) => println!(
            "Reaches {} at {} (about {:.1} years in, {:.1}x the starting capital)",
            input::group_thousands(response.milestone),
            hit.period_label,
            hit.elapsed_years,
            hit.multiple,
        ),
        None => println!(
            "Does not reach {} within {} year(s)",
            input::group_thousands(response.milestone),
            response.horizon_years,
        ),
    }

    if let Some(band) = &response.range {
        if let Some(last) = band.last() {
            println!(
                "Benchmark range at horizon: {} .. {}",
                input::group_thousands(last.min_balance),
                input::group_thousands(last.max_balance),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_cli() -> Cli {
        default_cli_for_api()
    }

    #[test]
    fn build_request_rejects_nonpositive_capital() {
        let mut cli = sample_cli();
        cli.starting_capital = 0.0;
        let err = build_request(cli).expect_err("must reject zero capital");
        assert!(err.contains("--starting-capital"));
    }

    #[test]
    fn build_request_rejects_rate_at_negative_100() {
        let mut cli = sample_cli();
        cli.annual_rate = -100.0;
        let err = build_request(cli).expect_err("must reject rate <= -100");
        assert!(err.contains("--annual-rate"));
    }

    #[test]
    fn build_request_rejects_tax_rate_over_100() {
        let mut cli = sample_cli();
        cli.tax_rate = 100.5;
        let err = build_request(cli).expect_err("must reject tax > 100");
        assert!(err.contains("--tax-rate"));
    }

    #[test]
    fn build_request_rejects_out_of_range_horizon() {
        for horizon in [0, 11] {
            let mut cli = sample_cli();
            cli.horizon_years = horizon;
            let err = build_request(cli).expect_err("must reject horizon outside 1..=10");
            assert!(err.contains("--horizon-years"));
        }
    }

    #[test]
    fn build_request_rejects_inverted_benchmark_rates() {
        let mut cli = sample_cli();
        cli.min_rate = 150.0;
        cli.max_rate = 68.0;
        let err = build_request(cli).expect_err("must reject min > max");
        assert!(err.contains("--min-rate"));
    }

    #[test]
    fn build_request_ignores_benchmark_rates_when_range_off() {
        let mut cli = sample_cli();
        cli.range = false;
        cli.min_rate = 150.0;
        cli.max_rate = 68.0;
        let request = build_request(cli).expect("benchmark rates unused without --range");
        assert!(request.range.is_none());
    }

    #[test]
    fn api_request_from_json_parses_web_keys() {
        let json = r#"{
          "startingCapital": "5,000,000",
          "annualRate": 95.5,
          "taxRate": 20.315,
          "cadence": "semi-annual",
          "horizonYears": 7,
          "minRate": 50,
          "maxRate": 120,
          "includeRange": true
        }"#;
        let request = api_request_from_json(json).expect("json should parse");

        assert_eq!(request.config.starting_capital, 5_000_000.0);
        assert_eq!(request.config.annual_rate_percent, 95.5);
        assert_eq!(request.config.tax_rate_percent, 20.315);
        assert_eq!(request.config.cadence, Cadence::SemiAnnual);
        assert_eq!(request.config.horizon_years, 7);
        let range = request.range.expect("range requested");
        assert_eq!(range.min_rate, 50.0);
        assert_eq!(range.max_rate, 120.0);
    }

    #[test]
    fn api_request_accepts_full_width_capital_text() {
        let json = r#"{ "startingCapital": "５，０００，０００" }"#;
        let request = api_request_from_json(json).expect("full-width digits should parse");
        assert_eq!(request.config.starting_capital, 5_000_000.0);
    }

    #[test]
    fn api_request_accepts_numeric_capital() {
        let json = r#"{ "startingCapital": 750000.0 }"#;
        let request = api_request_from_json(json).expect("numeric capital should parse");
        assert_eq!(request.config.starting_capital, 750_000.0);
    }

    #[test]
    fn api_request_rejects_garbled_capital_text() {
        let json = r#"{ "startingCapital": "five million" }"#;
        let err = api_request_from_json(json).expect_err("must reject non-numeric capital");
        assert!(err.contains("startingCapital"));
    }

    #[test]
    fn api_request_parses_cadence_aliases() {
        for alias in ["semiAnnual", "semi_annual", "half-yearly"] {
            let json = format!(r#"{{ "cadence": "{alias}" }}"#);
            let request = api_request_from_json(&json).expect("alias should parse");
            assert_eq!(request.config.cadence, Cadence::SemiAnnual);
        }
        let request = api_request_from_json(r#"{ "cadence": "yearly" }"#).expect("alias");
        assert_eq!(request.config.cadence, Cadence::Annual);
    }

    #[test]
    fn empty_payload_falls_back_to_defaults() {
        let request = api_request_from_json("{}").expect("defaults should validate");
        assert_eq!(request.config.starting_capital, 5_000_000.0);
        assert_eq!(request.config.annual_rate_percent, 118.0);
        assert_eq!(request.config.cadence, Cadence::Monthly);
        assert_eq!(request.config.horizon_years, 5);
        assert!(request.range.is_some());
    }

    #[test]
    fn range_band_pairs_every_step_and_orders_bounds() {
        let request = api_request_from_json("{}").expect("defaults");
        let response = run_projection(&request);
        let band = response.range.expect("range on by default");
        assert_eq!(band.len(), response.records.len());
        for point in &band {
            assert!(point.min_balance <= point.max_balance);
        }
    }

    #[test]
    fn milestone_hit_reports_first_crossing() {
        let request = api_request_from_json("{}").expect("defaults");
        let response = run_projection(&request);
        let hit = response
            .milestone_hit
            .expect("default config should cross 100M within 5 years");
        assert!(response.records[hit.index].balance >= MILESTONE_BALANCE);
        assert!(response.records[hit.index - 1].balance < MILESTONE_BALANCE);
        assert!(hit.multiple >= 20.0);
    }

    #[test]
    fn milestone_hit_is_absent_when_horizon_too_short() {
        let json = r#"{ "horizonYears": 1, "annualRate": 10, "includeRange": false }"#;
        let request = api_request_from_json(json).expect("json should parse");
        let response = run_projection(&request);
        assert!(response.milestone_hit.is_none());
        assert!(response.range.is_none());
    }

    #[test]
    fn simulate_response_serialization_contains_expected_fields() {
        let request = api_request_from_json("{}").expect("defaults");
        let response = run_projection(&request);
        let json = serde_json::to_string(&response).expect("response should serialize");
        assert!(json.contains("\"records\""));
        assert!(json.contains("\"milestoneHit\""));
        assert!(json.contains("\"milestone\":100000000"));
        assert!(json.contains("\"periodLabel\""));
        assert!(json.contains("\"isYearEnd\""));
        assert!(json.contains("\"cumulativeAnnualProfit\""));
        assert!(json.contains("\"taxWithheld\""));
        assert!(json.contains("\"minBalance\""));
        assert!(json.contains("\"cadence\":\"monthly\""));
    }
}
