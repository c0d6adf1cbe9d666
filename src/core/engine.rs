use super::types::{Cadence, PeriodRecord, SimulationConfig};

/// Fixed balance threshold reported as the "first reach" milestone.
pub const MILESTONE_BALANCE: i64 = 100_000_000;

/// Runs the compounding/taxation projection and returns one record per step,
/// preceded by a synthetic record for the starting position.
///
/// The per-step yield is derived from the nominal annual rate by compound
/// decomposition, so compounding at any cadence over a full year reproduces
/// the annual rate exactly before tax. Tax is assessed only on steps that
/// close a tax year, on the gross profit accumulated since the previous year
/// boundary, and the post-tax balance becomes the principal for subsequent
/// steps.
///
/// Callers are responsible for validating the config ranges; the engine is a
/// total function over well-formed inputs and holds no state across calls.
pub fn simulate(config: &SimulationConfig) -> Vec<PeriodRecord> {
    let steps_per_year = config.cadence.steps_per_year();
    let total_steps = config.horizon_years * steps_per_year;
    let step_yield =
        (1.0 + config.annual_rate_percent / 100.0).powf(1.0 / f64::from(steps_per_year)) - 1.0;

    let mut records = Vec::with_capacity(total_steps as usize + 1);
    let mut current_capital = config.starting_capital;
    let mut year_start_capital = config.starting_capital;

    records.push(PeriodRecord {
        elapsed_years: 0.0,
        period_label: "start".to_string(),
        balance: current_capital as i64,
        period_profit: 0,
        cumulative_annual_profit: 0,
        tax_withheld: 0,
        is_year_end: true,
    });

    for step in 1..=total_steps {
        let is_year_end = step % steps_per_year == 0;
        let gross_capital = current_capital * (1.0 + step_yield);
        let period_profit = gross_capital - current_capital;
        let year_cumulative_profit = gross_capital - year_start_capital;

        let tax_amount = if is_year_end {
            let tax = year_cumulative_profit * config.tax_rate_percent / 100.0;
            current_capital = gross_capital - tax;
            year_start_capital = current_capital;
            tax
        } else {
            current_capital = gross_capital;
            0.0
        };

        records.push(PeriodRecord {
            elapsed_years: f64::from(step) / f64::from(steps_per_year),
            period_label: period_label(config.cadence, step),
            balance: current_capital as i64,
            period_profit: period_profit as i64,
            cumulative_annual_profit: year_cumulative_profit as i64,
            tax_withheld: tax_amount as i64,
            is_year_end,
        });
    }

    records
}

fn period_label(cadence: Cadence, step: u32) -> String {
    match cadence {
        Cadence::Monthly => {
            let year = (step - 1) / 12 + 1;
            let month = (step - 1) % 12 + 1;
            format!("year {year} month {month}")
        }
        Cadence::SemiAnnual => {
            let year = (step - 1) / 2 + 1;
            let half = if step % 2 != 0 { "H1" } else { "H2" };
            format!("year {year} {half}")
        }
        Cadence::Annual => format!("year {step}"),
    }
}

/// Index of the first record whose balance meets or exceeds `threshold`,
/// scanning in sequence order. `None` when the horizon ends first.
pub fn first_milestone_crossing(records: &[PeriodRecord], threshold: i64) -> Option<usize> {
    records.iter().position(|r| r.balance >= threshold)
}
