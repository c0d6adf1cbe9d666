use serde::Serialize;

/// Compounding frequency. Each cadence divides the year into equal steps
/// and decides which steps close a tax year.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Cadence {
    Monthly,
    SemiAnnual,
    Annual,
}

impl Cadence {
    pub fn steps_per_year(self) -> u32 {
        match self {
            Cadence::Monthly => 12,
            Cadence::SemiAnnual => 2,
            Cadence::Annual => 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Initial principal in currency units. Must be > 0.
    pub starting_capital: f64,
    /// Nominal annual growth rate in percent (118.0 means +118%/year).
    /// Must be > -100.
    pub annual_rate_percent: f64,
    /// Percentage of realized annual profit withheld at each year end.
    pub tax_rate_percent: f64,
    pub cadence: Cadence,
    /// Projection horizon in whole years, 1..=10.
    pub horizon_years: u32,
}

/// One step of the projected trajectory. Currency fields are truncated to
/// whole units for display; `elapsed_years` stays fractional.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodRecord {
    pub elapsed_years: f64,
    pub period_label: String,
    pub balance: i64,
    /// Gross pre-tax profit earned during this single step.
    pub period_profit: i64,
    /// Gross pre-tax profit accumulated since the last year boundary.
    pub cumulative_annual_profit: i64,
    /// Tax assessed this step; nonzero only when `is_year_end` is true.
    pub tax_withheld: i64,
    pub is_year_end: bool,
}
