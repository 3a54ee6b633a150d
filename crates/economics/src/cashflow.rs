//! Yearly arbitrage cashflow, NPV, IRR and payback.
//!
//! The pack buys energy at `buy_price_per_kwh` and sells it back at
//! `sell_price_per_kwh`, cycling `cycles_per_year` times until its cycle life
//! runs out. Usable energy fades geometrically each year.

use packcore::FinancialKpis;
use serde::{Deserialize, Serialize};

/// Discount-rate bracket searched for the IRR
pub const IRR_BRACKET: (f64, f64) = (-0.9, 1.0);
/// Bisection steps; the IRR precision is bounded by this count, not a tolerance
pub const IRR_ITERATIONS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinancialParams {
    pub buy_price_per_kwh: f64,
    pub sell_price_per_kwh: f64,
    pub cycles_per_year: f64,
    pub horizon_years: u32,
    /// Fraction of usable energy lost per year
    pub annual_degradation: f64,
    pub round_trip_efficiency: f64,
    /// Yearly operating cost as a fraction of capex
    pub opex_rate: f64,
    pub discount_rate: f64,
    /// Stop earning once the pack's cycle life is used up. When off, every
    /// year runs the full `cycles_per_year`.
    pub cap_cycles_at_life: bool,
}

impl Default for FinancialParams {
    fn default() -> Self {
        Self {
            buy_price_per_kwh: 0.10,
            sell_price_per_kwh: 0.30,
            cycles_per_year: 300.0,
            horizon_years: 15,
            annual_degradation: 0.02,
            round_trip_efficiency: 0.90,
            opex_rate: 0.01,
            discount_rate: 0.05,
            cap_cycles_at_life: true,
        }
    }
}

impl FinancialParams {
    pub fn with_prices(mut self, buy_per_kwh: f64, sell_per_kwh: f64) -> Self {
        self.buy_price_per_kwh = buy_per_kwh;
        self.sell_price_per_kwh = sell_per_kwh;
        self
    }

    pub fn with_horizon(mut self, years: u32) -> Self {
        self.horizon_years = years;
        self
    }

    pub fn with_degradation(mut self, annual_degradation: f64) -> Self {
        self.annual_degradation = annual_degradation;
        self
    }

    pub fn with_opex_rate(mut self, opex_rate: f64) -> Self {
        self.opex_rate = opex_rate;
        self
    }

    pub fn with_discount_rate(mut self, discount_rate: f64) -> Self {
        self.discount_rate = discount_rate;
        self
    }

    pub fn with_cycle_cap(mut self, cap_cycles_at_life: bool) -> Self {
        self.cap_cycles_at_life = cap_cycles_at_life;
        self
    }

    pub fn annual_opex(&self, capex: f64) -> f64 {
        capex * self.opex_rate
    }

    /// Net cashflow of each year `1..=horizon` for a pack of `energy_wh`
    /// that survives `cycle_life` full cycles.
    pub fn cashflows(&self, capex: f64, energy_wh: f64, cycle_life: f64) -> Vec<f64> {
        let margin = self.sell_price_per_kwh - self.buy_price_per_kwh;
        let opex = self.annual_opex(capex);
        let mut cycles_left = cycle_life.max(0.0);

        (0..self.horizon_years)
            .map(|year| {
                let usable_kwh = energy_wh / 1000.0 * (1.0 - self.annual_degradation).powi(year as i32);
                let cycles = if self.cap_cycles_at_life {
                    self.cycles_per_year.min(cycles_left)
                } else {
                    self.cycles_per_year
                };
                cycles_left -= cycles;
                usable_kwh * self.round_trip_efficiency * margin * cycles - opex
            })
            .collect()
    }
}

/// Present value of `cashflows` (year 1 first) at `rate`, minus `capex`
pub fn npv(rate: f64, capex: f64, cashflows: &[f64]) -> f64 {
    let discounted: f64 = cashflows
        .iter()
        .enumerate()
        .map(|(i, cf)| cf / (1.0 + rate).powi(i as i32 + 1))
        .sum();
    discounted - capex
}

/// Discount rate at which NPV crosses zero, by bisection over `IRR_BRACKET`.
///
/// Returns `None` when NPV has the same sign at both ends of the bracket.
pub fn irr(capex: f64, cashflows: &[f64]) -> Option<f64> {
    let (mut lo, mut hi) = IRR_BRACKET;
    let npv_lo = npv(lo, capex, cashflows);
    let npv_hi = npv(hi, capex, cashflows);
    if npv_lo * npv_hi > 0.0 || !npv_lo.is_finite() || !npv_hi.is_finite() {
        return None;
    }

    let mut lo_sign = npv_lo.signum();
    for _ in 0..IRR_ITERATIONS {
        let mid = 0.5 * (lo + hi);
        let npv_mid = npv(mid, capex, cashflows);
        if npv_mid == 0.0 {
            return Some(mid);
        }
        if npv_mid.signum() == lo_sign {
            lo = mid;
            lo_sign = npv_mid.signum();
        } else {
            hi = mid;
        }
    }
    Some(0.5 * (lo + hi))
}

/// First year (1-based) whose cumulative cashflow reaches `capex`
pub fn payback_year(capex: f64, cashflows: &[f64]) -> Option<u32> {
    let mut cumulative = 0.0;
    for (i, cf) in cashflows.iter().enumerate() {
        cumulative += cf;
        if cumulative >= capex {
            return Some(i as u32 + 1);
        }
    }
    None
}

/// Full KPI set for a pack bought at `capex` holding `energy_wh`.
pub fn evaluate(params: &FinancialParams, capex: f64, energy_wh: f64, cycle_life: f64) -> FinancialKpis {
    let cashflows = params.cashflows(capex, energy_wh, cycle_life);
    let lifetime_profit = cashflows.iter().sum::<f64>() - capex;
    log::trace!("capex {capex:.2}, {energy_wh:.0} Wh, {cycle_life:.0} cycles -> profit {lifetime_profit:.2}");

    FinancialKpis {
        capex,
        annual_opex: params.annual_opex(capex),
        payback_year: payback_year(capex, &cashflows),
        npv: npv(params.discount_rate, capex, &cashflows),
        irr: irr(capex, &cashflows),
        lifetime_profit,
        cashflows,
    }
}
