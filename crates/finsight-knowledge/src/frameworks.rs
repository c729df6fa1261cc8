//! Built-in valuation framework catalogue.
//!
//! Frameworks are static reference data constructed per instrument-type
//! request. The catalogue is never empty for a supported instrument type;
//! knowledge-search results may supplement it but never replace it.

use finsight_core::{Formula, FormulaVariable, InstrumentType, ValuationFramework};

fn var(symbol: &str, description: &str) -> FormulaVariable {
    FormulaVariable {
        symbol: symbol.to_string(),
        description: description.to_string(),
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

/// Discounted cash flow model for equity-like instruments.
fn discounted_cash_flow() -> ValuationFramework {
    ValuationFramework {
        name: "Discounted Cash Flow".to_string(),
        description: "Estimates intrinsic value as the present value of projected free \
                      cash flows plus a discounted terminal value."
            .to_string(),
        applicability: strings(&[
            "Companies with forecastable cash flows",
            "Long-horizon fundamental analysis",
        ]),
        key_metrics: strings(&["free cash flow", "WACC", "terminal growth rate"]),
        formulas: vec![
            Formula {
                name: "Enterprise value".to_string(),
                expression: "EV = Σ FCF_t / (1 + WACC)^t + TV / (1 + WACC)^n".to_string(),
                variables: vec![
                    var("FCF_t", "Free cash flow in year t"),
                    var("WACC", "Weighted average cost of capital"),
                    var("TV", "Terminal value at the forecast horizon"),
                    var("n", "Forecast horizon in years"),
                ],
            },
            Formula {
                name: "Terminal value (Gordon growth)".to_string(),
                expression: "TV = FCF_n * (1 + g) / (WACC - g)".to_string(),
                variables: vec![
                    var("FCF_n", "Free cash flow in the final forecast year"),
                    var("g", "Perpetual growth rate"),
                    var("WACC", "Weighted average cost of capital"),
                ],
            },
        ],
        limitations: strings(&[
            "Highly sensitive to discount-rate and terminal-growth assumptions",
            "Unreliable for firms with negative or erratic cash flows",
        ]),
        source: "Standard corporate finance methodology".to_string(),
    }
}

/// Dividend discount model.
fn dividend_discount() -> ValuationFramework {
    ValuationFramework {
        name: "Dividend Discount Model".to_string(),
        description: "Values a share as the present value of expected future dividends."
            .to_string(),
        applicability: strings(&[
            "Mature dividend-paying companies",
            "Income-oriented equity analysis",
        ]),
        key_metrics: strings(&["dividends per share", "required return", "dividend growth"]),
        formulas: vec![Formula {
            name: "Gordon growth model".to_string(),
            expression: "P0 = D1 / (r - g)".to_string(),
            variables: vec![
                var("P0", "Intrinsic value per share today"),
                var("D1", "Expected dividend next year"),
                var("r", "Required return on equity"),
                var("g", "Perpetual dividend growth rate"),
            ],
        }],
        limitations: strings(&[
            "Meaningless for non-dividend payers",
            "Assumes stable perpetual growth below the required return",
        ]),
        source: "Gordon (1962) growth model".to_string(),
    }
}

/// Relative valuation via price multiples.
fn relative_multiples() -> ValuationFramework {
    ValuationFramework {
        name: "Relative Valuation Multiples".to_string(),
        description: "Benchmarks price against fundamentals of comparable instruments \
                      using standardized multiples."
            .to_string(),
        applicability: strings(&[
            "Cross-sectional comparison within a sector",
            "Quick sanity checks on absolute valuations",
        ]),
        key_metrics: strings(&["P/E", "P/B", "EV/EBITDA"]),
        formulas: vec![
            Formula {
                name: "Price-to-earnings".to_string(),
                expression: "P/E = Price per share / Earnings per share".to_string(),
                variables: vec![
                    var("Price per share", "Current market price"),
                    var("Earnings per share", "Trailing or forward EPS"),
                ],
            },
            Formula {
                name: "Enterprise multiple".to_string(),
                expression: "EV/EBITDA = Enterprise value / EBITDA".to_string(),
                variables: vec![
                    var("Enterprise value", "Market capitalization plus net debt"),
                    var("EBITDA", "Earnings before interest, taxes, depreciation, amortization"),
                ],
            },
        ],
        limitations: strings(&[
            "Requires genuinely comparable peers",
            "Inherits any mispricing of the peer group",
        ]),
        source: "Comparable-company analysis practice".to_string(),
    }
}

/// Yield and spread analysis for debt instruments.
fn bond_yield_analysis() -> ValuationFramework {
    ValuationFramework {
        name: "Yield and Spread Analysis".to_string(),
        description: "Prices a bond from the present value of its coupon and principal \
                      cash flows and benchmarks its yield against comparable curves."
            .to_string(),
        applicability: strings(&["Fixed-coupon bonds", "Credit relative value"]),
        key_metrics: strings(&["yield to maturity", "duration", "credit spread"]),
        formulas: vec![
            Formula {
                name: "Bond price".to_string(),
                expression: "P = Σ C / (1 + y)^t + F / (1 + y)^n".to_string(),
                variables: vec![
                    var("C", "Coupon payment per period"),
                    var("y", "Yield per period"),
                    var("F", "Face value"),
                    var("n", "Periods to maturity"),
                ],
            },
            Formula {
                name: "Modified duration".to_string(),
                expression: "Dmod = Dmac / (1 + y)".to_string(),
                variables: vec![
                    var("Dmac", "Macaulay duration"),
                    var("y", "Yield per period"),
                ],
            },
        ],
        limitations: strings(&[
            "Duration is a first-order approximation; convexity matters for large moves",
            "Embedded options require option-adjusted techniques",
        ]),
        source: "Fixed income valuation practice".to_string(),
    }
}

/// Cost-of-carry pricing for commodities.
fn cost_of_carry() -> ValuationFramework {
    ValuationFramework {
        name: "Cost of Carry".to_string(),
        description: "Relates spot and forward prices through financing, storage, and \
                      convenience yield."
            .to_string(),
        applicability: strings(&["Storable commodities", "Futures basis analysis"]),
        key_metrics: strings(&["spot price", "risk-free rate", "storage cost", "convenience yield"]),
        formulas: vec![Formula {
            name: "Forward price".to_string(),
            expression: "F = S * e^((r + u - c) * T)".to_string(),
            variables: vec![
                var("S", "Spot price"),
                var("r", "Risk-free rate"),
                var("u", "Storage cost rate"),
                var("c", "Convenience yield"),
                var("T", "Time to delivery in years"),
            ],
        }],
        limitations: strings(&[
            "Convenience yield is unobservable and volatile",
            "Breaks down when storage is constrained",
        ]),
        source: "Futures pricing theory".to_string(),
    }
}

/// Network-based heuristics for crypto assets.
fn network_value_analysis() -> ValuationFramework {
    ValuationFramework {
        name: "Network Value Analysis".to_string(),
        description: "Benchmarks a crypto asset's market value against on-chain \
                      activity; a heuristic in the absence of cash flows."
            .to_string(),
        applicability: strings(&["Crypto assets with measurable on-chain activity"]),
        key_metrics: strings(&["network value", "transaction volume", "active addresses"]),
        formulas: vec![Formula {
            name: "NVT ratio".to_string(),
            expression: "NVT = Network value / Daily transaction volume".to_string(),
            variables: vec![
                var("Network value", "Circulating supply times price"),
                var("Daily transaction volume", "On-chain value transferred per day"),
            ],
        }],
        limitations: strings(&[
            "No cash flows; all metrics are proxies",
            "On-chain volume can be inflated by self-transfers",
        ]),
        source: "On-chain analytics practice".to_string(),
    }
}

/// Built-in framework catalogue for one instrument type.
///
/// `sector` and `region` refine applicability notes only; the method set is
/// fixed per instrument type.
pub fn frameworks_for(
    instrument_type: InstrumentType,
    sector: Option<&str>,
    region: Option<&str>,
) -> Vec<ValuationFramework> {
    let mut frameworks = match instrument_type {
        InstrumentType::Stock | InstrumentType::Etf => vec![
            discounted_cash_flow(),
            dividend_discount(),
            relative_multiples(),
        ],
        InstrumentType::Bond => vec![bond_yield_analysis(), discounted_cash_flow()],
        InstrumentType::Commodity => vec![cost_of_carry()],
        InstrumentType::Crypto => vec![network_value_analysis(), relative_multiples()],
    };

    for framework in &mut frameworks {
        if let Some(sector) = sector {
            framework.applicability.push(format!("Sector focus: {}", sector));
        }
        if let Some(region) = region {
            framework.applicability.push(format!("Region focus: {}", region));
        }
    }

    frameworks
}
