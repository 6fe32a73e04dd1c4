//! Per-token pricing for the models we know about.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// (input, output) USD cost per token for a model, if known.
///
/// Matches on model-name prefix so dated snapshots resolve to their family.
pub fn model_cost(model: &str) -> Option<(Decimal, Decimal)> {
    let table: &[(&str, Decimal, Decimal)] = &[
        ("gemini-1.5-flash", dec!(0.000000075), dec!(0.0000003)),
        ("gemini-1.5-pro", dec!(0.00000125), dec!(0.000005)),
        ("gemini-2.0-flash", dec!(0.0000001), dec!(0.0000004)),
        ("claude-3-5-haiku", dec!(0.0000008), dec!(0.000004)),
        ("claude-sonnet-4", dec!(0.000003), dec!(0.000015)),
        ("claude-3-5-sonnet", dec!(0.000003), dec!(0.000015)),
        ("gpt-4o-mini", dec!(0.00000015), dec!(0.0000006)),
        ("gpt-4o", dec!(0.0000025), dec!(0.00001)),
    ];
    table
        .iter()
        .find(|(prefix, _, _)| model.starts_with(prefix))
        .map(|(_, input, output)| (*input, *output))
}

/// Fallback pricing for unknown models: zero, so cost logging never lies high.
pub fn default_cost() -> (Decimal, Decimal) {
    (Decimal::ZERO, Decimal::ZERO)
}

/// Estimated USD cost of a single call.
pub fn estimate(costs: (Decimal, Decimal), input_tokens: u32, output_tokens: u32) -> Decimal {
    costs.0 * Decimal::from(input_tokens) + costs.1 * Decimal::from(output_tokens)
}
