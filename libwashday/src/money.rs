//! Currency formatting and order pricing

use rust_decimal::{Decimal, RoundingStrategy};
use rusty_money::{iso, Formatter, Money, Params, Position};
use serde::{Deserialize, Serialize};

use crate::config::PricingConfig;

/// Where the currency symbol sits relative to the number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    Before,
    BeforeSpaced,
    AfterSpaced,
}

impl Placement {
    fn positions(self) -> &'static [Position] {
        match self {
            Placement::Before => &[Position::Sign, Position::Symbol, Position::Amount],
            Placement::BeforeSpaced => &[
                Position::Sign,
                Position::Symbol,
                Position::Space,
                Position::Amount,
            ],
            Placement::AfterSpaced => &[
                Position::Sign,
                Position::Amount,
                Position::Space,
                Position::Symbol,
            ],
        }
    }
}

/// Number separators and symbol placement for a display locale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LocaleStyle {
    digit_separator: char,
    exponent_separator: char,
    placement: Placement,
}

impl LocaleStyle {
    fn of(locale: &str) -> Self {
        let language = locale
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_lowercase();

        match language.as_str() {
            "de" | "es" | "it" | "pt" => Self {
                digit_separator: '.',
                exponent_separator: ',',
                placement: Placement::AfterSpaced,
            },
            "nl" => Self {
                digit_separator: '.',
                exponent_separator: ',',
                placement: Placement::BeforeSpaced,
            },
            "fr" => Self {
                digit_separator: '\u{202f}',
                exponent_separator: ',',
                placement: Placement::AfterSpaced,
            },
            _ => Self {
                digit_separator: ',',
                exponent_separator: '.',
                placement: Placement::Before,
            },
        }
    }

    fn params(
        &self,
        symbol: Option<&'static str>,
        positions: &'static [Position],
    ) -> Params<'static> {
        Params {
            digit_separator: self.digit_separator,
            exponent_separator: self.exponent_separator,
            positions,
            rounding: Some(2),
            symbol,
            ..Default::default()
        }
    }
}

/// Format `amount` as a currency string with exactly two fraction digits
///
/// Halves round away from zero. Unknown currency codes fall back to the
/// code itself as the symbol.
///
/// ```
/// use libwashday::money::format_currency;
/// use rust_decimal::Decimal;
///
/// assert_eq!(format_currency(Decimal::new(123450, 2), "EUR", "en"), "€1,234.50");
/// assert_eq!(format_currency(Decimal::new(123450, 2), "EUR", "de"), "1.234,50 €");
/// ```
pub fn format_currency(amount: Decimal, currency: &str, locale: &str) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    // -0.00 prints without a sign
    let rounded = if rounded.is_zero() { Decimal::ZERO } else { rounded };
    let style = LocaleStyle::of(locale);

    if let Some(known) = iso::find(currency) {
        let money = Money::from_decimal(rounded, known);
        let params = style.params(Some(known.symbol), style.placement.positions());
        return Formatter::money(&money, params);
    }

    // Params only take static symbols, so the code is placed by hand
    let code = currency.to_uppercase();
    let number = Formatter::money(
        &Money::from_decimal(rounded.abs(), iso::EUR),
        style.params(None, &[Position::Amount]),
    );
    let sign = if rounded.is_sign_negative() { "-" } else { "" };
    match style.placement {
        Placement::Before => format!("{}{}{}", sign, code, number),
        Placement::BeforeSpaced => format!("{}{} {}", sign, code, number),
        Placement::AfterSpaced => format!("{}{} {}", sign, number, code),
    }
}

/// Format with the configured currency and locale
pub fn format_price(amount: Decimal, pricing: &PricingConfig) -> String {
    format_currency(amount, &pricing.currency, &pricing.locale)
}

/// Price breakdown shown before an order is placed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderQuote {
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub total: Decimal,
}

impl OrderQuote {
    /// Quote for a cart; the delivery fee applies only to a non-empty cart
    pub fn new(subtotal: Decimal, total_items: u32, delivery_fee: Decimal) -> Self {
        let delivery_fee = if total_items > 0 {
            delivery_fee
        } else {
            Decimal::ZERO
        };
        Self {
            subtotal,
            delivery_fee,
            total: subtotal + delivery_fee,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_format_currency_english() {
        assert_eq!(format_currency(dec!(0), "EUR", "en"), "€0.00");
        assert_eq!(format_currency(dec!(12.5), "EUR", "en"), "€12.50");
        assert_eq!(format_currency(dec!(1234567.891), "USD", "en-US"), "$1,234,567.89");
    }

    #[test]
    fn test_format_currency_continental_locales() {
        assert_eq!(format_currency(dec!(1234.5), "EUR", "de"), "1.234,50 €");
        assert_eq!(format_currency(dec!(1234.5), "EUR", "nl-NL"), "€ 1.234,50");
        assert_eq!(format_currency(dec!(999), "EUR", "fr"), "999,00 €");
        assert_eq!(format_currency(dec!(1234567), "EUR", "fr_FR"), "1\u{202f}234\u{202f}567,00 €");
    }

    #[test]
    fn test_format_currency_rounds_half_away_from_zero() {
        assert_eq!(format_currency(dec!(2.345), "EUR", "en"), "€2.35");
        assert_eq!(format_currency(dec!(-2.345), "EUR", "en"), "-€2.35");
        assert_eq!(format_currency(dec!(-0.001), "EUR", "en"), "€0.00");
    }

    #[test]
    fn test_format_currency_unknown_code_uses_code() {
        assert_eq!(format_currency(dec!(5), "zzz", "en"), "ZZZ5.00");
        assert_eq!(format_currency(dec!(-1234.5), "zzz", "de"), "-1.234,50 ZZZ");
        assert_eq!(format_currency(dec!(5), "zzz", "nl"), "ZZZ 5,00");
    }

    #[test]
    fn test_quote_adds_fee_only_for_non_empty_cart() {
        let quote = OrderQuote::new(dec!(42), 3, dec!(5));
        assert_eq!(quote.total, dec!(47));

        let empty = OrderQuote::new(Decimal::ZERO, 0, dec!(5));
        assert_eq!(empty.delivery_fee, Decimal::ZERO);
        assert_eq!(empty.total, Decimal::ZERO);
    }
}
