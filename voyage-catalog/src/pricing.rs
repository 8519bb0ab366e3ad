use serde::{Deserialize, Serialize};
use crate::option::{GroupType, PackageOption, PricingScheme, PricingTier};

/// Passenger mix of a booking request.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PassengerMix {
    pub adults: u32,
    pub children: u32,
    pub infants: u32,
}

impl PassengerMix {
    pub fn new(adults: u32, children: u32, infants: u32) -> Self {
        Self { adults, children, infants }
    }

    /// Billable headcount for the option's group type. Without an option the
    /// booking is priced like a join tour.
    pub fn billable_pax(&self, option: Option<&PackageOption>) -> u32 {
        option
            .map_or(GroupType::Join, |o| o.group_type)
            .billable_pax(self.adults, self.children)
    }
}

/// Baseline price of a request before passenger categories are applied.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceQuote {
    pub is_flat_rate: bool,
    pub unit_price: i64,
    pub total: i64,
    /// Tier that produced `unit_price`, if any.
    pub tier: Option<PricingTier>,
}

/// Per-category unit prices and the total charged for a passenger mix.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PriceBreakdown {
    pub adult_unit: i64,
    pub child_unit: i64,
    pub infant_unit: i64,
    pub total: i64,
    pub is_flat_rate: bool,
}

/// Resolve the unit price and total for `billable_pax` travelers.
///
/// Flat-rate options charge one price for the whole booking. Tiered options
/// use the lowest-`min_pax` tier containing the headcount; when no tier
/// matches, the package's base price applies per traveler.
pub fn resolve_price(
    option: Option<&PackageOption>,
    billable_pax: u32,
    fallback_base_price: i64,
) -> PriceQuote {
    let pax = i64::from(billable_pax);

    let Some(option) = option else {
        return PriceQuote {
            is_flat_rate: false,
            unit_price: fallback_base_price,
            total: fallback_base_price.saturating_mul(pax),
            tier: None,
        };
    };

    match &option.pricing {
        PricingScheme::FlatRate { price } => {
            let unit_price = price.or(option.adult_price).unwrap_or(fallback_base_price);
            PriceQuote {
                is_flat_rate: true,
                unit_price,
                total: unit_price,
                tier: None,
            }
        }
        PricingScheme::Tiered { tiers } => {
            let mut ordered: Vec<&PricingTier> = tiers.iter().collect();
            ordered.sort_by_key(|t| t.min_pax);

            let tier = ordered.into_iter().find(|t| t.contains(billable_pax)).cloned();
            let unit_price = tier.as_ref().map_or(fallback_base_price, |t| t.price_per_person);

            if tier.is_none() && !tiers.is_empty() {
                tracing::debug!(
                    option_id = %option.id,
                    pax = billable_pax,
                    "no pricing tier matches, using base price"
                );
            }

            PriceQuote {
                is_flat_rate: false,
                unit_price,
                total: unit_price.saturating_mul(pax),
                tier,
            }
        }
    }
}

/// Apply explicit category prices on top of a resolved quote.
pub fn split_passenger_prices(
    option: Option<&PackageOption>,
    quote: &PriceQuote,
    mix: &PassengerMix,
) -> PriceBreakdown {
    let explicit = |price: Option<i64>| price.filter(|p| *p >= 0);

    let adult_unit = explicit(option.and_then(|o| o.adult_price)).unwrap_or(quote.unit_price);
    let child_unit = explicit(option.and_then(|o| o.child_price)).unwrap_or(adult_unit);
    let infant_unit = explicit(option.and_then(|o| o.infant_price)).unwrap_or(0);

    let total = if quote.is_flat_rate {
        quote.total
    } else {
        adult_unit
            .saturating_mul(i64::from(mix.adults))
            .saturating_add(child_unit.saturating_mul(i64::from(mix.children)))
            .saturating_add(infant_unit.saturating_mul(i64::from(mix.infants)))
    };

    PriceBreakdown {
        adult_unit,
        child_unit,
        infant_unit,
        total,
        is_flat_rate: quote.is_flat_rate,
    }
}

/// Resolve and split in one step, using the option's billable headcount.
pub fn price_passengers(
    option: Option<&PackageOption>,
    mix: &PassengerMix,
    fallback_base_price: i64,
) -> PriceBreakdown {
    let quote = resolve_price(option, mix.billable_pax(option), fallback_base_price);
    split_passenger_prices(option, &quote, mix)
}
