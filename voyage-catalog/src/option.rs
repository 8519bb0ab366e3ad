use chrono::{NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

/// A sellable tour product. `base_price` is the fallback unit price when an
/// option carries no usable pricing of its own.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Package {
    pub id: Uuid,
    pub name: String,
    pub base_price: i64,
}

/// Time of day of a slot, always truncated to the minute. Serialized as `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotTime(NaiveTime);

impl SlotTime {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }

    /// Drops seconds and sub-second precision.
    pub fn from_time(time: NaiveTime) -> Self {
        Self(NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time))
    }

    /// Accepts `HH:MM`, `HH:MM:SS` and `HH:MM:SS.fff`.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        ["%H:%M", "%H:%M:%S", "%H:%M:%S%.f"]
            .iter()
            .find_map(|fmt| NaiveTime::parse_from_str(value, fmt).ok())
            .map(Self::from_time)
    }

    pub fn as_time(&self) -> NaiveTime {
        self.0
    }
}

impl fmt::Display for SlotTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

impl Serialize for SlotTime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SlotTime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        SlotTime::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid time of day: {raw}")))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GroupType {
    Join,
    Private,
}

impl GroupType {
    /// Headcount used for tiered pricing and seat checks. Infants are never
    /// billed; private groups price on adults only.
    pub fn billable_pax(self, adults: u32, children: u32) -> u32 {
        match self {
            GroupType::Join => adults.saturating_add(children),
            GroupType::Private => adults,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricingTier {
    pub min_pax: u32,
    /// `None` means the tier is open-ended.
    pub max_pax: Option<u32>,
    pub price_per_person: i64,
}

impl PricingTier {
    pub fn contains(&self, pax: u32) -> bool {
        self.min_pax <= pax && self.max_pax.map_or(true, |max| pax <= max)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PricingScheme {
    /// One price for the whole booking regardless of headcount.
    FlatRate { price: Option<i64> },
    Tiered { tiers: Vec<PricingTier> },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlotRule {
    pub day: Weekday,
    pub time: SlotTime,
}

/// Passenger limits an option accepts. `max` is `None` when unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaxBounds {
    pub min: u32,
    pub max: Option<u32>,
}

impl PaxBounds {
    pub fn contains(&self, pax: u32) -> bool {
        pax >= self.min && self.max.map_or(true, |max| pax <= max)
    }
}

/// Validated option of a package. Build it with [`PackageOption::from_raw`]
/// so malformed tiers and slot rules never reach pricing or scheduling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PackageOption {
    pub id: Uuid,
    pub package_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub group_type: GroupType,
    pub quota: Option<u32>,
    pub adult_price: Option<i64>,
    pub child_price: Option<i64>,
    pub infant_price: Option<i64>,
    pub pricing: PricingScheme,
    pub times: Vec<SlotTime>,
    pub slot_rules: Vec<SlotRule>,
}

impl PackageOption {
    pub fn is_flat_rate(&self) -> bool {
        matches!(self.pricing, PricingScheme::FlatRate { .. })
    }

    pub fn tiers(&self) -> &[PricingTier] {
        match &self.pricing {
            PricingScheme::Tiered { tiers } => tiers,
            PricingScheme::FlatRate { .. } => &[],
        }
    }

    /// Smallest tier minimum (or 1) up to the largest tier maximum. Options
    /// without tiers are capped by their quota when one is set.
    pub fn pax_bounds(&self) -> PaxBounds {
        let tiers = self.tiers();
        if tiers.is_empty() {
            return PaxBounds {
                min: 1,
                max: self.quota.filter(|q| *q > 0),
            };
        }

        let min = tiers.iter().map(|t| t.min_pax).min().unwrap_or(1).max(1);
        let max = if tiers.iter().any(|t| t.max_pax.is_none()) {
            None
        } else {
            tiers.iter().filter_map(|t| t.max_pax).max()
        };
        PaxBounds { min, max }
    }

    /// Converts a stored option record into the validated model. Anything
    /// that cannot be trusted is dropped and reported as a warning.
    pub fn from_raw(package_id: Uuid, raw: RawPackageOption) -> (Self, Vec<CatalogWarning>) {
        let option_id = raw.id;
        let mut warnings = Vec::new();

        let group_type = match raw.group_type.as_deref().map(str::trim) {
            None | Some("") => GroupType::Join,
            Some(value) if value.eq_ignore_ascii_case("join") => GroupType::Join,
            Some(value) if value.eq_ignore_ascii_case("private") => GroupType::Private,
            Some(value) => {
                warnings.push(CatalogWarning::UnknownGroupType {
                    option_id,
                    value: value.to_string(),
                });
                GroupType::Join
            }
        };

        let quota = raw.quota.and_then(|q| u32::try_from(q).ok());

        let pricing = if raw.is_flat_rate {
            PricingScheme::FlatRate {
                price: raw.flat_rate_price,
            }
        } else {
            PricingScheme::Tiered {
                tiers: sanitize_tiers(option_id, raw.pricing_tiers, &mut warnings),
            }
        };

        let mut times = Vec::new();
        for value in raw.times {
            match SlotTime::parse(&value) {
                Some(time) if !times.contains(&time) => times.push(time),
                Some(_) => {}
                None => warnings.push(CatalogWarning::InvalidTime { option_id, value }),
            }
        }

        let mut slot_rules = Vec::new();
        for (index, rule) in raw.slot_rules.into_iter().enumerate() {
            match parse_slot_rule(&rule) {
                Ok(rule) => slot_rules.push(rule),
                Err(reason) => warnings.push(CatalogWarning::InvalidSlotRule {
                    option_id,
                    index,
                    reason,
                }),
            }
        }

        let option = Self {
            id: option_id,
            package_id,
            name: raw.name,
            description: raw.description,
            group_type,
            quota,
            adult_price: raw.adult_price,
            child_price: raw.child_price,
            infant_price: raw.infant_price,
            pricing,
            times,
            slot_rules,
        };

        (option, warnings)
    }
}

/// Option record as stored by the admin screens: every field optional and
/// loosely typed.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RawPackageOption {
    #[serde(default)]
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub group_type: Option<String>,
    #[serde(default)]
    pub quota: Option<i64>,
    #[serde(default)]
    pub adult_price: Option<i64>,
    #[serde(default)]
    pub child_price: Option<i64>,
    #[serde(default)]
    pub infant_price: Option<i64>,
    #[serde(default)]
    pub is_flat_rate: bool,
    #[serde(default)]
    pub flat_rate_price: Option<i64>,
    #[serde(default)]
    pub pricing_tiers: Vec<RawPricingTier>,
    #[serde(default)]
    pub times: Vec<String>,
    #[serde(default)]
    pub slot_rules: Vec<RawSlotRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RawPricingTier {
    #[serde(default)]
    pub min_pax: Option<i64>,
    #[serde(default)]
    pub max_pax: Option<i64>,
    #[serde(default)]
    pub price_per_person: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RawSlotRule {
    #[serde(default)]
    pub day: serde_json::Value,
    #[serde(default)]
    pub time: serde_json::Value,
}

/// Catalog data that was dropped while building an option.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CatalogWarning {
    UnknownGroupType { option_id: Uuid, value: String },
    InvalidTier { option_id: Uuid, index: usize, reason: String },
    OverlappingTier { option_id: Uuid, index: usize, min_pax: u32 },
    TierGap { option_id: Uuid, from_pax: u32, to_pax: u32 },
    InvalidTime { option_id: Uuid, value: String },
    InvalidSlotRule { option_id: Uuid, index: usize, reason: String },
}

impl fmt::Display for CatalogWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogWarning::UnknownGroupType { option_id, value } => {
                write!(f, "option {option_id}: unknown group type {value:?}, treated as join")
            }
            CatalogWarning::InvalidTier { option_id, index, reason } => {
                write!(f, "option {option_id}: pricing tier #{index} dropped: {reason}")
            }
            CatalogWarning::OverlappingTier { option_id, index, min_pax } => write!(
                f,
                "option {option_id}: pricing tier #{index} starting at {min_pax} pax overlaps an earlier tier"
            ),
            CatalogWarning::TierGap { option_id, from_pax, to_pax } => write!(
                f,
                "option {option_id}: no pricing tier covers {from_pax}..={to_pax} pax, base price applies"
            ),
            CatalogWarning::InvalidTime { option_id, value } => {
                write!(f, "option {option_id}: invalid time {value:?}")
            }
            CatalogWarning::InvalidSlotRule { option_id, index, reason } => {
                write!(f, "option {option_id}: slot rule #{index} dropped: {reason}")
            }
        }
    }
}

fn sanitize_tiers(
    option_id: Uuid,
    raw: Vec<RawPricingTier>,
    warnings: &mut Vec<CatalogWarning>,
) -> Vec<PricingTier> {
    let mut parsed = Vec::new();
    for (index, tier) in raw.into_iter().enumerate() {
        match parse_tier(&tier) {
            Ok(tier) => parsed.push((index, tier)),
            Err(reason) => warnings.push(CatalogWarning::InvalidTier {
                option_id,
                index,
                reason,
            }),
        }
    }
    // Stable, so equal minimums keep their stored order.
    parsed.sort_by_key(|(_, tier)| tier.min_pax);

    let mut tiers: Vec<PricingTier> = Vec::with_capacity(parsed.len());
    for (index, tier) in parsed {
        if let Some(last) = tiers.last() {
            let overlaps = last.max_pax.map_or(true, |max| tier.min_pax <= max);
            if overlaps {
                warnings.push(CatalogWarning::OverlappingTier {
                    option_id,
                    index,
                    min_pax: tier.min_pax,
                });
                continue;
            }
            if let Some(max) = last.max_pax {
                if tier.min_pax > max.saturating_add(1) {
                    warnings.push(CatalogWarning::TierGap {
                        option_id,
                        from_pax: max + 1,
                        to_pax: tier.min_pax - 1,
                    });
                }
            }
        }
        tiers.push(tier);
    }
    tiers
}

fn parse_tier(raw: &RawPricingTier) -> Result<PricingTier, String> {
    let min_pax = raw.min_pax.ok_or("missing min_pax")?;
    if min_pax < 1 {
        return Err(format!("min_pax {min_pax} is below 1"));
    }
    let min_pax = u32::try_from(min_pax).map_err(|_| format!("min_pax {min_pax} out of range"))?;

    let max_pax = match raw.max_pax {
        None => None,
        Some(max) if max < i64::from(min_pax) => {
            return Err(format!("max_pax {max} is below min_pax {min_pax}"));
        }
        Some(max) => Some(u32::try_from(max).map_err(|_| format!("max_pax {max} out of range"))?),
    };

    let price_per_person = raw.price_per_person.ok_or("missing price_per_person")?;
    if price_per_person < 0 {
        return Err(format!("negative price_per_person {price_per_person}"));
    }

    Ok(PricingTier {
        min_pax,
        max_pax,
        price_per_person,
    })
}

fn parse_slot_rule(raw: &RawSlotRule) -> Result<SlotRule, String> {
    let day = parse_weekday(&raw.day).ok_or_else(|| format!("unknown day {}", raw.day))?;
    let time = raw
        .time
        .as_str()
        .and_then(SlotTime::parse)
        .ok_or_else(|| format!("invalid time {}", raw.time))?;
    Ok(SlotRule { day, time })
}

/// Day names ("mon", "Monday") or indexes counted from Sunday = 0.
fn parse_weekday(value: &serde_json::Value) -> Option<Weekday> {
    match value {
        serde_json::Value::Number(n) => n.as_u64().and_then(weekday_from_sunday_index),
        serde_json::Value::String(s) => {
            let s = s.trim();
            match s.parse::<u64>() {
                Ok(index) => weekday_from_sunday_index(index),
                Err(_) => s.parse::<Weekday>().ok(),
            }
        }
        _ => None,
    }
}

fn weekday_from_sunday_index(index: u64) -> Option<Weekday> {
    match index {
        0 => Some(Weekday::Sun),
        1 => Some(Weekday::Mon),
        2 => Some(Weekday::Tue),
        3 => Some(Weekday::Wed),
        4 => Some(Weekday::Thu),
        5 => Some(Weekday::Fri),
        6 => Some(Weekday::Sat),
        _ => None,
    }
}
