use crate::error::PricingError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Flat surcharge added when boarding is part of the selection.
pub const HOSTEL_SURCHARGE: u64 = 75_000;

/// The closed set of grade bands the fee table knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GradeBand {
    A,
    B,
    C,
}

impl GradeBand {
    pub const ALL: [GradeBand; 3] = [GradeBand::A, GradeBand::B, GradeBand::C];

    /// Annual tuition for the band, in whole currency units.
    pub const fn base_fee(self) -> u64 {
        match self {
            GradeBand::A => 85_000,
            GradeBand::B => 110_000,
            GradeBand::C => 135_000,
        }
    }
}

impl fmt::Display for GradeBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            GradeBand::A => "A",
            GradeBand::B => "B",
            GradeBand::C => "C",
        };
        f.write_str(label)
    }
}

impl FromStr for GradeBand {
    type Err = PricingError;

    /// Accepts `A`, `b`, `band-c` and `band c` style labels.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let label = normalized
            .strip_prefix("band")
            .map(|rest| rest.trim_start_matches(['-', '_', ' ']))
            .unwrap_or(normalized.as_str());

        match label {
            "a" => Ok(GradeBand::A),
            "b" => Ok(GradeBand::B),
            "c" => Ok(GradeBand::C),
            _ => Err(PricingError::UnknownTier(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingSelection {
    pub tier: GradeBand,
    pub hostel_included: bool,
}

impl PricingSelection {
    pub fn new(tier: GradeBand, hostel_included: bool) -> Self {
        Self {
            tier,
            hostel_included,
        }
    }

    /// Builds a selection from an external tier label.
    ///
    /// Labels outside the fee table are a caller error and are reported as
    /// [`PricingError::UnknownTier`]; they never price as zero.
    pub fn parse(tier: &str, hostel_included: bool) -> Result<Self, PricingError> {
        Ok(Self::new(tier.parse()?, hostel_included))
    }
}

/// Prices a selection. Total over the enumerated domain.
pub fn estimate(selection: PricingSelection) -> u64 {
    let surcharge = if selection.hostel_included {
        HOSTEL_SURCHARGE
    } else {
        0
    };
    selection.tier.base_fee() + surcharge
}

/// A selection paired with its price, recomputed on every change.
///
/// Reads never observe an amount that belongs to an earlier selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricingCell {
    selection: PricingSelection,
    amount: u64,
}

impl PricingCell {
    pub fn new(selection: PricingSelection) -> Self {
        Self {
            selection,
            amount: estimate(selection),
        }
    }

    pub fn selection(&self) -> PricingSelection {
        self.selection
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn set_tier(&mut self, tier: GradeBand) -> u64 {
        self.update(PricingSelection {
            tier,
            ..self.selection
        })
    }

    pub fn set_hostel_included(&mut self, hostel_included: bool) -> u64 {
        self.update(PricingSelection {
            hostel_included,
            ..self.selection
        })
    }

    fn update(&mut self, selection: PricingSelection) -> u64 {
        self.selection = selection;
        self.amount = estimate(selection);
        self.amount
    }
}

impl Default for PricingCell {
    fn default() -> Self {
        Self::new(PricingSelection::new(GradeBand::A, false))
    }
}
