//! Distribution frequency: how many payments per year.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Frequency {
    Weekly,
    #[serde(rename = "Bi-Weekly")]
    BiWeekly,
    #[serde(rename = "Semi-Monthly")]
    SemiMonthly,
    Monthly,
    Quarterly,
    #[serde(rename = "Semi-Annual")]
    SemiAnnual,
    Annual,
}

impl Frequency {
    pub const ALL: [Frequency; 7] = [
        Frequency::Weekly,
        Frequency::BiWeekly,
        Frequency::SemiMonthly,
        Frequency::Monthly,
        Frequency::Quarterly,
        Frequency::SemiAnnual,
        Frequency::Annual,
    ];

    /// Payments per year.
    pub fn per_year(&self) -> u32 {
        match self {
            Frequency::Weekly => 52,
            Frequency::BiWeekly => 26,
            Frequency::SemiMonthly => 24,
            Frequency::Monthly => 12,
            Frequency::Quarterly => 4,
            Frequency::SemiAnnual => 2,
            Frequency::Annual => 1,
        }
    }

    pub fn from_per_year(count: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.per_year() == count)
    }

    /// Canonical label written to output files.
    pub fn label(&self) -> &'static str {
        match self {
            Frequency::Weekly => "Weekly",
            Frequency::BiWeekly => "Bi-Weekly",
            Frequency::SemiMonthly => "Semi-Monthly",
            Frequency::Monthly => "Monthly",
            Frequency::Quarterly => "Quarterly",
            Frequency::SemiAnnual => "Semi-Annual",
            Frequency::Annual => "Annual",
        }
    }

    /// Lenient parse of free-form labels ("bi weekly", "SemiAnnual", "qtr", "12").
    ///
    /// Returns `None` for anything unrecognised; callers never fall back to a default here.
    pub fn parse(text: &str) -> Option<Self> {
        let lowered = text.trim().to_ascii_lowercase();
        let spaced: String = lowered
            .chars()
            .map(|c| if matches!(c, '_' | '-' | '/' | '.') { ' ' } else { c })
            .collect();
        let normalized = spaced.split_whitespace().collect::<Vec<_>>().join(" ");

        if let Ok(count) = normalized.parse::<u32>() {
            return Self::from_per_year(count);
        }

        match normalized.as_str() {
            "weekly" => Some(Frequency::Weekly),
            "bi weekly" | "biweekly" => Some(Frequency::BiWeekly),
            "semi monthly" | "semimonthly" => Some(Frequency::SemiMonthly),
            "monthly" => Some(Frequency::Monthly),
            "quarterly" | "qtr" => Some(Frequency::Quarterly),
            "semi annual" | "semiannual" | "semi annually" => Some(Frequency::SemiAnnual),
            "annual" | "annually" | "yearly" => Some(Frequency::Annual),
            _ => None,
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown distribution frequency '{s}'"))
    }
}
