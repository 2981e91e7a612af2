use std::fmt;

use serde::Serialize;

pub const DAY_MS: i64 = 86_400_000;

/// Named lookback used by the dashboard period selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Period {
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "2mo")]
    TwoMonths,
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[serde(rename = "6mo")]
    SixMonths,
    #[serde(rename = "9mo")]
    NineMonths,
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
    #[serde(rename = "3y")]
    ThreeYears,
    #[serde(rename = "5y")]
    FiveYears,
}

impl Period {
    pub const ALL: [Period; 9] = [
        Period::OneMonth,
        Period::TwoMonths,
        Period::ThreeMonths,
        Period::SixMonths,
        Period::NineMonths,
        Period::OneYear,
        Period::TwoYears,
        Period::ThreeYears,
        Period::FiveYears,
    ];

    /// Unknown codes yield `None`; callers treat that as "no filtering".
    pub fn parse(code: &str) -> Option<Self> {
        let code = code.trim();
        Self::ALL.into_iter().find(|p| p.code() == code)
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::OneMonth => "1mo",
            Self::TwoMonths => "2mo",
            Self::ThreeMonths => "3mo",
            Self::SixMonths => "6mo",
            Self::NineMonths => "9mo",
            Self::OneYear => "1y",
            Self::TwoYears => "2y",
            Self::ThreeYears => "3y",
            Self::FiveYears => "5y",
        }
    }

    pub fn days(self) -> i64 {
        match self {
            Self::OneMonth => 30,
            Self::TwoMonths => 60,
            Self::ThreeMonths => 90,
            Self::SixMonths => 182,
            Self::NineMonths => 273,
            Self::OneYear => 365,
            Self::TwoYears => 730,
            Self::ThreeYears => 1095,
            Self::FiveYears => 1825,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::OneMonth => "1 month",
            Self::TwoMonths => "2 months",
            Self::ThreeMonths => "3 months",
            Self::SixMonths => "6 months",
            Self::NineMonths => "9 months",
            Self::OneYear => "1 year",
            Self::TwoYears => "2 years",
            Self::ThreeYears => "3 years",
            Self::FiveYears => "5 years",
        }
    }

    pub fn duration_ms(self) -> i64 {
        self.days() * DAY_MS
    }

    /// Bar size suggested for charting this lookback.
    pub fn chart_interval(self) -> &'static str {
        match self {
            Self::OneYear | Self::TwoYears | Self::ThreeYears | Self::FiveYears => "5d",
            _ => "1d",
        }
    }
}

impl Default for Period {
    fn default() -> Self {
        Self::SixMonths
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
