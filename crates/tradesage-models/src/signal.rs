use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Letter grade attached to a trading signal, best first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Grade {
    #[serde(rename = "A+")]
    APlus,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "B+")]
    BPlus,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "C+")]
    CPlus,
    #[serde(rename = "C")]
    C,
    #[serde(rename = "D")]
    D,
    #[serde(rename = "F")]
    F,
}

impl Grade {
    /// Every grade in rank order.
    pub const ALL: [Grade; 8] = [
        Grade::APlus,
        Grade::A,
        Grade::BPlus,
        Grade::B,
        Grade::CPlus,
        Grade::C,
        Grade::D,
        Grade::F,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::CPlus => "C+",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }

    /// Exact, case-sensitive lookup by label.
    pub fn from_label(label: &str) -> Option<Grade> {
        Self::ALL.into_iter().find(|g| g.as_str() == label)
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalAction {
    Buy,
    Sell,
    Hold,
}

impl SignalAction {
    pub const ALL: [SignalAction; 3] = [SignalAction::Buy, SignalAction::Sell, SignalAction::Hold];

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalAction::Buy => "BUY",
            SignalAction::Sell => "SELL",
            SignalAction::Hold => "HOLD",
        }
    }

    pub fn from_label(label: &str) -> Option<SignalAction> {
        Self::ALL.into_iter().find(|a| a.as_str() == label)
    }
}

impl std::fmt::Display for SignalAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated trading recommendation produced from a JSON-mode completion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradingSignal {
    pub grade: Grade,
    /// 0 to 100.
    pub confidence: u8,
    pub action: SignalAction,
    /// Price target, always positive.
    pub target: Decimal,
    /// Stop-loss level, always positive.
    pub stop: Decimal,
    pub reasoning: String,
}
