//! Stock–Watson / FRED-MD transformation codes

use crate::error::{DfmError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Allowed transformation codes
pub const ALLOWED_TCODES: [u8; 7] = [1, 2, 3, 4, 5, 6, 7];

/// Leading observations destroyed by each code
pub const LEADS_LOST: [(u8, usize); 7] = [(1, 0), (2, 1), (3, 2), (4, 0), (5, 1), (6, 2), (7, 2)];

/// Series name -> raw transformation code, as supplied by the caller.
///
/// Codes stay as plain integers here so that validation can report every
/// offending entry at once instead of failing at deserialization.
pub type TransformCodeMap = BTreeMap<String, i64>;

/// Transformation applied to a single series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum TransformCode {
    /// 1: level
    Level,
    /// 2: first difference
    Diff,
    /// 3: second difference
    SecondDiff,
    /// 4: natural log
    Log,
    /// 5: first difference of log
    LogDiff,
    /// 6: second difference of log
    LogSecondDiff,
    /// 7: first difference of the one-period percentage change
    PctChangeDiff,
}

impl TransformCode {
    /// All codes in numeric order
    pub const ALL: [TransformCode; 7] = [
        TransformCode::Level,
        TransformCode::Diff,
        TransformCode::SecondDiff,
        TransformCode::Log,
        TransformCode::LogDiff,
        TransformCode::LogSecondDiff,
        TransformCode::PctChangeDiff,
    ];

    /// Numeric code
    pub fn code(&self) -> u8 {
        match self {
            TransformCode::Level => 1,
            TransformCode::Diff => 2,
            TransformCode::SecondDiff => 3,
            TransformCode::Log => 4,
            TransformCode::LogDiff => 5,
            TransformCode::LogSecondDiff => 6,
            TransformCode::PctChangeDiff => 7,
        }
    }

    /// Leading observations lost to differencing
    pub fn leads_lost(&self) -> usize {
        let code = self.code();
        LEADS_LOST
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, lost)| *lost)
            .unwrap_or(0)
    }

    /// Whether the transform takes a log first (domain restricted to > 0)
    pub fn uses_log(&self) -> bool {
        matches!(
            self,
            TransformCode::Log | TransformCode::LogDiff | TransformCode::LogSecondDiff
        )
    }

    /// Short description, as used in reports
    pub fn as_str(&self) -> &'static str {
        match self {
            TransformCode::Level => "level",
            TransformCode::Diff => "diff",
            TransformCode::SecondDiff => "diff2",
            TransformCode::Log => "log",
            TransformCode::LogDiff => "dlog",
            TransformCode::LogSecondDiff => "d2log",
            TransformCode::PctChangeDiff => "dpct",
        }
    }
}

impl TryFrom<i64> for TransformCode {
    type Error = DfmError;

    fn try_from(code: i64) -> Result<Self> {
        match code {
            1 => Ok(TransformCode::Level),
            2 => Ok(TransformCode::Diff),
            3 => Ok(TransformCode::SecondDiff),
            4 => Ok(TransformCode::Log),
            5 => Ok(TransformCode::LogDiff),
            6 => Ok(TransformCode::LogSecondDiff),
            7 => Ok(TransformCode::PctChangeDiff),
            other => Err(DfmError::invalid_code(other)),
        }
    }
}

impl From<TransformCode> for i64 {
    fn from(code: TransformCode) -> Self {
        code.code() as i64
    }
}

impl fmt::Display for TransformCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
