//! Panel preparation for factor extraction: transform, balance, standardize

use crate::error::Result;
use crate::panel::Panel;
use crate::preprocessing::balance::{BalanceDiagnostics, BalanceMode, PanelBalancer};
use crate::transform::panel::transform_panel;
use crate::transform::standardize::{ColumnMoments, Standardizer};
use crate::transform::tcode::{TransformCodeMap, LEADS_LOST};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Options for [`prepare_panel_for_factors`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrepareOptions {
    pub balance: BalanceMode,
    pub standardize: bool,
    /// Degrees-of-freedom correction for the deviation
    pub ddof: usize,
}

impl Default for PrepareOptions {
    fn default() -> Self {
        Self {
            balance: BalanceMode::Initial,
            standardize: true,
            ddof: 0,
        }
    }
}

/// What the preparation did
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrepareInfo {
    #[serde(flatten)]
    pub balance: BalanceDiagnostics,
    pub standardized: bool,
    /// Per-series mean and deviation, present when standardized
    pub moments: Option<Vec<ColumnMoments>>,
    pub leads_lost_by_tcode: BTreeMap<u8, usize>,
}

/// Transform by code, balance, then optionally z-score.
///
/// `BalanceMode::None` suits estimators that handle missing data themselves;
/// principal components need `Initial` or `All`.
pub fn prepare_panel_for_factors(
    panel: &Panel,
    codes: &TransformCodeMap,
    options: &PrepareOptions,
) -> Result<(Panel, PrepareInfo)> {
    let transformed = transform_panel(panel, codes)?;
    let (balanced, diagnostics) = PanelBalancer::new(options.balance).balance(&transformed);

    let (out, moments) = if options.standardize {
        let standardization = Standardizer::new(options.ddof).standardize(&balanced)?;
        (standardization.panel, Some(standardization.moments))
    } else {
        (balanced, None)
    };

    let info = PrepareInfo {
        balance: diagnostics,
        standardized: options.standardize,
        moments,
        leads_lost_by_tcode: LEADS_LOST.iter().copied().collect(),
    };
    Ok((out, info))
}
