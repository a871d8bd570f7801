//! FRED-MD economic categories (McCracken and Ng, 2016)

use crate::error::{DfmError, Result};
use crate::panel::Panel;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the eight FRED-MD series groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SeriesGroup {
    OutputIncome,
    LaborMarket,
    ConsumptionOrders,
    OrdersInventories,
    MoneyCredit,
    RatesExchange,
    Prices,
    StockMarket,
}

impl SeriesGroup {
    pub const ALL: [SeriesGroup; 8] = [
        SeriesGroup::OutputIncome,
        SeriesGroup::LaborMarket,
        SeriesGroup::ConsumptionOrders,
        SeriesGroup::OrdersInventories,
        SeriesGroup::MoneyCredit,
        SeriesGroup::RatesExchange,
        SeriesGroup::Prices,
        SeriesGroup::StockMarket,
    ];

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            SeriesGroup::OutputIncome => "Output and Income",
            SeriesGroup::LaborMarket => "Labor Market",
            SeriesGroup::ConsumptionOrders => "Consumption and Orders",
            SeriesGroup::OrdersInventories => "Orders and Inventories",
            SeriesGroup::MoneyCredit => "Money and Credit",
            SeriesGroup::RatesExchange => "Interest Rate and Exchange Rates",
            SeriesGroup::Prices => "Prices",
            SeriesGroup::StockMarket => "Stock Market",
        }
    }

    /// 1-based group number
    pub fn number(&self) -> u8 {
        SeriesGroup::ALL
            .iter()
            .position(|g| g == self)
            .map_or(0, |i| i as u8 + 1)
    }
}

impl fmt::Display for SeriesGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SeriesGroup {
    type Err = DfmError;

    /// Accepts the label (case-insensitive), the variant name or the group number
    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        SeriesGroup::ALL
            .iter()
            .copied()
            .find(|g| {
                g.label().eq_ignore_ascii_case(wanted)
                    || format!("{:?}", g).eq_ignore_ascii_case(wanted)
                    || g.number().to_string() == wanted
            })
            .ok_or_else(|| DfmError::InvalidParameter {
                name: "group",
                value: wanted.to_string(),
                expected: "a FRED-MD group label or number 1-8",
            })
    }
}

/// Series mnemonic -> group
pub static SERIES_GROUPS: &[(&str, SeriesGroup)] = &[
    ("RPI", SeriesGroup::OutputIncome),
    ("W875RX1", SeriesGroup::OutputIncome),
    ("INDPRO", SeriesGroup::OutputIncome),
    ("IPFPNSS", SeriesGroup::OutputIncome),
    ("IPFINAL", SeriesGroup::OutputIncome),
    ("IPCONGD", SeriesGroup::OutputIncome),
    ("IPDCONGD", SeriesGroup::OutputIncome),
    ("IPNCONGD", SeriesGroup::OutputIncome),
    ("IPBUSEQ", SeriesGroup::OutputIncome),
    ("IPMAT", SeriesGroup::OutputIncome),
    ("IPDMAT", SeriesGroup::OutputIncome),
    ("IPNMAT", SeriesGroup::OutputIncome),
    ("IPMANSICS", SeriesGroup::OutputIncome),
    ("IPB51222S", SeriesGroup::OutputIncome),
    ("IPFUELS", SeriesGroup::OutputIncome),
    ("NAPMPI", SeriesGroup::OutputIncome),
    ("CUMFNS", SeriesGroup::OutputIncome),
    ("HWI", SeriesGroup::LaborMarket),
    ("HWIURATIO", SeriesGroup::LaborMarket),
    ("CLF16OV", SeriesGroup::LaborMarket),
    ("CE16OV", SeriesGroup::LaborMarket),
    ("UNRATE", SeriesGroup::LaborMarket),
    ("UEMPMEAN", SeriesGroup::LaborMarket),
    ("UEMPLT5", SeriesGroup::LaborMarket),
    ("UEMP5TO14", SeriesGroup::LaborMarket),
    ("UEMP15OV", SeriesGroup::LaborMarket),
    ("UEMP15T26", SeriesGroup::LaborMarket),
    ("UEMP27OV", SeriesGroup::LaborMarket),
    ("CLAIMSx", SeriesGroup::LaborMarket),
    ("PAYEMS", SeriesGroup::LaborMarket),
    ("USGOOD", SeriesGroup::LaborMarket),
    ("CES1021000001", SeriesGroup::LaborMarket),
    ("USCONS", SeriesGroup::LaborMarket),
    ("MANEMP", SeriesGroup::LaborMarket),
    ("DMANEMP", SeriesGroup::LaborMarket),
    ("NDMANEMP", SeriesGroup::LaborMarket),
    ("SRVPRD", SeriesGroup::LaborMarket),
    ("USTPU", SeriesGroup::LaborMarket),
    ("USWTRADE", SeriesGroup::LaborMarket),
    ("USTRADE", SeriesGroup::LaborMarket),
    ("USFIRE", SeriesGroup::LaborMarket),
    ("USGOVT", SeriesGroup::LaborMarket),
    ("CES0600000007", SeriesGroup::LaborMarket),
    ("AWOTMAN", SeriesGroup::LaborMarket),
    ("AWHMAN", SeriesGroup::LaborMarket),
    ("NAPMEI", SeriesGroup::LaborMarket),
    ("CES0600000008", SeriesGroup::LaborMarket),
    ("CES2000000008", SeriesGroup::LaborMarket),
    ("CES3000000008", SeriesGroup::LaborMarket),
    ("HOUST", SeriesGroup::ConsumptionOrders),
    ("HOUSTNE", SeriesGroup::ConsumptionOrders),
    ("HOUSTMW", SeriesGroup::ConsumptionOrders),
    ("HOUSTS", SeriesGroup::ConsumptionOrders),
    ("HOUSTW", SeriesGroup::ConsumptionOrders),
    ("PERMIT", SeriesGroup::ConsumptionOrders),
    ("PERMITNE", SeriesGroup::ConsumptionOrders),
    ("PERMITMW", SeriesGroup::ConsumptionOrders),
    ("PERMITS", SeriesGroup::ConsumptionOrders),
    ("PERMITW", SeriesGroup::ConsumptionOrders),
    ("DPCERA3M086SBEA", SeriesGroup::OrdersInventories),
    ("CMRMTSPLx", SeriesGroup::OrdersInventories),
    ("RETAILx", SeriesGroup::OrdersInventories),
    ("NAPM", SeriesGroup::OrdersInventories),
    ("NAPMNOI", SeriesGroup::OrdersInventories),
    ("NAPMSDI", SeriesGroup::OrdersInventories),
    ("NAPMII", SeriesGroup::OrdersInventories),
    ("ACOGNO", SeriesGroup::OrdersInventories),
    ("AMDMNOx", SeriesGroup::OrdersInventories),
    ("ANDENOx", SeriesGroup::OrdersInventories),
    ("AMDMUOx", SeriesGroup::OrdersInventories),
    ("BUSINVx", SeriesGroup::OrdersInventories),
    ("ISRATIOx", SeriesGroup::OrdersInventories),
    ("UMCSENTx", SeriesGroup::OrdersInventories),
    ("M1SL", SeriesGroup::MoneyCredit),
    ("M2SL", SeriesGroup::MoneyCredit),
    ("M2REAL", SeriesGroup::MoneyCredit),
    ("AMBSL", SeriesGroup::MoneyCredit),
    ("TOTRESNS", SeriesGroup::MoneyCredit),
    ("NONBORRES", SeriesGroup::MoneyCredit),
    ("BUSLOANS", SeriesGroup::MoneyCredit),
    ("REALLN", SeriesGroup::MoneyCredit),
    ("NONREVSL", SeriesGroup::MoneyCredit),
    ("CONSPI", SeriesGroup::MoneyCredit),
    ("MZMSL", SeriesGroup::MoneyCredit),
    ("DTCOLNVHFNM", SeriesGroup::MoneyCredit),
    ("DTCTHFNM", SeriesGroup::MoneyCredit),
    ("INVEST", SeriesGroup::MoneyCredit),
    ("BOGMBASE", SeriesGroup::MoneyCredit),
    ("FEDFUNDS", SeriesGroup::RatesExchange),
    ("CP3Mx", SeriesGroup::RatesExchange),
    ("TB3MS", SeriesGroup::RatesExchange),
    ("TB6MS", SeriesGroup::RatesExchange),
    ("GS1", SeriesGroup::RatesExchange),
    ("GS5", SeriesGroup::RatesExchange),
    ("GS10", SeriesGroup::RatesExchange),
    ("AAA", SeriesGroup::RatesExchange),
    ("BAA", SeriesGroup::RatesExchange),
    ("COMPAPFFx", SeriesGroup::RatesExchange),
    ("TB3SMFFM", SeriesGroup::RatesExchange),
    ("TB6SMFFM", SeriesGroup::RatesExchange),
    ("T1YFFM", SeriesGroup::RatesExchange),
    ("T5YFFM", SeriesGroup::RatesExchange),
    ("T10YFFM", SeriesGroup::RatesExchange),
    ("AAAFFM", SeriesGroup::RatesExchange),
    ("BAAFFM", SeriesGroup::RatesExchange),
    ("TWEXMMTH", SeriesGroup::RatesExchange),
    ("EXSZUSx", SeriesGroup::RatesExchange),
    ("EXJPUSx", SeriesGroup::RatesExchange),
    ("EXUSUKx", SeriesGroup::RatesExchange),
    ("EXCAUSx", SeriesGroup::RatesExchange),
    ("TWEXAFEGSMTHx", SeriesGroup::RatesExchange),
    ("PPIIFGS", SeriesGroup::Prices),
    ("PPIFCG", SeriesGroup::Prices),
    ("PPIITM", SeriesGroup::Prices),
    ("PPICRM", SeriesGroup::Prices),
    ("OILPRICEx", SeriesGroup::Prices),
    ("PPICMM", SeriesGroup::Prices),
    ("NAPMPRI", SeriesGroup::Prices),
    ("CPIAUCSL", SeriesGroup::Prices),
    ("CPIAPPSL", SeriesGroup::Prices),
    ("CPITRNSL", SeriesGroup::Prices),
    ("CPIMEDSL", SeriesGroup::Prices),
    ("CUSR0000SAC", SeriesGroup::Prices),
    ("CUSR0000SAD", SeriesGroup::Prices),
    ("CUSR0000SAS", SeriesGroup::Prices),
    ("CPIULFSL", SeriesGroup::Prices),
    ("CUUR0000SA0L2", SeriesGroup::Prices),
    ("CUSR0000SA0L5", SeriesGroup::Prices),
    ("PCEPI", SeriesGroup::Prices),
    ("DDURRG3M086SBEA", SeriesGroup::Prices),
    ("DNDGRG3M086SBEA", SeriesGroup::Prices),
    ("DSERRG3M086SBEA", SeriesGroup::Prices),
    ("CUSR0000SA0L2", SeriesGroup::Prices),
    ("WPSID61", SeriesGroup::Prices),
    ("WPSID62", SeriesGroup::Prices),
    ("WPSFD49502", SeriesGroup::Prices),
    ("WPSFD49207", SeriesGroup::Prices),
    ("S&P 500", SeriesGroup::StockMarket),
    ("S&P: indust", SeriesGroup::StockMarket),
    ("S&P div yield", SeriesGroup::StockMarket),
    ("S&P PE ratio", SeriesGroup::StockMarket),
    ("VIXCLSx", SeriesGroup::StockMarket),
];

/// Group of a series; names cleaned at ingestion (underscores) also match
pub fn group_of(series: &str) -> Option<SeriesGroup> {
    let lookup = |name: &str| {
        SERIES_GROUPS
            .iter()
            .find(|(mnemonic, _)| *mnemonic == name)
            .map(|(_, group)| *group)
    };
    lookup(series).or_else(|| lookup(&series.replace('_', " ")))
}

/// Group of every panel column, in panel order
pub fn assign_groups(panel: &Panel) -> Vec<(String, Option<SeriesGroup>)> {
    panel
        .columns()
        .iter()
        .map(|c| (c.name.clone(), group_of(&c.name)))
        .collect()
}

/// Keep only the columns of one group
pub fn filter_by_group(panel: &Panel, group: SeriesGroup) -> Result<Panel> {
    let names: Vec<String> = assign_groups(panel)
        .into_iter()
        .filter(|(_, g)| *g == Some(group))
        .map(|(name, _)| name)
        .collect();
    panel.select_columns(&names)
}
