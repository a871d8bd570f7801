//! Calendar enforcement, balancing, window selection and variant assembly

pub mod balance;
pub mod factors;
pub mod grid;
pub mod variants;
pub mod window;

pub use balance::{BalanceDiagnostics, BalanceMode, PanelBalancer};
pub use factors::{prepare_panel_for_factors, PrepareInfo, PrepareOptions};
pub use grid::{ensure_monthly, MonthlyGridEnforcer};
pub use variants::{
    ColumnDecision, ColumnRules, DropReason, Variant, VariantBuilder, VariantCatalog, VariantSpec,
};
pub use window::{StartRule, TrainingWindow, WindowSelection};
