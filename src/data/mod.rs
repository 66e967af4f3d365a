//! Macro panel data structures and stationarity transforms
//!
//! Provides the monthly panel type, FRED-MD transformation codes and a
//! loader for FRED-MD style CSV files.

mod fred_md;
mod panel;
mod transform;

pub use fred_md::{load_fred_md, read_fred_md};
pub use panel::MacroPanel;
pub use transform::{apply_transform, TransformCode, TransformTable, TransformedPanel};
