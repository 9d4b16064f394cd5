pub mod analysis;
pub mod chart;
pub mod history;
pub mod quote;

pub use analysis::*;
pub use chart::*;
pub use history::*;
pub use quote::*;
