//! Named portfolio persistence port.

use crate::domain::error::AnalyzerError;
use crate::domain::portfolio::Portfolio;

pub trait PortfolioStorePort {
    /// Insert or replace the portfolio stored under `name`.
    fn save(&self, name: &str, portfolio: &Portfolio) -> Result<(), AnalyzerError>;

    fn load(&self, name: &str) -> Result<Option<Portfolio>, AnalyzerError>;

    /// Stored names, sorted.
    fn list(&self) -> Result<Vec<String>, AnalyzerError>;

    /// Returns whether anything was deleted.
    fn delete(&self, name: &str) -> Result<bool, AnalyzerError>;
}
