//! Portfolio store backed by a single JSON document.
//!
//! The file holds every saved portfolio keyed by name. Writes go to a
//! sibling temporary file first and are renamed into place.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::error::AnalyzerError;
use crate::domain::portfolio::Portfolio;
use crate::ports::portfolio_store_port::PortfolioStorePort;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    portfolios: BTreeMap<String, Portfolio>,
}

pub struct JsonStoreAdapter {
    path: PathBuf,
}

impl JsonStoreAdapter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<StoreDocument, AnalyzerError> {
        if !self.path.exists() {
            return Ok(StoreDocument::default());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(StoreDocument::default());
        }
        serde_json::from_str(&content).map_err(|e| AnalyzerError::Store {
            reason: format!("corrupt store {}: {}", self.path.display(), e),
        })
    }

    fn write(&self, doc: &StoreDocument) -> Result<(), AnalyzerError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(doc).map_err(|e| AnalyzerError::Store {
            reason: format!("failed to serialize store: {}", e),
        })?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl PortfolioStorePort for JsonStoreAdapter {
    fn save(&self, name: &str, portfolio: &Portfolio) -> Result<(), AnalyzerError> {
        let mut doc = self.read()?;
        doc.portfolios.insert(name.to_string(), portfolio.clone());
        self.write(&doc)
    }

    fn load(&self, name: &str) -> Result<Option<Portfolio>, AnalyzerError> {
        Ok(self.read()?.portfolios.remove(name))
    }

    fn list(&self) -> Result<Vec<String>, AnalyzerError> {
        Ok(self.read()?.portfolios.into_keys().collect())
    }

    fn delete(&self, name: &str) -> Result<bool, AnalyzerError> {
        let mut doc = self.read()?;
        if doc.portfolios.remove(name).is_none() {
            return Ok(false);
        }
        self.write(&doc)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::returns::{AssetReturns, ReturnKind, ReturnSeries};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn portfolio(name: &str) -> Portfolio {
        let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let dates: Vec<NaiveDate> = (0..3).map(|i| start + chrono::Duration::days(i)).collect();
        let series = ReturnSeries::new(ReturnKind::Simple, dates.clone(), vec![0.01, -0.5, 0.25]).unwrap();
        let assets = AssetReturns {
            dates,
            tickers: vec!["SPY".into()],
            series: vec![series],
        };
        Portfolio::equal_weighted(name, assets).unwrap()
    }

    #[test]
    fn missing_file_is_empty_store() {
        let dir = TempDir::new().unwrap();
        let store = JsonStoreAdapter::new(dir.path().join("none.json"));
        assert!(store.list().unwrap().is_empty());
        assert!(store.load("x").unwrap().is_none());
        assert!(!store.delete("x").unwrap());
    }

    #[test]
    fn save_load_list_delete() {
        let dir = TempDir::new().unwrap();
        let store = JsonStoreAdapter::new(dir.path().join("nested/store.json"));

        store.save("beta", &portfolio("beta")).unwrap();
        store.save("alpha", &portfolio("alpha")).unwrap();
        assert_eq!(store.list().unwrap(), vec!["alpha", "beta"]);

        let loaded = store.load("alpha").unwrap().unwrap();
        assert_eq!(loaded.name, "alpha");
        assert_eq!(loaded.tickers, vec!["SPY"]);
        assert_eq!(loaded.returns.values(), &[0.01, -0.5, 0.25]);

        assert!(store.delete("alpha").unwrap());
        assert_eq!(store.list().unwrap(), vec!["beta"]);
    }

    #[test]
    fn save_replaces_existing() {
        let dir = TempDir::new().unwrap();
        let store = JsonStoreAdapter::new(dir.path().join("store.json"));
        store.save("p", &portfolio("first")).unwrap();
        store.save("p", &portfolio("second")).unwrap();
        assert_eq!(store.list().unwrap().len(), 1);
        assert_eq!(store.load("p").unwrap().unwrap().name, "second");
    }

    #[test]
    fn corrupt_file_is_store_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "{ not json").unwrap();
        let store = JsonStoreAdapter::new(path);
        assert!(matches!(store.list(), Err(AnalyzerError::Store { .. })));
    }
}
