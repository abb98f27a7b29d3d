//! Strategy registry for dynamic strategy loading.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use simlab_core::error::StrategyError;
use simlab_core::traits::{ParamSet, Strategy, StrategyFactory};

use crate::{MaCrossoverConfig, MaCrossoverStrategy, RsiConfig, RsiStrategy};

/// Information about a registered strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyInfo {
    /// Registry key
    pub name: String,
    pub description: String,
    /// Default configuration as JSON
    pub default_config: serde_json::Value,
    /// Names accepted in a parameter set
    pub parameters: Vec<String>,
}

/// Registry of the built-in strategies.
pub struct StrategyRegistry {
    strategies: BTreeMap<String, StrategyInfo>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        let mut strategies = BTreeMap::new();

        strategies.insert(
            "ma_crossover".to_string(),
            StrategyInfo {
                name: "ma_crossover".to_string(),
                description: "Long-only fast/slow moving average crossover".to_string(),
                default_config: serde_json::to_value(MaCrossoverConfig::default()).unwrap_or_default(),
                parameters: MaCrossoverConfig::PARAMS.iter().map(|s| s.to_string()).collect(),
            },
        );

        strategies.insert(
            "rsi".to_string(),
            StrategyInfo {
                name: "rsi".to_string(),
                description: "Trades RSI overbought/oversold reversals".to_string(),
                default_config: serde_json::to_value(RsiConfig::default()).unwrap_or_default(),
                parameters: RsiConfig::PARAMS.iter().map(|s| s.to_string()).collect(),
            },
        );

        Self { strategies }
    }

    /// All strategies, ordered by name.
    pub fn list(&self) -> Vec<&StrategyInfo> {
        self.strategies.values().collect()
    }

    pub fn get(&self, name: &str) -> Option<&StrategyInfo> {
        self.strategies.get(name)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.strategies.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.strategies.keys().map(String::as_str).collect()
    }

    /// Create a strategy from a JSON configuration. Missing fields take defaults.
    pub fn create(&self, name: &str, config: serde_json::Value) -> Result<Box<dyn Strategy>, StrategyError> {
        let invalid = |e: serde_json::Error| StrategyError::InvalidConfig(e.to_string());
        match name {
            "ma_crossover" => {
                let config: MaCrossoverConfig = serde_json::from_value(config).map_err(invalid)?;
                Ok(Box::new(MaCrossoverStrategy::new(config)?))
            }
            "rsi" => {
                let config: RsiConfig = serde_json::from_value(config).map_err(invalid)?;
                Ok(Box::new(RsiStrategy::new(config)?))
            }
            _ => Err(StrategyError::NotFound(name.to_string())),
        }
    }

    pub fn create_default(&self, name: &str) -> Result<Box<dyn Strategy>, StrategyError> {
        let info = self
            .get(name)
            .ok_or_else(|| StrategyError::NotFound(name.to_string()))?;
        self.create(name, info.default_config.clone())
    }

    /// Create a strategy from a numeric parameter set.
    pub fn create_from_params(&self, name: &str, params: &ParamSet) -> Result<Box<dyn Strategy>, StrategyError> {
        build(name, params)
    }

    /// Factory building `name` for each parameter set, for the optimizer.
    pub fn factory(&self, name: &str) -> Result<Box<dyn StrategyFactory>, StrategyError> {
        if !self.exists(name) {
            return Err(StrategyError::NotFound(name.to_string()));
        }
        let name = name.to_string();
        Ok(Box::new(move |params: &ParamSet| build(&name, params)))
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn build(name: &str, params: &ParamSet) -> Result<Box<dyn Strategy>, StrategyError> {
    match name {
        "ma_crossover" => Ok(Box::new(MaCrossoverStrategy::new(MaCrossoverConfig::from_params(params)?)?)),
        "rsi" => Ok(Box::new(RsiStrategy::new(RsiConfig::from_params(params)?)?)),
        _ => Err(StrategyError::NotFound(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_list() {
        let registry = StrategyRegistry::new();
        assert_eq!(registry.list().len(), 2);
        assert_eq!(registry.names(), vec!["ma_crossover", "rsi"]);
    }

    #[test]
    fn test_registry_get() {
        let registry = StrategyRegistry::new();

        assert!(registry.get("ma_crossover").is_some());
        assert!(registry.get("unknown").is_none());
        assert_eq!(registry.get("rsi").unwrap().default_config["period"], 14);
    }

    #[test]
    fn test_create_default() {
        let registry = StrategyRegistry::new();

        let strategy = registry.create_default("ma_crossover").unwrap();
        assert_eq!(strategy.name(), "ma_crossover");
    }

    #[test]
    fn test_create_with_partial_config() {
        let registry = StrategyRegistry::new();

        let config = serde_json::json!({ "fast_period": 5, "slow_period": 10 });
        assert!(registry.create("ma_crossover", config).is_ok());

        let config = serde_json::json!({ "fast_period": 10, "slow_period": 5 });
        assert!(matches!(
            registry.create("ma_crossover", config),
            Err(StrategyError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_create_unknown_strategy() {
        let registry = StrategyRegistry::new();

        assert!(matches!(registry.create_default("unknown"), Err(StrategyError::NotFound(_))));
        assert!(registry.factory("unknown").is_err());
    }

    #[test]
    fn test_factory_builds_fresh_instances() {
        let registry = StrategyRegistry::new();
        let factory = registry.factory("rsi").unwrap();

        let params = ParamSet::from([("period".to_string(), 9.0)]);
        let a = factory.build(&params).unwrap();
        let b = factory.build(&params).unwrap();
        assert_eq!(a.name(), "rsi");
        assert_eq!(b.name(), "rsi");

        let bad = ParamSet::from([("period".to_string(), 0.0)]);
        assert!(factory.build(&bad).is_err());
    }
}
