//! Strategy selection by configuration.

use crate::{MACrossoverConfig, MACrossoverStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use quant_core::{error::StrategyError, traits::Strategy, traits::StrategyConfig, types::CostModel};

/// Tagged strategy configuration.
///
/// Each variant names one concrete strategy and carries its parameters:
///
/// ```toml
/// [strategy]
/// type = "ma_crossover"
/// fast_period = 10
/// slow_period = 30
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategySpec {
    MaCrossover(MACrossoverConfig),
}

impl StrategySpec {
    /// Registry name of the selected strategy.
    pub fn name(&self) -> &'static str {
        match self {
            StrategySpec::MaCrossover(_) => "ma_crossover",
        }
    }

    /// Validate the strategy parameters.
    pub fn validate(&self) -> Result<(), StrategyError> {
        match self {
            StrategySpec::MaCrossover(config) => config.validate(),
        }
    }

    /// Bars the strategy needs before it can signal.
    pub fn min_bars(&self) -> usize {
        match self {
            StrategySpec::MaCrossover(config) => config.slow_period,
        }
    }

    /// Build the strategy with the given transaction costs.
    pub fn build(&self, costs: CostModel) -> Result<Box<dyn Strategy>, StrategyError> {
        match self {
            StrategySpec::MaCrossover(config) => {
                Ok(Box::new(MACrossoverStrategy::new(config.clone(), costs)?))
            }
        }
    }
}

impl Default for StrategySpec {
    fn default() -> Self {
        StrategySpec::MaCrossover(MACrossoverConfig::default())
    }
}

/// Information about a registered strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyInfo {
    /// Strategy name
    pub name: String,
    /// Strategy description
    pub description: String,
    /// Default configuration as JSON
    pub default_config: serde_json::Value,
}

/// Registry for available strategies.
pub struct StrategyRegistry {
    strategies: BTreeMap<String, StrategyInfo>,
}

impl StrategyRegistry {
    /// Create a new strategy registry with all built-in strategies.
    pub fn new() -> Self {
        let mut strategies = BTreeMap::new();

        strategies.insert(
            "ma_crossover".to_string(),
            StrategyInfo {
                name: "MA Crossover".to_string(),
                description: "Enters on fast/slow moving average golden cross, exits on death cross"
                    .to_string(),
                default_config: serde_json::to_value(StrategySpec::default())
                    .unwrap_or(serde_json::Value::Null),
            },
        );

        Self { strategies }
    }

    /// List all available strategies.
    pub fn list(&self) -> Vec<&StrategyInfo> {
        self.strategies.values().collect()
    }

    /// Get strategy info by name.
    pub fn get(&self, name: &str) -> Option<&StrategyInfo> {
        self.strategies.get(name)
    }

    /// Check if a strategy exists.
    pub fn exists(&self, name: &str) -> bool {
        self.strategies.contains_key(name)
    }

    /// Get all strategy names.
    pub fn names(&self) -> Vec<&String> {
        self.strategies.keys().collect()
    }

    /// Parse a strategy spec from a name and JSON parameters.
    ///
    /// Missing parameters take their defaults.
    pub fn spec(&self, name: &str, params: serde_json::Value) -> Result<StrategySpec, StrategyError> {
        if !self.exists(name) {
            return Err(StrategyError::NotFound(name.to_string()));
        }

        let mut tagged = match params {
            serde_json::Value::Object(map) => map,
            serde_json::Value::Null => serde_json::Map::new(),
            other => {
                return Err(StrategyError::InvalidConfig(format!(
                    "Strategy parameters must be an object, got {}",
                    other
                )))
            }
        };
        tagged.insert("type".into(), serde_json::Value::String(name.to_string()));

        let spec: StrategySpec = serde_json::from_value(serde_json::Value::Object(tagged))
            .map_err(|e| StrategyError::InvalidConfig(e.to_string()))?;
        spec.validate()?;
        Ok(spec)
    }

    /// Create a strategy instance from a name, parameters and costs.
    pub fn create(
        &self,
        name: &str,
        params: serde_json::Value,
        costs: CostModel,
    ) -> Result<Box<dyn Strategy>, StrategyError> {
        self.spec(name, params)?.build(costs)
    }

    /// Create a strategy with default parameters.
    pub fn create_default(
        &self,
        name: &str,
        costs: CostModel,
    ) -> Result<Box<dyn Strategy>, StrategyError> {
        self.create(name, serde_json::Value::Null, costs)
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_list() {
        let registry = StrategyRegistry::new();
        assert_eq!(registry.list().len(), 1);
        assert_eq!(registry.names(), vec!["ma_crossover"]);
    }

    #[test]
    fn test_registry_get() {
        let registry = StrategyRegistry::new();

        assert!(registry.get("ma_crossover").is_some());
        assert!(registry.get("unknown").is_none());
    }

    #[test]
    fn test_create_default() {
        let registry = StrategyRegistry::new();

        let strategy = registry
            .create_default("ma_crossover", CostModel::new(0.001, 0.0005).unwrap())
            .unwrap();
        assert_eq!(strategy.name(), "ma_crossover");
        assert_eq!(strategy.min_bars(), 30);
        assert_eq!(strategy.costs().commission, 0.001);
    }

    #[test]
    fn test_create_with_params() {
        let registry = StrategyRegistry::new();

        let params = serde_json::json!({ "fast_period": 5, "slow_period": 10 });
        let strategy = registry
            .create("ma_crossover", params, CostModel::free())
            .unwrap();
        assert_eq!(strategy.min_bars(), 10);
    }

    #[test]
    fn test_create_rejects_inverted_windows() {
        let registry = StrategyRegistry::new();

        let params = serde_json::json!({ "fast_period": 30, "slow_period": 10 });
        let result = registry.create("ma_crossover", params, CostModel::free());
        assert!(matches!(result, Err(StrategyError::InvalidConfig(_))));
    }

    #[test]
    fn test_create_unknown_strategy() {
        let registry = StrategyRegistry::new();

        let result = registry.create_default("unknown", CostModel::free());
        assert!(matches!(result, Err(StrategyError::NotFound(_))));
    }

    #[test]
    fn test_spec_tagged_round_trip() {
        let json = serde_json::json!({
            "type": "ma_crossover",
            "fast_period": 3,
            "slow_period": 9,
            "ma_type": "exponential"
        });
        let spec: StrategySpec = serde_json::from_value(json).unwrap();
        let StrategySpec::MaCrossover(config) = &spec;
        assert_eq!(config.fast_period, 3);
        assert_eq!(spec.name(), "ma_crossover");
        assert_eq!(spec.min_bars(), 9);
    }
}
