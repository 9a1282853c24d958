//! Inventory costing methods.

use serde::{Deserialize, Serialize};

/// Method used to cost inventory issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostingMethod {
    /// First in, first out: oldest layers are consumed first.
    #[default]
    Fifo,
    /// Last in, first out: newest layers are consumed first.
    Lifo,
    /// Moving weighted average across all open layers.
    WeightedAverage,
}

impl CostingMethod {
    /// Returns the string representation of the method.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fifo => "fifo",
            Self::Lifo => "lifo",
            Self::WeightedAverage => "weighted_average",
        }
    }
}

impl std::fmt::Display for CostingMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CostingMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fifo" => Ok(Self::Fifo),
            "lifo" => Ok(Self::Lifo),
            "weighted_average" | "average" | "wac" => Ok(Self::WeightedAverage),
            _ => Err(format!("Unknown costing method: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_costing_method_display() {
        assert_eq!(CostingMethod::Fifo.to_string(), "fifo");
        assert_eq!(CostingMethod::Lifo.to_string(), "lifo");
        assert_eq!(CostingMethod::WeightedAverage.to_string(), "weighted_average");
    }

    #[test]
    fn test_costing_method_from_str() {
        assert_eq!(CostingMethod::from_str("FIFO").unwrap(), CostingMethod::Fifo);
        assert_eq!(CostingMethod::from_str("lifo").unwrap(), CostingMethod::Lifo);
        assert_eq!(
            CostingMethod::from_str("average").unwrap(),
            CostingMethod::WeightedAverage
        );
        assert!(CostingMethod::from_str("hifo").is_err());
    }

    #[test]
    fn test_costing_method_serde() {
        let json = serde_json::to_string(&CostingMethod::WeightedAverage).unwrap();
        assert_eq!(json, "\"weighted_average\"");
        let parsed: CostingMethod = serde_json::from_str("\"lifo\"").unwrap();
        assert_eq!(parsed, CostingMethod::Lifo);
    }

    #[test]
    fn test_default_is_fifo() {
        assert_eq!(CostingMethod::default(), CostingMethod::Fifo);
    }
}
