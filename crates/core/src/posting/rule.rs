//! Posting rules and their condition predicates.
//!
//! Conditions are stored as an exact-match map of field to expected value
//! and evaluated as a list of tagged predicates.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use costledger_shared::types::{PostingRuleId, TenantId};
use serde::{Deserialize, Serialize};

use super::error::PostingError;

/// Inventory business events that produce journal entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum InventoryEventType {
    /// Goods received.
    #[serde(rename = "inventory_receipt")]
    Receipt,
    /// Goods issued.
    #[serde(rename = "inventory_issue")]
    Issue,
    /// Stock count adjustment.
    #[serde(rename = "inventory_adjustment")]
    Adjustment,
    /// Unit cost change.
    #[serde(rename = "inventory_revaluation")]
    Revaluation,
    /// Stock written off.
    #[serde(rename = "inventory_writeoff")]
    Writeoff,
    /// Stock moved between warehouses.
    #[serde(rename = "inventory_transfer")]
    Transfer,
}

impl InventoryEventType {
    /// Returns the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Receipt => "inventory_receipt",
            Self::Issue => "inventory_issue",
            Self::Adjustment => "inventory_adjustment",
            Self::Revaluation => "inventory_revaluation",
            Self::Writeoff => "inventory_writeoff",
            Self::Transfer => "inventory_transfer",
        }
    }
}

impl std::fmt::Display for InventoryEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scalar value in rule conditions and transaction context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Boolean flag.
    Flag(bool),
    /// Whole number.
    Integer(i64),
    /// Text.
    Text(String),
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

/// Context fields of a transaction used for condition matching.
pub type ContextFields = BTreeMap<String, FieldValue>;

/// A single condition on the transaction context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// The field must be present and equal to the value.
    Equals {
        /// Context field name.
        field: String,
        /// Expected value.
        value: FieldValue,
    },
}

impl Predicate {
    /// Evaluates the predicate against the context.
    #[must_use]
    pub fn matches(&self, context: &ContextFields) -> bool {
        match self {
            Self::Equals { field, value } => context.get(field) == Some(value),
        }
    }
}

/// Conjunction of predicates. Empty conditions match every context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, FieldValue>", into = "BTreeMap<String, FieldValue>")]
pub struct RuleConditions(Vec<Predicate>);

impl RuleConditions {
    /// Conditions that match everything.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Adds an equality condition.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.0.push(Predicate::Equals {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    /// True if every predicate holds.
    #[must_use]
    pub fn matches(&self, context: &ContextFields) -> bool {
        self.0.iter().all(|p| p.matches(context))
    }

    /// Number of predicates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if there are no predicates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeMap<String, FieldValue>> for RuleConditions {
    fn from(map: BTreeMap<String, FieldValue>) -> Self {
        Self(
            map.into_iter()
                .map(|(field, value)| Predicate::Equals { field, value })
                .collect(),
        )
    }
}

impl From<RuleConditions> for BTreeMap<String, FieldValue> {
    fn from(conditions: RuleConditions) -> Self {
        conditions
            .0
            .into_iter()
            .map(|p| match p {
                Predicate::Equals { field, value } => (field, value),
            })
            .collect()
    }
}

/// Configuration mapping an inventory event to a debit/credit account pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingRule {
    /// Rule ID.
    pub id: PostingRuleId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Human-readable name.
    pub name: String,
    /// Event the rule applies to.
    pub event_type: InventoryEventType,
    /// Exact-match conditions on the transaction context.
    #[serde(default)]
    pub conditions: RuleConditions,
    /// Account name debited.
    pub debit_account: String,
    /// Account name credited.
    pub credit_account: String,
    /// Lower value wins.
    pub priority: i16,
    /// First day the rule applies.
    pub valid_from: NaiveDate,
    /// Last day the rule applies (inclusive, None = open-ended).
    #[serde(default)]
    pub valid_to: Option<NaiveDate>,
    /// Inactive rules never match.
    pub is_active: bool,
    /// Incremented on every configuration change.
    #[serde(default = "initial_version")]
    pub version: u32,
    /// Creation timestamp, used to break priority ties.
    pub created_at: DateTime<Utc>,
}

const fn initial_version() -> u32 {
    1
}

impl PostingRule {
    /// True if the rule is within its validity window on `date`.
    #[must_use]
    pub fn is_valid_on(&self, date: NaiveDate) -> bool {
        self.valid_from <= date && self.valid_to.is_none_or(|to| date <= to)
    }

    /// True if the rule applies to the event on `date` with the given context.
    #[must_use]
    pub fn applies_to(
        &self,
        event_type: InventoryEventType,
        context: &ContextFields,
        date: NaiveDate,
    ) -> bool {
        self.is_active
            && self.event_type == event_type
            && self.is_valid_on(date)
            && self.conditions.matches(context)
    }

    /// Checks the rule configuration.
    pub fn validate(&self) -> Result<(), PostingError> {
        if self.debit_account.trim().is_empty() || self.credit_account.trim().is_empty() {
            return Err(PostingError::InvalidRule(format!(
                "rule '{}' must name both accounts",
                self.name
            )));
        }
        if self.debit_account == self.credit_account
            && self.event_type != InventoryEventType::Transfer
        {
            return Err(PostingError::InvalidRule(format!(
                "rule '{}' debits and credits the same account",
                self.name
            )));
        }
        if self.valid_to.is_some_and(|to| to < self.valid_from) {
            return Err(PostingError::InvalidRule(format!(
                "rule '{}' ends before it starts",
                self.name
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(pairs: &[(&str, FieldValue)]) -> ContextFields {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    fn rule() -> PostingRule {
        PostingRule {
            id: PostingRuleId::new(),
            tenant_id: TenantId::new(),
            name: "Damaged write-off".to_string(),
            event_type: InventoryEventType::Writeoff,
            conditions: RuleConditions::any().with("reason", "damaged"),
            debit_account: "Inventory Write-off".to_string(),
            credit_account: "Inventory".to_string(),
            priority: 1,
            valid_from: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            valid_to: Some(NaiveDate::from_ymd_opt(2026, 12, 31).unwrap()),
            is_active: true,
            version: 1,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_conditions_are_exact_subset_match() {
        let conditions = RuleConditions::any()
            .with("reason", "damaged")
            .with("insured", true);

        assert!(conditions.matches(&context(&[
            ("reason", "damaged".into()),
            ("insured", true.into()),
            ("extra", 3i64.into()),
        ])));
        assert!(!conditions.matches(&context(&[("reason", "damaged".into())])));
        assert!(!conditions.matches(&context(&[
            ("reason", "damaged".into()),
            ("insured", "true".into()),
        ])));
    }

    #[test]
    fn test_empty_conditions_match_everything() {
        assert!(RuleConditions::any().matches(&ContextFields::new()));
    }

    #[test]
    fn test_conditions_serde_as_map() {
        let conditions: RuleConditions =
            serde_json::from_str(r#"{"adjustment_type":"positive","count":2,"urgent":false}"#)
                .unwrap();
        assert_eq!(conditions.len(), 3);
        assert!(conditions.matches(&context(&[
            ("adjustment_type", "positive".into()),
            ("count", 2i64.into()),
            ("urgent", false.into()),
        ])));

        let json = serde_json::to_value(&conditions).unwrap();
        assert_eq!(json["adjustment_type"], "positive");
        assert_eq!(json["count"], 2);
    }

    #[test]
    fn test_event_type_serde() {
        let json = serde_json::to_string(&InventoryEventType::Writeoff).unwrap();
        assert_eq!(json, "\"inventory_writeoff\"");
        let parsed: InventoryEventType = serde_json::from_str("\"inventory_receipt\"").unwrap();
        assert_eq!(parsed, InventoryEventType::Receipt);
    }

    #[test]
    fn test_validity_window_is_inclusive() {
        let rule = rule();
        assert!(rule.is_valid_on(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()));
        assert!(rule.is_valid_on(NaiveDate::from_ymd_opt(2026, 12, 31).unwrap()));
        assert!(!rule.is_valid_on(NaiveDate::from_ymd_opt(2027, 1, 1).unwrap()));
        assert!(!rule.is_valid_on(NaiveDate::from_ymd_opt(2025, 12, 31).unwrap()));
    }

    #[test]
    fn test_inactive_rule_never_applies() {
        let mut rule = rule();
        let ctx = context(&[("reason", "damaged".into())]);
        let on = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        assert!(rule.applies_to(InventoryEventType::Writeoff, &ctx, on));
        assert!(!rule.applies_to(InventoryEventType::Issue, &ctx, on));

        rule.is_active = false;
        assert!(!rule.applies_to(InventoryEventType::Writeoff, &ctx, on));
    }

    #[test]
    fn test_validate_rejects_bad_configuration() {
        let mut same = rule();
        same.credit_account = same.debit_account.clone();
        assert!(matches!(same.validate(), Err(PostingError::InvalidRule(_))));
        same.event_type = InventoryEventType::Transfer;
        assert!(same.validate().is_ok());

        let mut backwards = rule();
        backwards.valid_to = Some(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert!(matches!(backwards.validate(), Err(PostingError::InvalidRule(_))));

        assert!(rule().validate().is_ok());
    }
}
