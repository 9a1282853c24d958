//! Posting rule resolution.
//!
//! The active rule set is an immutable snapshot behind an `Arc`. Resolution
//! clones the `Arc` and evaluates without holding any lock; configuration
//! changes publish a new snapshot.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::NaiveDate;
use costledger_shared::types::{PostingRuleId, TenantId};

use super::error::{NoMatchReason, PostingError};
use super::rule::{ContextFields, InventoryEventType, PostingRule};

#[derive(Debug, Default)]
struct RuleSet {
    version: u64,
    rules: Vec<PostingRule>,
}

/// Resolves inventory events to posting rules.
#[derive(Debug, Default)]
pub struct PostingRuleResolver {
    current: RwLock<Arc<RuleSet>>,
    history: RwLock<Vec<PostingRule>>,
}

impl PostingRuleResolver {
    /// Creates a resolver from an initial rule list.
    pub fn new(rules: Vec<PostingRule>) -> Result<Self, PostingError> {
        for rule in &rules {
            rule.validate()?;
        }
        Ok(Self {
            current: RwLock::new(Arc::new(RuleSet { version: 1, rules })),
            history: RwLock::new(Vec::new()),
        })
    }

    fn snapshot(&self) -> Arc<RuleSet> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Version of the active rule set.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.snapshot().version
    }

    /// Picks the single rule for an event.
    ///
    /// Filters by tenant, event type, active flag and validity on `date`,
    /// then requires every condition to match the context exactly. The
    /// lowest priority wins; ties go to the most recently created rule.
    /// A tie on both is ambiguous and fails.
    pub fn resolve(
        &self,
        tenant_id: TenantId,
        event_type: InventoryEventType,
        context: &ContextFields,
        date: NaiveDate,
    ) -> Result<PostingRule, PostingError> {
        let set = self.snapshot();

        let mut candidates: Vec<&PostingRule> = set
            .rules
            .iter()
            .filter(|r| r.tenant_id == tenant_id && r.applies_to(event_type, context, date))
            .collect();

        candidates.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });

        let Some(best) = candidates.first() else {
            tracing::warn!(%event_type, ?context, "no posting rule matched");
            return Err(PostingError::NoApplicablePostingRule {
                event_type,
                reason: NoMatchReason::NoCandidates,
            });
        };

        if let Some(runner_up) = candidates.get(1)
            && runner_up.priority == best.priority
            && runner_up.created_at == best.created_at
        {
            tracing::warn!(
                %event_type,
                first = %best.id,
                second = %runner_up.id,
                "posting rules tie on priority and creation time"
            );
            return Err(PostingError::NoApplicablePostingRule {
                event_type,
                reason: NoMatchReason::Ambiguous,
            });
        }

        tracing::debug!(%event_type, rule = %best.id, priority = best.priority, "posting rule resolved");
        Ok((*best).clone())
    }

    /// Inserts a rule or replaces the rule with the same ID.
    ///
    /// A replaced rule moves to history and the new one gets its version
    /// plus one. Returns the stored rule.
    pub fn upsert_rule(&self, mut rule: PostingRule) -> Result<PostingRule, PostingError> {
        rule.validate()?;

        let mut current = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let mut rules = current.rules.clone();

        if let Some(existing) = rules.iter_mut().find(|r| r.id == rule.id) {
            rule.version = existing.version + 1;
            let superseded = std::mem::replace(existing, rule.clone());
            self.history
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .push(superseded);
        } else {
            rules.push(rule.clone());
        }

        *current = Arc::new(RuleSet {
            version: current.version + 1,
            rules,
        });
        tracing::info!(rule = %rule.id, version = rule.version, "posting rule updated");
        Ok(rule)
    }

    /// Deactivates a rule. Inactive rules are kept for history.
    pub fn deactivate_rule(&self, id: PostingRuleId) -> Result<PostingRule, PostingError> {
        let mut rule = self
            .snapshot()
            .rules
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(PostingError::RuleNotFound(id))?;
        rule.is_active = false;
        self.upsert_rule(rule)
    }

    /// Current rules of a tenant.
    #[must_use]
    pub fn rules(&self, tenant_id: TenantId) -> Vec<PostingRule> {
        self.snapshot()
            .rules
            .iter()
            .filter(|r| r.tenant_id == tenant_id)
            .cloned()
            .collect()
    }

    /// Superseded versions of a rule, oldest first.
    #[must_use]
    pub fn history(&self, id: PostingRuleId) -> Vec<PostingRule> {
        self.history
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|r| r.id == id)
            .cloned()
            .collect()
    }
}
