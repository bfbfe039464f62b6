//! Policy rules evaluated against every request
//!
//! The rule set is a closed, ordered list. Every rule always runs; outputs are
//! collected into a [`PolicyEvaluation`] that the service turns into
//! modifications.

use super::phi::detect_phi_fields;
use crate::config::ComplianceConfig;
use crate::domain::DataAccessRequest;
use std::collections::BTreeSet;

/// Named policy rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyRule {
    /// Safe Harbor PHI detection over requested fields
    SafeHarbor,
    /// Row-level versus aggregate granularity
    RowLevel,
    /// Minimum aggregate cell size
    CellSize,
}

/// Output of a single rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    PhiFields(BTreeSet<String>),
    RowLevelAllowed(bool),
    MinimumCellSize(u32),
}

impl PolicyRule {
    /// All rules in evaluation order
    pub const ALL: [PolicyRule; 3] = [Self::SafeHarbor, Self::RowLevel, Self::CellSize];

    /// Rule name as it appears in logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::SafeHarbor => "safe_harbor",
            Self::RowLevel => "row_level",
            Self::CellSize => "cell_size",
        }
    }

    /// Evaluates this rule; pure in `(request, config)`
    pub fn evaluate(&self, request: &DataAccessRequest, config: &ComplianceConfig) -> RuleOutcome {
        match self {
            Self::SafeHarbor => {
                RuleOutcome::PhiFields(detect_phi_fields(&request.data_requested().fields))
            }
            Self::RowLevel => {
                RuleOutcome::RowLevelAllowed(!config.hipaa_compliant || config.allow_row_level_data)
            }
            Self::CellSize => RuleOutcome::MinimumCellSize(if config.hipaa_compliant {
                config.minimum_cell_size
            } else {
                0
            }),
        }
    }
}

/// Combined result of all rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyEvaluation {
    /// Requested fields flagged as PHI
    pub phi_fields: BTreeSet<String>,
    /// Whether row-level results may be returned
    pub row_level_allowed: bool,
    /// Suppression threshold for aggregate cells; 0 disables suppression
    pub minimum_cell_size: u32,
}

impl Default for PolicyEvaluation {
    fn default() -> Self {
        Self {
            phi_fields: BTreeSet::new(),
            row_level_allowed: true,
            minimum_cell_size: 0,
        }
    }
}

impl PolicyEvaluation {
    /// Whether the request is served at row level after applying the policy
    pub fn effective_row_level(&self, request: &DataAccessRequest) -> bool {
        request.data_requested().row_level && self.row_level_allowed
    }
}

/// Stateless evaluator over [`PolicyRule::ALL`]
#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyEngine;

impl PolicyEngine {
    pub fn new() -> Self {
        Self
    }

    /// Runs every rule in order and folds the outcomes
    pub fn evaluate(&self, request: &DataAccessRequest, config: &ComplianceConfig) -> PolicyEvaluation {
        PolicyRule::ALL
            .iter()
            .fold(PolicyEvaluation::default(), |mut evaluation, rule| {
                let outcome = rule.evaluate(request, config);
                tracing::trace!(rule = rule.name(), outcome = ?outcome, "Policy rule evaluated");
                match outcome {
                    RuleOutcome::PhiFields(fields) => evaluation.phi_fields = fields,
                    RuleOutcome::RowLevelAllowed(allowed) => evaluation.row_level_allowed = allowed,
                    RuleOutcome::MinimumCellSize(size) => evaluation.minimum_cell_size = size,
                }
                evaluation
            })
    }
}
