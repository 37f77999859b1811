//! Schema declaration audit.
//!
//! Every name a schema mentions must resolve to a declared attribute, the
//! calculated and unchangeable sets must not overlap, and uniqueness groups
//! must not repeat. Audits run automatically when a schema is built; the CLI
//! also runs them standalone over exported declarations.

use serde::Serialize;
use std::collections::BTreeSet;

use crate::entity::schema::{EntitySchema, EntitySchemaExport};
use crate::error::{ErrorCode, Result, VetterError};

// ═══════════════════════════════════════════════════════════════════════════════
// Violations
// ═══════════════════════════════════════════════════════════════════════════════

/// One defect found in a schema declaration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditViolation {
    pub code: ErrorCode,
    /// The offending name or group, for display.
    pub subject: String,
    pub message: String,
}

impl AuditViolation {
    fn unknown(set: &str, name: &str) -> Self {
        Self {
            code: ErrorCode::UnknownAttribute,
            subject: name.to_string(),
            message: format!("{set} references undeclared attribute '{name}'"),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Audit
// ═══════════════════════════════════════════════════════════════════════════════

/// Collect every defect in an exported declaration.
pub fn audit_export(export: &EntitySchemaExport) -> Vec<AuditViolation> {
    let mut violations = Vec::new();

    let declared: BTreeSet<&str> = export
        .attributes
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(export.primary_key.as_str()))
        .collect();

    let simple_sets = [
        ("trim", &export.trim),
        ("nullable", &export.nullable),
        ("dates", &export.dates),
        ("calculated", &export.calculated),
        ("unchangeable", &export.unchangeable),
    ];
    for (set, names) in simple_sets {
        for name in names {
            if !declared.contains(name.as_str()) {
                violations.push(AuditViolation::unknown(set, name));
            }
        }
    }

    for group in &export.unique {
        for name in group {
            if !declared.contains(name.as_str()) {
                violations.push(AuditViolation::unknown("unique", name));
            }
        }
    }

    for name in export.json_nested.keys() {
        if !declared.contains(name.as_str()) {
            violations.push(AuditViolation::unknown("json_nested", name));
        }
    }

    // A dotted rule key addresses inside a document column; only its head
    // names an attribute. A leading wildcard addresses everything.
    for field in &export.rule_fields {
        let head = field.split('.').next().unwrap_or(field);
        if head != "*" && !declared.contains(head) {
            violations.push(AuditViolation::unknown("rules", head));
        }
    }

    let overlap: Vec<&String> = export
        .calculated
        .iter()
        .filter(|name| export.unchangeable.contains(name))
        .collect();
    for name in overlap {
        violations.push(AuditViolation {
            code: ErrorCode::OverlappingSets,
            subject: name.clone(),
            message: format!(
                "'{name}' is both calculated and unchangeable; the sets must be disjoint"
            ),
        });
    }

    let mut seen: BTreeSet<Vec<&str>> = BTreeSet::new();
    for group in &export.unique {
        let mut normalized: Vec<&str> = group.iter().map(String::as_str).collect();
        normalized.sort_unstable();
        if !seen.insert(normalized) {
            violations.push(AuditViolation {
                code: ErrorCode::DuplicateUniqueGroup,
                subject: group.join(", "),
                message: format!("duplicate uniqueness group [{}]", group.join(", ")),
            });
        }
    }

    violations
}

impl EntitySchema {
    /// Fail on the first declaration defect.
    pub(crate) fn audit(&self) -> Result<()> {
        match audit_export(&self.export()).into_iter().next() {
            Some(violation) => Err(VetterError::configuration(
                violation.code,
                format!("entity '{}': {}", self.name, violation.message),
            )),
            None => Ok(()),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
