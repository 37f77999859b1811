//! `vetter audit` - schema declaration auditing.

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

use vetter_core::entity::{audit_export, AuditViolation, EntitySchemaExport};

use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct AuditArgs {
    /// Exported schema declaration files (JSON)
    #[arg(required = true)]
    pub schemas: Vec<PathBuf>,
}

#[derive(Serialize)]
struct FileReport {
    file: String,
    entity: String,
    violations: Vec<AuditViolation>,
}

pub fn execute(args: AuditArgs, format: OutputFormat) -> Result<()> {
    let mut reports = Vec::new();

    for path in &args.schemas {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let export: EntitySchemaExport = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse schema in {}", path.display()))?;

        reports.push(FileReport {
            file: path.display().to_string(),
            entity: export.name.clone(),
            violations: audit_export(&export),
        });
    }

    let defects: usize = reports.iter().map(|r| r.violations.len()).sum();

    match format {
        OutputFormat::Json => output::print_item(&reports),
        OutputFormat::Text => {
            for report in &reports {
                if report.violations.is_empty() {
                    output::print_success(&format!("{} ({}): clean", report.file, report.entity));
                    continue;
                }
                output::print_header(&format!("{} ({})", report.file, report.entity));
                for violation in &report.violations {
                    output::print_detail(&format!("{:?}", violation.code), &violation.message);
                }
            }
        }
    }

    if defects > 0 {
        bail!("{} schema defect(s) found", defects);
    }
    Ok(())
}
