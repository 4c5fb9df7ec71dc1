use anyhow::bail;

/// One problem found while flattening the API description.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub location: String,
    pub kind: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(
        location: impl Into<String>,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ValidationIssue {
            location: location.into(),
            kind: kind.into(),
            message: message.into(),
        }
    }
}

/// Aggregate collected issues into one fatal startup error.
///
/// A broken API description is never recoverable at runtime; callers are
/// expected to propagate this out of main and abort.
pub fn fail_if_issues(issues: Vec<ValidationIssue>) -> anyhow::Result<()> {
    if issues.is_empty() {
        return Ok(());
    }
    let mut report = format!(
        "API description validation failed, {} issue(s) found:\n",
        issues.len()
    );
    for issue in &issues {
        report.push_str(&format!(
            "[{}] {}: {}\n",
            issue.kind, issue.location, issue.message
        ));
    }
    bail!(report)
}
