//! Terminal report rendering

use std::fmt::Write;

use crate::reconcile::VersionRecord;
use crate::version::VersionStatus;

/// Keep only the rows whose installed version lags upstream.
pub fn only_outdated(records: &[VersionRecord]) -> Vec<VersionRecord> {
    records
        .iter()
        .filter(|r| r.status == VersionStatus::Outdated)
        .cloned()
        .collect()
}

/// Render records as a width-aligned text table.
///
/// Columns are sized to their widest cell so the status column lines up
/// regardless of version string lengths.
pub fn render_table(records: &[VersionRecord]) -> String {
    let installed = |r: &VersionRecord| r.installed_version.clone().unwrap_or_default();
    let latest = |r: &VersionRecord| r.latest_version.clone().unwrap_or_default();

    let component_width = column_width("Component", records.iter().map(|r| r.component.len()));
    let installed_width = column_width("Installed", records.iter().map(|r| installed(r).len()));
    let latest_width = column_width("Latest", records.iter().map(|r| latest(r).len()));

    let mut out = String::new();
    let header = format!(
        "{:<component_width$}  {:<installed_width$}  {:<latest_width$}  {}",
        "Component", "Installed", "Latest", "Status"
    );
    writeln!(out, "{header}").expect("writing to String cannot fail");
    writeln!(out, "{}", "-".repeat(header.len())).expect("writing to String cannot fail");
    for record in records {
        writeln!(
            out,
            "{:<component_width$}  {:<installed_width$}  {:<latest_width$}  {}",
            record.component,
            installed(record),
            latest(record),
            record.status
        )
        .expect("writing to String cannot fail");
    }
    out
}

fn column_width(header: &str, cells: impl Iterator<Item = usize>) -> usize {
    cells.fold(header.len(), usize::max)
}
