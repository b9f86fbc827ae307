//! Human-readable JSON snapshots of a session.
//!
//! The store is the source of truth; exports are copies laid out one file per
//! record:
//!
//! ```text
//! <root>/<session_id>/plan.json
//! <root>/<session_id>/session.json
//! <root>/<session_id>/agents/<agent_id>.json
//! <root>/<session_id>/report.json            (when synthesised)
//! ```
//!
//! Each file is written to a temporary sibling and renamed into place, so a
//! reader never sees a partially written file.

use std::{
    fs,
    path::{Path, PathBuf},
};

use log::debug;
use serde::Serialize;

use crate::{
    error::{CohortError, IoResultExt, Result},
    models::{PlanRecord, SessionRecord, StatusRecord},
    synthesis::SessionReport,
};

/// Directory under the export root that holds archived sessions.
pub const ARCHIVE_DIR: &str = "archive";

/// Everything exported for one session.
#[derive(Debug, Clone, Copy)]
pub struct SessionBundle<'a> {
    pub plan: &'a PlanRecord,
    pub session: &'a SessionRecord,
    pub records: &'a [StatusRecord],
    pub report: Option<&'a SessionReport>,
}

/// Writes session bundles below a root directory.
#[derive(Debug, Clone)]
pub struct RecordExporter {
    root: PathBuf,
}

impl RecordExporter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes the bundle to `<root>/<session_id>/` and returns that directory.
    pub fn export(&self, bundle: &SessionBundle<'_>) -> Result<PathBuf> {
        self.write_bundle(&self.root, bundle)
    }

    /// Writes the bundle to `<root>/archive/<session_id>/`.
    pub fn archive(&self, bundle: &SessionBundle<'_>) -> Result<PathBuf> {
        self.write_bundle(&self.root.join(ARCHIVE_DIR), bundle)
    }

    fn write_bundle(&self, base: &Path, bundle: &SessionBundle<'_>) -> Result<PathBuf> {
        let dir = base.join(path_segment("session_id", &bundle.session.session_id)?);
        debug!("Exporting session {} to {}", bundle.session.session_id, dir.display());

        write_json(&dir.join("plan.json"), bundle.plan)?;
        write_json(&dir.join("session.json"), bundle.session)?;
        let agents = dir.join("agents");
        for record in bundle.records {
            let file = format!("{}.json", path_segment("agent_id", &record.agent_id)?);
            write_json(&agents.join(file), record)?;
        }
        if let Some(report) = bundle.report {
            write_json(&dir.join("report.json"), report)?;
        }

        Ok(dir)
    }
}

/// Serializes `value` as pretty JSON and atomically replaces `path`.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(value)?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path.parent().ok_or_else(|| {
        CohortError::invalid_input("path").with_reason(format!("{} has no parent", path.display()))
    })?;
    fs::create_dir_all(parent).fs_context(parent)?;

    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, contents).fs_context(&tmp_path)?;
    fs::rename(&tmp_path, path).fs_context(path)?;
    Ok(())
}

/// Rejects ids that would escape the export directory.
fn path_segment<'a>(field: &str, id: &'a str) -> Result<&'a str> {
    let valid = !id.is_empty()
        && id != "."
        && id != ".."
        && !id.contains(['/', '\\'])
        && !id.contains('\0');
    if valid {
        Ok(id)
    } else {
        Err(CohortError::invalid_input(field)
            .with_reason(format!("'{id}' cannot be used as a file name")))
    }
}
