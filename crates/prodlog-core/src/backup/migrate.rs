//! Forward-only migration of backup payloads.

use tracing::debug;

use super::envelope::{BackupPayload, BackupV1, BackupV2, DataV2};

/// Bring a payload of any recognised version up to the current one.
///
/// Each pass applies exactly one version step; a current payload comes back
/// unchanged.
pub fn migrate(payload: BackupPayload) -> BackupV2 {
    let mut current = payload;
    loop {
        current = match current {
            BackupPayload::V1(v1) => {
                debug!(from = 1, to = 2, "Migrating backup payload");
                BackupPayload::V2(v1_to_v2(v1))
            }
            BackupPayload::V2(v2) => return v2,
        };
    }
}

/// Version 2 adds the technicians collection, empty for older backups.
fn v1_to_v2(payload: BackupV1) -> BackupV2 {
    BackupV2 {
        schema_version: 2,
        exported_at: payload.exported_at,
        data: DataV2 {
            batch_templates: payload.data.batch_templates,
            production_runs: payload.data.production_runs,
            note_events: payload.data.note_events,
            technicians: Vec::new(),
        },
    }
}
