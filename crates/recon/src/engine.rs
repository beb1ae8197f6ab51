use serde::Serialize;

use crate::config::{FeedSchema, SyncConfig};
use crate::dedup::dedup;
use crate::index::FeedIndex;
use crate::matcher::{newly_visible, removed_or_changed};
use crate::model::{ChangeRecord, ReconMeta, ReconResult, Row};
use crate::order::sort_by_parent;
use crate::project::{project, ProjectedView};
use crate::summary::compute_summary;

/// Compare `incoming` (new upstream state) against `master` (last synced
/// state). Walks master, then incoming, then collapses repeats.
pub fn reconcile(incoming: &[Row], master: &[Row], schema: &FeedSchema) -> Vec<ChangeRecord> {
    let incoming_index = FeedIndex::build(incoming, schema);
    let master_index = FeedIndex::build(master, schema);

    let mut records = removed_or_changed(master, &incoming_index, schema);
    let from_master = records.len();
    records.extend(newly_visible(incoming, &master_index, schema));

    log::info!(
        "reconciled {} incoming / {} master row(s): {} from master walk, {} from incoming walk",
        incoming.len(),
        master.len(),
        from_master,
        records.len() - from_master
    );

    dedup(records, schema)
}

/// Run reconciliation. Returns records + summary.
pub fn run(incoming: &[Row], master: &[Row], schema: &FeedSchema) -> ReconResult {
    let records = reconcile(incoming, master, schema);
    let summary = compute_summary(&records, schema);

    ReconResult {
        meta: ReconMeta {
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            incoming_rows: incoming.len(),
            master_rows: master.len(),
        },
        summary,
        records,
    }
}

/// The two export views of one run, each projected and sorted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadViews {
    pub product: ProjectedView,
    pub metafield: ProjectedView,
}

impl UploadViews {
    pub fn iter(&self) -> impl Iterator<Item = &ProjectedView> {
        [&self.product, &self.metafield].into_iter()
    }
}

pub fn build_views(records: &[ChangeRecord], config: &SyncConfig) -> UploadViews {
    let parent = &config.schema.parent_key;

    let mut product = project(records, "product", &config.views.product);
    sort_by_parent(&mut product, parent);

    let mut metafield = project(records, "metafield", &config.views.metafield);
    sort_by_parent(&mut metafield, parent);

    UploadViews { product, metafield }
}
