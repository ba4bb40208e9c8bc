pub mod exporter;
pub mod flatten;
pub mod metrics;
pub mod reconciler;
pub mod reports;
pub mod store;
pub mod sync;

pub use exporter::{ExportError, SpreadsheetExporter};
pub use flatten::{flatten_process, RegimeContext, TransformError};
pub use metrics::{compute_dashboard_metrics, dashboard_metrics, MetricsCache};
pub use reconciler::{reconcile, reconcile_batch, ReconcileOutcome, RunCounters};
pub use store::{ProcessFilter, Store};
pub use sync::{SyncError, SyncReport, SyncService};
