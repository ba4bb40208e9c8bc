pub mod entities;
pub mod metrics;
pub mod process;
pub mod whatsapp;

pub use entities::*;
pub use metrics::{DashboardMetrics, RegimeAggregate, RegimeMetrics};
pub use process::{
    content_hash, CompanyRef, FlatProcess, FlatQuestion, FlatStep, ProcessHeader, ProcessStatus,
    StepKind,
};
pub use whatsapp::{ChatReply, VerifyQuery, WhatsAppWebhook};
