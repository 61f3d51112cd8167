//! CRM vertical slice: the data service over accounts, contacts and
//! opportunities, plus seed data, pipeline metrics and field validation.

pub mod ids;
pub mod metrics;
pub mod seed;
pub mod service;
pub mod validation;

pub use metrics::{Metrics, PipelineColumn, StageTotals};
pub use service::CrmService;
