pub mod submission_service;
pub mod visit_api;

pub use submission_service::{PhotoOutcome, SubmissionReceipt, SubmissionService};
pub use visit_api::{
    interpret_customer_response, interpret_save_response, ExistingVisit, RecordApi, VisitApiClient,
};
