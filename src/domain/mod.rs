mod preview_result;
mod recipient_email;
mod recipient_selection;
mod recipient_summary;
mod subject_line;

pub use preview_result::PreviewResult;
pub use recipient_email::RecipientEmail;
pub use recipient_selection::RecipientSelection;
pub use recipient_summary::RecipientSummary;
pub use subject_line::SubjectLine;
