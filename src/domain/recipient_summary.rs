use serde::{Deserialize, Serialize};

/// One recipient record as the preview endpoint reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RecipientSummary {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl RecipientSummary {
    /// `"first last"` when both parts are present and non-empty, otherwise
    /// the literal `"No name"`.
    pub fn display_name(&self) -> String {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) if !first.is_empty() && !last.is_empty() => {
                format!("{} {}", first, last)
            }
            _ => "No name".to_string(),
        }
    }
}
