use std::collections::BTreeSet;

use uuid::Uuid;

/// Which recipients a broadcast is aimed at, read fresh from the form
/// controls on every change. An empty custom set means zero recipients,
/// never "everyone".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipientSelection {
    All,
    StaffOnly,
    Custom(BTreeSet<Uuid>),
}

impl RecipientSelection {
    /// Builds a custom selection from checkbox values, deduplicating ids.
    pub fn custom(ids: impl IntoIterator<Item = Uuid>) -> Self {
        Self::Custom(ids.into_iter().collect())
    }

    pub fn recipient_type(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::StaffOnly => "staff",
            Self::Custom(_) => "custom",
        }
    }

    /// The comma-joined id list as it goes on the wire. Empty unless the
    /// selection is custom.
    pub fn custom_recipient_ids(&self) -> String {
        match self {
            Self::Custom(ids) => ids
                .iter()
                .map(Uuid::to_string)
                .collect::<Vec<_>>()
                .join(","),
            _ => String::new(),
        }
    }

    /// Parses the two wire fields back into a selection. The id list is
    /// ignored unless `recipient_type` is `custom`.
    pub fn parse(recipient_type: &str, custom_recipient_ids: &str) -> Result<Self, String> {
        match recipient_type {
            "all" => Ok(Self::All),
            "staff" => Ok(Self::StaffOnly),
            "custom" => {
                let mut ids = BTreeSet::new();
                for raw in custom_recipient_ids
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                {
                    let id = Uuid::parse_str(raw)
                        .map_err(|_| format!("{} is not a valid recipient id.", raw))?;
                    ids.insert(id);
                }
                Ok(Self::Custom(ids))
            }
            other => Err(format!("{} is not a valid recipient type.", other)),
        }
    }
}
