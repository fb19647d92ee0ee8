use super::RecipientSummary;

/// The outcome of one preview round-trip. Produced per request and replaced
/// wholesale by the next one; nothing is cached or merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewResult {
    /// Total number of recipients the selection resolves to.
    pub count: u64,
    /// The first few recipients, capped by the server.
    pub sample: Vec<RecipientSummary>,
}

impl PreviewResult {
    pub fn truncated(&self) -> bool {
        self.count > self.sample.len() as u64
    }

    /// How many recipients the sample leaves out.
    pub fn overflow(&self) -> u64 {
        self.count.saturating_sub(self.sample.len() as u64)
    }
}
