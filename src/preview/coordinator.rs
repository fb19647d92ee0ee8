use std::collections::BTreeSet;
use std::sync::Arc;

use uuid::Uuid;

use crate::domain::RecipientSelection;
use crate::preview::controller::RecipientPreviewController;

/// The recipient-type radio group, as the form presents it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipientKind {
    All,
    Staff,
    Custom,
}

/// A change event coming off the selection controls.
#[derive(Debug, Clone)]
pub enum SelectionEvent {
    RecipientTypeChanged(RecipientKind),
    CustomRecipientToggled { id: Uuid, checked: bool },
}

/// Listens to the selection controls, keeps the current form state, and
/// kicks off a preview refresh whenever the effective selection changes.
///
/// Refreshes are spawned rather than awaited, so rapid events produce
/// overlapping in-flight requests; the controller's token check keeps the
/// rendered result consistent with the latest one.
pub struct SelectionCoordinator {
    kind: RecipientKind,
    checked: BTreeSet<Uuid>,
    controller: Arc<RecipientPreviewController>,
}

impl SelectionCoordinator {
    pub fn new(controller: Arc<RecipientPreviewController>) -> Self {
        Self {
            kind: RecipientKind::All,
            checked: BTreeSet::new(),
            controller,
        }
    }

    /// Fires the initial refresh, as happens when the form first loads.
    pub fn start(&self) {
        self.spawn_refresh();
    }

    /// The custom-recipient region is shown only while the custom kind is
    /// selected. Pure visibility state; not part of the preview contract.
    pub fn custom_region_visible(&self) -> bool {
        self.kind == RecipientKind::Custom
    }

    pub fn current_selection(&self) -> RecipientSelection {
        match self.kind {
            RecipientKind::All => RecipientSelection::All,
            RecipientKind::Staff => RecipientSelection::StaffOnly,
            RecipientKind::Custom => RecipientSelection::Custom(self.checked.clone()),
        }
    }

    pub fn handle(&mut self, event: SelectionEvent) {
        match event {
            SelectionEvent::RecipientTypeChanged(kind) => {
                self.kind = kind;
                self.spawn_refresh();
            }
            SelectionEvent::CustomRecipientToggled { id, checked } => {
                if checked {
                    self.checked.insert(id);
                } else {
                    self.checked.remove(&id);
                }
                // Checkbox state is remembered either way, but only affects
                // the preview while the custom kind is active.
                if self.kind == RecipientKind::Custom {
                    self.spawn_refresh();
                }
            }
        }
    }

    fn spawn_refresh(&self) {
        let controller = Arc::clone(&self.controller);
        let selection = self.current_selection();
        tokio::spawn(async move {
            controller.refresh(selection).await;
        });
    }
}
