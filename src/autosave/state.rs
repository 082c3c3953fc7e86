use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PersistError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum SavePhase {
    #[default]
    Idle,
    PendingSave,
    Saving,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveEvent {
    Edit(String),
    TimerFired,
    SaveNowRequested,
    SaveCompleted {
        content: String,
        result: Result<(), PersistError>,
        at: DateTime<Utc>,
    },
}

/// What the driver has to do after an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveEffect {
    Nothing,
    /// (Re)start the debounce timer, dropping any pending one.
    ArmTimer,
    /// Start persisting this content. The machine is already `Saving`.
    Persist(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SaveSnapshot {
    pub phase: SavePhase,
    pub current_content: String,
    pub has_unsaved_changes: bool,
    pub is_saving: bool,
    pub last_saved_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

/// Synchronisation state between edited and persisted content.
///
/// Pure: no clocks, no tasks. Feed it [`SaveEvent`]s and carry out the
/// returned [`SaveEffect`].
#[derive(Debug, Clone, Default)]
pub struct SaveMachine {
    current_content: String,
    last_persisted_content: String,
    has_target: bool,
    timer_armed: bool,
    saving: bool,
    /// The debounce timer went off while a save was in flight.
    deferred_fire: bool,
    last_saved_at: Option<DateTime<Utc>>,
    error: Option<String>,
}

impl SaveMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start over for a newly selected target, seeded with its loaded content.
    pub fn reset(&mut self, has_target: bool, content: String) {
        *self = Self {
            last_persisted_content: content.clone(),
            current_content: content,
            has_target,
            ..Self::default()
        };
    }

    pub fn handle(&mut self, event: SaveEvent) -> SaveEffect {
        match event {
            SaveEvent::Edit(content) => {
                self.current_content = content;
                if !self.has_target {
                    return SaveEffect::Nothing;
                }
                self.timer_armed = true;
                SaveEffect::ArmTimer
            }
            SaveEvent::TimerFired => {
                if !self.timer_armed {
                    return SaveEffect::Nothing;
                }
                self.timer_armed = false;
                if self.saving {
                    self.deferred_fire = true;
                    return SaveEffect::Nothing;
                }
                if self.has_unsaved_changes() {
                    self.begin_save()
                } else {
                    SaveEffect::Nothing
                }
            }
            SaveEvent::SaveNowRequested => {
                if self.saving || !self.has_target || !self.has_unsaved_changes() {
                    return SaveEffect::Nothing;
                }
                self.timer_armed = false;
                self.begin_save()
            }
            SaveEvent::SaveCompleted {
                content,
                result,
                at,
            } => {
                if !self.saving {
                    return SaveEffect::Nothing;
                }
                self.saving = false;
                match result {
                    Ok(()) => {
                        self.last_persisted_content = content;
                        self.last_saved_at = Some(at);
                        self.error = None;
                    }
                    Err(err) => {
                        self.error = Some(err.reason);
                    }
                }

                if std::mem::take(&mut self.deferred_fire)
                    && !self.timer_armed
                    && self.has_unsaved_changes()
                {
                    self.timer_armed = true;
                    return SaveEffect::ArmTimer;
                }
                SaveEffect::Nothing
            }
        }
    }

    fn begin_save(&mut self) -> SaveEffect {
        self.saving = true;
        self.error = None;
        SaveEffect::Persist(self.current_content.clone())
    }

    pub fn phase(&self) -> SavePhase {
        if self.saving {
            SavePhase::Saving
        } else if self.timer_armed {
            SavePhase::PendingSave
        } else if self.error.is_some() {
            SavePhase::Error
        } else {
            SavePhase::Idle
        }
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.current_content != self.last_persisted_content
    }

    pub fn has_target(&self) -> bool {
        self.has_target
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn current_content(&self) -> &str {
        &self.current_content
    }

    pub fn last_persisted_content(&self) -> &str {
        &self.last_persisted_content
    }

    pub fn snapshot(&self) -> SaveSnapshot {
        SaveSnapshot {
            phase: self.phase(),
            current_content: self.current_content.clone(),
            has_unsaved_changes: self.has_unsaved_changes(),
            is_saving: self.saving,
            last_saved_at: self.last_saved_at,
            error: self.error.clone(),
        }
    }
}
