//! Change notifications emitted by model mutations
//!
//! Every successful mutation returns a `ChangeEvent` describing what changed.
//! A designer session also forwards each event to its registered observers.

use std::fmt;
use std::path::PathBuf;

use crate::schema::FieldRef;

#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    ProjectCreated {
        name: String,
    },
    ProjectLoaded {
        path: PathBuf,
    },
    ProjectSaved {
        path: PathBuf,
    },
    TableCreated {
        table_id: String,
    },
    TableRenamed {
        table_id: String,
        name_en: String,
    },
    /// `dangling` lists the Reference fields left pointing at the removed table
    TableDeleted {
        table_id: String,
        dangling: Vec<FieldRef>,
    },
    FieldCreated {
        table_id: String,
        field_id: String,
    },
    /// `dropped` names properties that did not apply to the field's type
    FieldUpdated {
        table_id: String,
        field_id: String,
        dropped: Vec<String>,
    },
    FieldReset {
        table_id: String,
        field_id: String,
    },
    FieldMoved {
        table_id: String,
        field_id: String,
        from: usize,
        to: usize,
    },
    FieldDeleted {
        table_id: String,
        field_id: String,
    },
}

impl ChangeEvent {
    /// Table the event concerns, if any
    pub fn table_id(&self) -> Option<&str> {
        match self {
            ChangeEvent::ProjectCreated { .. }
            | ChangeEvent::ProjectLoaded { .. }
            | ChangeEvent::ProjectSaved { .. } => None,
            ChangeEvent::TableCreated { table_id }
            | ChangeEvent::TableRenamed { table_id, .. }
            | ChangeEvent::TableDeleted { table_id, .. }
            | ChangeEvent::FieldCreated { table_id, .. }
            | ChangeEvent::FieldUpdated { table_id, .. }
            | ChangeEvent::FieldReset { table_id, .. }
            | ChangeEvent::FieldMoved { table_id, .. }
            | ChangeEvent::FieldDeleted { table_id, .. } => Some(table_id),
        }
    }

    /// Field the event concerns, if any
    pub fn field_id(&self) -> Option<&str> {
        match self {
            ChangeEvent::FieldCreated { field_id, .. }
            | ChangeEvent::FieldUpdated { field_id, .. }
            | ChangeEvent::FieldReset { field_id, .. }
            | ChangeEvent::FieldMoved { field_id, .. }
            | ChangeEvent::FieldDeleted { field_id, .. } => Some(field_id),
            _ => None,
        }
    }
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeEvent::ProjectCreated { name } => write!(f, "Created project '{}'", name),
            ChangeEvent::ProjectLoaded { path } => write!(f, "Loaded {:?}", path),
            ChangeEvent::ProjectSaved { path } => write!(f, "Saved {:?}", path),
            ChangeEvent::TableCreated { table_id } => write!(f, "Created table {}", table_id),
            ChangeEvent::TableRenamed { table_id, name_en } => {
                write!(f, "Renamed table {} ({})", table_id, name_en)
            }
            ChangeEvent::TableDeleted { table_id, dangling } => {
                write!(f, "Deleted table {}", table_id)?;
                if !dangling.is_empty() {
                    let refs: Vec<String> = dangling.iter().map(ToString::to_string).collect();
                    write!(f, "; dangling references: {}", refs.join(", "))?;
                }
                Ok(())
            }
            ChangeEvent::FieldCreated { table_id, field_id } => {
                write!(f, "Created field {}.{}", table_id, field_id)
            }
            ChangeEvent::FieldUpdated {
                table_id,
                field_id,
                dropped,
            } => {
                write!(f, "Updated field {}.{}", table_id, field_id)?;
                if !dropped.is_empty() {
                    write!(f, "; ignored: {}", dropped.join(", "))?;
                }
                Ok(())
            }
            ChangeEvent::FieldReset { table_id, field_id } => {
                write!(f, "Reset field {}.{}", table_id, field_id)
            }
            ChangeEvent::FieldMoved {
                table_id,
                field_id,
                from,
                to,
            } => write!(f, "Moved field {}.{} from {} to {}", table_id, field_id, from, to),
            ChangeEvent::FieldDeleted { table_id, field_id } => {
                write!(f, "Deleted field {}.{}", table_id, field_id)
            }
        }
    }
}

/// Receives every change a designer session commits
pub trait DesignerObserver {
    fn on_change(&mut self, event: &ChangeEvent);
}

impl<F: FnMut(&ChangeEvent)> DesignerObserver for F {
    fn on_change(&mut self, event: &ChangeEvent) {
        self(event)
    }
}

/// Observer that ignores everything (for headless use and tests)
#[derive(Debug, Default)]
pub struct SilentObserver;

impl SilentObserver {
    pub fn new() -> Self {
        Self
    }
}

impl DesignerObserver for SilentObserver {
    fn on_change(&mut self, _event: &ChangeEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let event = ChangeEvent::TableDeleted {
            table_id: "table_1_b".into(),
            dangling: vec![FieldRef::new("table_0_a", "field_0_ssylka")],
        };
        assert_eq!(
            event.to_string(),
            "Deleted table table_1_b; dangling references: table_0_a.field_0_ssylka"
        );

        let event = ChangeEvent::FieldUpdated {
            table_id: "t".into(),
            field_id: "f".into(),
            dropped: vec![],
        };
        assert_eq!(event.to_string(), "Updated field t.f");
    }

    #[test]
    fn test_closure_observer() {
        let mut seen = Vec::new();
        {
            let mut observer = |e: &ChangeEvent| seen.push(e.clone());
            observer.on_change(&ChangeEvent::TableCreated {
                table_id: "table_0_a".into(),
            });
        }
        assert_eq!(seen.len(), 1);
    }
}
