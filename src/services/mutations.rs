//! Fire-and-forget annotation persistence and the notifications it
//! produces.

use std::collections::VecDeque;

use crate::error::MutationError;
use crate::geometry::Geometry;
use crate::models::Tag;
use crate::windows::ViewSubject;

/// Persists annotation changes. Results only ever become notifications.
pub trait AnnotationSink: Send + Sync {
    fn persist_geometry(&self, sound_event: &str, geometry: &Geometry) -> Result<(), MutationError>;
    fn persist_tag(&self, entity: &str, tag: &Tag) -> Result<(), MutationError>;
    fn remove_tag(&self, entity: &str, tag: &Tag) -> Result<(), MutationError>;
    fn create_note(&self, entity: &str, message: &str) -> Result<(), MutationError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    PersistGeometry { sound_event: String, geometry: Geometry },
    AddTag { entity: String, tag: Tag },
    RemoveTag { entity: String, tag: Tag },
    CreateNote { entity: String, message: String },
}

impl Mutation {
    /// Geometry changes are stored on sound events only. Other subjects
    /// keep them locally.
    pub fn persist_geometry(subject: &ViewSubject, geometry: Geometry) -> Option<Self> {
        match subject {
            ViewSubject::SoundEvent { uuid, .. } => Some(Mutation::PersistGeometry {
                sound_event: uuid.clone(),
                geometry,
            }),
            other => {
                tracing::debug!(
                    subject = other.kind(),
                    geometry = ?geometry.geometry_type(),
                    "Geometry kept locally; subject has no annotation store"
                );
                None
            }
        }
    }

    pub fn apply(&self, sink: &dyn AnnotationSink) -> Result<(), MutationError> {
        match self {
            Mutation::PersistGeometry {
                sound_event,
                geometry,
            } => sink.persist_geometry(sound_event, geometry),
            Mutation::AddTag { entity, tag } => sink.persist_tag(entity, tag),
            Mutation::RemoveTag { entity, tag } => sink.remove_tag(entity, tag),
            Mutation::CreateNote { entity, message } => sink.create_note(entity, message),
        }
    }

    fn success_message(&self) -> String {
        match self {
            Mutation::PersistGeometry { .. } => "Annotation saved".to_string(),
            Mutation::AddTag { tag, .. } => format!("Tag {} added", tag),
            Mutation::RemoveTag { tag, .. } => format!("Tag {} removed", tag),
            Mutation::CreateNote { .. } => "Note created".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Error,
}

/// A toast-style message for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    /// Notification describing the result of `mutation`.
    fn for_result(mutation: &Mutation, result: &Result<(), MutationError>) -> Self {
        match result {
            Ok(()) => Self {
                level: NotificationLevel::Success,
                message: mutation.success_message(),
            },
            Err(e) => Self {
                level: NotificationLevel::Error,
                message: e.user_message(),
            },
        }
    }
}

/// Bounded queue; the oldest notification is dropped when full.
#[derive(Debug, Clone)]
pub struct NotificationQueue {
    items: VecDeque<Notification>,
    capacity: usize,
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::with_capacity(16)
    }
}

impl NotificationQueue {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, notification: Notification) {
        if notification.level == NotificationLevel::Error {
            tracing::warn!(message = %notification.message, "Mutation failed");
        }
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(notification);
    }

    pub fn report(&mut self, mutation: &Mutation, result: &Result<(), MutationError>) {
        self.push(Notification::for_result(mutation, result));
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.items.iter()
    }

    pub fn drain(&mut self) -> Vec<Notification> {
        self.items.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_for_result() {
        let mutation = Mutation::AddTag {
            entity: "se-1".to_string(),
            tag: Tag::new("species", "Myotis myotis"),
        };
        let ok = Notification::for_result(&mutation, &Ok(()));
        assert_eq!(ok.level, NotificationLevel::Success);
        assert_eq!(ok.message, "Tag species: Myotis myotis added");

        let err = Notification::for_result(&mutation, &Err(MutationError::Status { status: 403 }));
        assert_eq!(err.level, NotificationLevel::Error);
        assert!(err.message.contains("403"));
    }

    #[test]
    fn test_geometry_persists_only_for_sound_events() {
        let recording = crate::test_fixtures::fixture_recording(30.0);
        let geometry = Geometry::TimeInterval([1.0, 2.0]);

        let subject = ViewSubject::Recording {
            recording: recording.clone(),
            start_time: 0.0,
            end_time: None,
        };
        assert_eq!(Mutation::persist_geometry(&subject, geometry.clone()), None);

        let subject = ViewSubject::SoundEvent {
            uuid: "se-9".to_string(),
            geometry: Geometry::TimeStamp(1.5),
            recording,
        };
        assert_eq!(
            Mutation::persist_geometry(&subject, geometry.clone()),
            Some(Mutation::PersistGeometry {
                sound_event: "se-9".to_string(),
                geometry,
            })
        );
    }

    #[test]
    fn test_queue_drops_oldest() {
        let mut queue = NotificationQueue::with_capacity(2);
        for i in 0..3 {
            queue.push(Notification {
                level: NotificationLevel::Success,
                message: i.to_string(),
            });
        }
        let messages: Vec<_> = queue.drain().into_iter().map(|n| n.message).collect();
        assert_eq!(messages, vec!["1", "2"]);
        assert!(queue.is_empty());
    }
}
