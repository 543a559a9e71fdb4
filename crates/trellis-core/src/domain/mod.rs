//! Domain model (records, settings, connectivity, change events).

pub mod activity;
pub mod collection;
pub mod connectivity;
pub mod delay;
pub mod events;
pub mod ids;
pub mod note;
pub mod settings;
pub mod task;

pub use activity::{ACTIVITY_RETENTION, ActivityDraft, ActivityEntry, ActivitySource};
pub use collection::Collection;
pub use connectivity::{Collaborator, Connectivity};
pub use delay::{DEFAULT_DELAY_DURATION, Delay, DelayCategory, DelayDraft};
pub use events::{ChangeKind, Row, RowChange};
pub use ids::{
    ActivityId, ActivityMarker, DelayId, DelayMarker, Id, IdMarker, NoteId, NoteMarker, TaskId,
    TaskMarker, id_text,
};
pub use note::{Note, NoteDraft, NotePatch, UNTITLED_NOTE};
pub use settings::{
    BackendSettings, CalendarSettings, ChatSettings, Section, Settings, TrackerSettings,
    UserProfile,
};
pub use task::{DueDate, Task, TaskDraft, TaskPatch, TaskStatus};
