//! Core types for Calorix

mod error;
mod metadata;
mod note;
mod occupancy;
mod rule;
mod stream;
mod timeline;

pub use error::{PipelineError, Result};
pub use metadata::{subject_codes, CodeMode, SubjectMetadata};
pub use note::{NoteEvent, Participant, ParticipantScope};
pub use occupancy::{ChamberOccupancy, OccupancyWindow};
pub use rule::KeywordRule;
pub use stream::{MeasurementRecord, MeasurementStream};
pub use timeline::{ChangePoint, DriftOffset, FactTable, ProtocolFact};
