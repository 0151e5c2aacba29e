//! Core engines for Calorix

pub mod classifier;
pub mod combine;
pub mod device;
pub mod drift;
pub mod notes;
pub mod occupancy;
pub mod persist;
pub mod pipeline;
pub mod remote;
pub mod segment;
pub mod timeline;

pub use classifier::{classify, Classification, RULES};
pub use combine::{check_discrepancies, combine_sets, ChannelDiscrepancy, CombineMethod};
pub use device::{parse_export, read_export_lines, DeviceExport, LOGICAL_COLUMNS};
pub use drift::apply_drift;
pub use notes::parse_note_log;
pub use occupancy::detect_occupancy;
pub use persist::{read_stream_csv, write_metadata_csv, write_stream_csv};
pub use pipeline::{
    annotate_streams, extract_from_folder, preprocess_batch, preprocess_file, BatchSummary,
    ExtractSummary, PreprocessOptions, PreprocessOutput,
};
pub use remote::{RemoteClient, RemoteConfig};
pub use segment::{extract_segment, protocol_code, SegmentExtract, SegmentWarning};
pub use timeline::{apply_timeline, build_timeline};
