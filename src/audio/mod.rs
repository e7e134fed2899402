pub mod capture;
pub mod cue;
pub mod file;
pub mod recorder;

pub use capture::{MicRecorder, MicRecorderFactory};
pub use cue::{CuePlayer, DeviceCuePlayer};
pub use file::AudioFile;
pub use recorder::{
    ignore_device_error, recording_file_name, Recorder, RecorderError, RecorderFactory,
};
