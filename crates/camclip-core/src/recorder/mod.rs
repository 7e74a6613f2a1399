mod controller;
mod state;
mod timer;

pub use controller::{
    CHUNK_TIMESLICE, MAX_RECORDING_TIME, RecorderSettings, RecordingController, TICK_PERIOD,
};
pub use state::{RecorderEvent, RecorderSnapshot, RecorderState};
