//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx3d, Idx4d};

pub use crate::data::{series_id, ImageSeries, MaskVolume, NiftiHeaderAttr, OpenVolumeError};

pub use crate::dataset::{NiftiLoader, VolumeLoader};

pub use crate::engine::{EngineError, EngineSettings, FeatureEngine, FeatureMap};

pub use crate::schema::Schema;

pub use crate::extract::{
    checkpoint_filename, extract, extract_slice, BatchParams, CheckpointStore, ExtractError,
    FeatureRow, ResultTable,
};

pub use crate::consts::{CANONICAL_PREFIX, DEFAULT_BIN_WIDTH, OUTPUT_FILENAME};
