//! Built-in processors.

mod buffer_concat;
mod buffer_scale;
mod buffer_source;
mod buffer_statistics;
mod image_source;
mod mesh_assembler;

pub use buffer_concat::BufferConcat;
pub use buffer_scale::{BufferScale, ScaleKernel};
pub use buffer_source::BufferSource;
pub use buffer_statistics::{BufferStatistics, Statistics};
pub use image_source::ImageSource;
pub use mesh_assembler::MeshAssembler;

use crate::datastructures::data::BufferType;

/// Option keys accepted by `buffer_type` properties.
pub const BUFFER_TYPE_OPTIONS: [&str; 5] = ["position", "normal", "color", "texcoord", "curvature"];

pub(crate) fn buffer_type_from_key(key: &str) -> Option<BufferType> {
    match key {
        "position" => Some(BufferType::Position),
        "normal" => Some(BufferType::Normal),
        "color" => Some(BufferType::Color),
        "texcoord" => Some(BufferType::TexCoord),
        "curvature" => Some(BufferType::Curvature),
        _ => None,
    }
}
