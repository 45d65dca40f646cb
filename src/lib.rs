//! # visnet: processor networks over multi-representation data
//!
//! The core of a scientific-visualization engine. Data objects (buffers,
//! volumes, layers, meshes, images) keep any number of representations
//! (RAM, disk, GPU-style device storage) and convert between them on demand.
//! Processors consume and produce such data through typed ports and are
//! evaluated by a [`ProcessorNetwork`] in dependency order whenever a
//! property or an upstream result changes.
//!
//! ## Architecture
//!
//! - **Data structures**: `Data` with its representations, the converter
//!   registry that finds the cheapest conversion path between them
//! - **Network**: processors, ports, properties, property links and the
//!   wave-based evaluator
//! - **Context**: the registries populated by modules at startup, shared by
//!   every network through an `Arc`
//! - **Communication**: network events on crossbeam channels
//!
//! ## Configuration
//!
//! Settings are read from `config.toml` in the platform data directory under
//! `dev.hxyulin.visnet`:
//!
//! - **Linux**: `~/.local/share/dev.hxyulin.visnet/`
//! - **macOS**: `~/Library/Application Support/dev.hxyulin.visnet/`
//! - **Windows**: `%APPDATA%\dev.hxyulin.visnet\`
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use visnet::{
//!     config::EvaluationSettings,
//!     network::{processors::{BufferScale, BufferSource}, PropertyValue},
//!     ApplicationContext, ProcessorNetwork,
//! };
//!
//! let context = Arc::new(ApplicationContext::with_default_modules("demo"));
//! let mut network = ProcessorNetwork::new(context, EvaluationSettings::default());
//! network.add_processor("source", BufferSource)?;
//! network.add_processor("scale", BufferScale::default())?;
//! network.connect("source", "outport", "scale", "inport")?;
//! network.set_property("scale", "factor", PropertyValue::Float(2.0))?;
//!
//! let report = network.evaluate();
//! assert!(report.is_success());
//! # Ok::<(), visnet::VisError>(())
//! ```

pub mod config;
pub mod context;
pub mod datastructures;
pub mod error;
pub mod modules;
pub mod network;

// Re-export commonly used types
pub use config::AppConfig;
pub use context::{ApplicationContext, Module};
pub use datastructures::{ConverterRegistry, Data, DataRef, RepresentationKind};
pub use error::{Result, ResultExt, VisError};
pub use network::{EvaluationReport, NetworkEvent, ProcessorNetwork};
