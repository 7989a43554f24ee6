//! Unity Android build inspection
//!
//! This crate reports, from the shipped archives of an Android Unity
//! build alone, which engine version was used, which render pipeline, and
//! which subsystems and frameworks are linked in (the data-oriented
//! entity runtime, entity physics, the Havok back-end, NGUI, the
//! Addressables content pipeline, and the runtime UI toolkit).
//!
//! The pipeline: a [`container::ContainerSet`] indexes the APK/OBB
//! archives; the [`bundle`] reader opens the `UnityFS` container and the
//! [`asset`] reader its serialized files; a two-pass scan fills the
//! [`resolver::ScriptMap`] and the evidence sets; [`detect`] fuses the
//! evidence into a [`report::AnalysisReport`].
//!
//! # Example
//!
//! ```rust,no_run
//! use unity_insight::Analyzer;
//! use std::path::PathBuf;
//!
//! let analyzer = Analyzer::new();
//! let report = analyzer.analyze(&[PathBuf::from("game.apk")])?;
//! println!("{report}");
//! # Ok::<(), unity_insight::InsightError>(())
//! ```

pub mod analyzer;
pub mod asset;
pub mod bundle;
pub mod compression;
pub mod container;
pub mod detect;
pub mod error;
pub mod reader;
pub mod report;
pub mod resolver;
pub mod scanner;
pub mod transport;

pub use analyzer::Analyzer;
pub use container::ContainerSet;
pub use detect::{RenderPipeline, Usage};
pub use error::{InsightError, Result};
pub use report::{AnalysisReport, ScriptCount};
pub use transport::{DeviceInfo, DeviceTransport};
