//! nedsim: weighted similarity-ensemble configuration for named-entity
//! disambiguation.
//!
//! A settings file names the mention-entity measures (each paired with an
//! entities context), entity-entity similarities and entity importances of one
//! disambiguation run, together with their weights. `settings` parses it,
//! `registry` maps names to constructors, `ensemble` builds the scorers for a
//! document's candidates and `calibration` reads the normalized average score.

pub mod calibration;
pub mod config;
pub mod context;
pub mod ensemble;
pub mod entities;
pub mod errors;
pub mod logging;
pub mod properties;
pub mod registry;
pub mod settings;
pub mod similarity;
pub mod tracer;
