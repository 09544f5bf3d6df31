//! Finite-element rotordynamics.
//!
//! A rotor is assembled from shaft, disk and bearing elements on a line of
//! nodes with four DOFs each (`[x, y, α, β]`). On top of the assembled
//! mass, stiffness, damping and gyroscopic matrices the crate provides:
//!
//! - modal analysis at a fixed speed with whirl and stability classification
//! - Campbell diagrams and critical speeds
//! - harmonic and unbalance frequency response
//! - time response by Newmark integration or exact modal superposition
//!
//! ```no_run
//! use rotordyn::{rotor_example, Result};
//!
//! fn main() -> Result<()> {
//!     let rotor = rotor_example()?;
//!     let modal = rotor.modal(0.0, 4)?;
//!     println!("{:?}", modal.frequencies());
//!     Ok(())
//! }
//! ```
//!
//! Units are SI throughout; speeds and frequencies are in rad/s.
//!
//! ## Features
//!
//! - `parallel` (default): run speed and frequency sweeps with Rayon.

pub mod assembly;
pub mod bearing;
pub mod campbell;
pub mod config;
pub mod disk;
pub mod element;
pub mod error;
pub mod interp;
pub mod material;
pub mod modal;
pub mod modes;
pub mod response;
pub mod rotor;
pub mod shaft;
pub mod transient;
pub mod types;

pub use bearing::{BearingElement, BearingTable, Coefficient};
pub use campbell::{CampbellDiagram, CriticalSpeed};
pub use config::{AnalysisConfig, NewmarkParameters};
pub use disk::DiskElement;
pub use element::{Element, ElementMatrices, LocalMatrices};
pub use error::{Error, Result};
pub use interp::LookupTable;
pub use material::Material;
pub use modal::{mac, ModalResult, Mode, Stability};
pub use modes::Orbit;
pub use response::{FrequencyResponse, HarmonicForce, SpeedSchedule};
pub use rotor::{rotor_example, Rotor, Support, SystemMatrices};
pub use shaft::ShaftElement;
pub use transient::{InitialConditions, LoadHistory, TimeIntegration, TimeResponse};
pub use types::{RotationSense, WhirlDirection};
