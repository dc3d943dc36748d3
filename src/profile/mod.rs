//! Resource profiles: gap-free segment sequences over a time universe.
pub mod discrete;
pub mod linear;
pub mod segments;
pub mod value;

pub use discrete::DiscreteProfile;
pub use linear::{LinearDynamics, LinearProfile};
pub use segments::{Dynamics, Profile, ProfileError};
pub use value::SerializedValue;
