//! Observable refs, dynamic state objects, and ref-unwrapping mirrors of those objects.
//!
//! A template layer can hand a mirror to render code so that reading a field backed by a [`Ref`]
//! yields the ref's value, and writing the field writes the ref.
mod object;
mod reactive;
mod refs;
mod subscription;
mod unwrap;
mod value;

pub mod utils;

pub use object::*;
pub use reactive::*;
pub use refs::*;
pub use subscription::*;
pub use unwrap::*;
pub use value::*;
