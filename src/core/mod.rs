// Core modules implementing the codec capability, race scheduling, and error modeling.
pub mod codec;
pub mod dispatch;
pub mod error;
pub mod options;
pub(crate) mod race;
