//! Alert Records
//!
//! Provides the inbound batch model, record normalization, the per-key log
//! codec, and the batch timestamp source.

mod clock;
pub mod codec;
mod error;
mod model;

pub use clock::{FixedClock, LocalClock, TimestampProvider, TIMESTAMP_FORMAT};
pub use codec::{decode_log, encode_log, encode_record, normalize};
pub use error::{BatchError, CodecError, Skip};
pub use model::{AlertBatch, AlertRecord, RawAlert};
