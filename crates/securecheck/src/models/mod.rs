pub mod envelope;
pub mod stop_record;

pub use envelope::{
    ENVELOPE_SCHEMA_VERSION, Envelope, EnvelopeCommandFailure, EnvelopeMeta, EnvelopeNotice,
    WARNING_CONNECTION_ERROR, WARNING_NO_RESULT_FOUND,
};
pub use stop_record::{DriverGender, StopRecord, json_schema};
