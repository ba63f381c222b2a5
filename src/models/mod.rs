pub mod alert;
pub mod enums;
pub mod patient;
pub mod vitals;

pub use alert::{Alert, TriageAudit};
pub use patient::{Patient, PatientSnapshot};
pub use vitals::{Vitals, VitalsReading};
