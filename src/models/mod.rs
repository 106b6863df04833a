mod visitor;

pub use visitor::{NewVisitor, VisitorRecord, DEFAULT_DEVICE_TYPE, UNKNOWN};
