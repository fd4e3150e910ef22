/// Scanning serial ports for a responding slave
pub mod discovery;
/// Detecting a slave on an open line
pub mod probe;
/// API used to communicate with the slaves on a serial line
pub mod session;

pub(crate) mod requests;
