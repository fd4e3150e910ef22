/// Encodings of a single coil value in a `write single coil` request
pub mod coil {
    /// Wire value that switches a coil ON
    pub const ON: u16 = 0xFF00;
    /// Wire value that switches a coil OFF
    pub const OFF: u16 = 0x0000;
}

/// Per-function limits on the quantity field of a request
pub mod limits {
    /// Largest number of coils or discrete inputs in one read
    pub const MAX_READ_COILS_COUNT: u16 = 0x07D0;
    /// Largest number of holding or input registers in one read
    pub const MAX_READ_REGISTERS_COUNT: u16 = 0x007D;
    /// Largest number of coils in one `write multiple coils`
    pub const MAX_WRITE_COILS_COUNT: u16 = 0x07B0;
    /// Largest number of registers in one `write multiple registers`
    pub const MAX_WRITE_REGISTERS_COUNT: u16 = 0x007B;
}

/// Values found in the single byte of an exception response
pub mod exceptions {
    /// Function not supported by the device
    pub const ILLEGAL_FUNCTION: u8 = 0x01;
    /// Address not available on the device
    pub const ILLEGAL_DATA_ADDRESS: u8 = 0x02;
    /// Value not accepted by the device
    pub const ILLEGAL_DATA_VALUE: u8 = 0x03;
    /// Device failed while processing
    pub const SLAVE_DEVICE_FAILURE: u8 = 0x04;
    /// Long running request accepted
    pub const ACKNOWLEDGE: u8 = 0x05;
    /// Device is busy
    pub const SLAVE_DEVICE_BUSY: u8 = 0x06;
    /// Parity error in extended memory
    pub const MEMORY_PARITY_ERROR: u8 = 0x08;
    /// Gateway could not route the request
    pub const GATEWAY_PATH_UNAVAILABLE: u8 = 0x0A;
    /// Gateway target did not answer
    pub const GATEWAY_TARGET_DEVICE_FAILED_TO_RESPOND: u8 = 0x0B;
}

/// Serial line defaults used when nothing else is configured
pub mod defaults {
    use std::time::Duration;

    /// Device path used when neither configuration nor discovery supply one
    pub const PORT: &str = "/dev/ttyUSB0";
    /// Baud rate of a freshly configured endpoint
    pub const BAUD_RATE: u32 = 9600;
    /// Per-request response timeout of a session
    pub const TIMEOUT: Duration = Duration::from_secs(1);
    /// Unit a session addresses when a call does not name one
    pub const UNIT: u8 = 1;
    /// Timeout of a single probe attempt during discovery
    pub const PROBE_TIMEOUT: Duration = Duration::from_millis(500);
    /// Units a probe tries, in order
    pub const PROBE_UNITS: [u8; 3] = [1, 2, 3];
    /// Addresses a probe tries for each unit, in order
    pub const PROBE_ADDRESSES: [u16; 2] = [0, 1];
    /// Baud rates tried, in order, by discovery
    pub const BAUD_RATES: [u32; 5] = [9600, 19200, 38400, 57600, 115200];
}
