/// Controls which layers of the exchanged traffic are decoded into INFO level log messages
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct DecodeLevel {
    /// Decoding of the request and response contents
    pub app: AppDecodeLevel,
    /// Decoding of the RTU frame (unit, CRC, raw payload)
    pub frame: FrameDecodeLevel,
    /// Logging of the raw bytes read from and written to the serial line
    pub physical: PhysDecodeLevel,
}

/// How much of each request and response is logged
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum AppDecodeLevel {
    /// Decode nothing
    #[default]
    Nothing,
    /// Decode the function code only
    FunctionCode,
    /// Decode the function code and the address range
    DataHeaders,
    /// Decode the function code, the address range and every value
    DataValues,
}

/// How much of each RTU frame is logged
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum FrameDecodeLevel {
    /// Decode nothing
    #[default]
    Nothing,
    /// Decode the unit id, CRC and payload length
    Header,
    /// Decode the header and the payload as hexadecimal
    Payload,
}

/// How the bytes moved over the serial line are logged
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum PhysDecodeLevel {
    /// Log nothing
    #[default]
    Nothing,
    /// Log the number of bytes only
    Length,
    /// Log the number of bytes and the bytes themselves
    Data,
}

impl DecodeLevel {
    /// A level with nothing enabled
    pub fn nothing() -> Self {
        Self::default()
    }

    /// Construct a level from its three parts
    pub fn new(app: AppDecodeLevel, frame: FrameDecodeLevel, physical: PhysDecodeLevel) -> Self {
        Self {
            app,
            frame,
            physical,
        }
    }

    /// Change the application level
    pub fn application(self, app: AppDecodeLevel) -> Self {
        Self { app, ..self }
    }

    /// Change the frame level
    pub fn frame(self, frame: FrameDecodeLevel) -> Self {
        Self { frame, ..self }
    }

    /// Change the physical level
    pub fn physical(self, physical: PhysDecodeLevel) -> Self {
        Self { physical, ..self }
    }
}

impl From<AppDecodeLevel> for DecodeLevel {
    fn from(app: AppDecodeLevel) -> Self {
        Self::nothing().application(app)
    }
}

impl AppDecodeLevel {
    pub(crate) fn enabled(&self) -> bool {
        !matches!(self, AppDecodeLevel::Nothing)
    }

    pub(crate) fn data_headers(&self) -> bool {
        matches!(
            self,
            AppDecodeLevel::DataHeaders | AppDecodeLevel::DataValues
        )
    }

    pub(crate) fn data_values(&self) -> bool {
        matches!(self, AppDecodeLevel::DataValues)
    }
}

impl FrameDecodeLevel {
    pub(crate) fn enabled(&self) -> bool {
        !matches!(self, FrameDecodeLevel::Nothing)
    }

    pub(crate) fn payload_enabled(&self) -> bool {
        matches!(self, FrameDecodeLevel::Payload)
    }
}

impl PhysDecodeLevel {
    pub(crate) fn enabled(&self) -> bool {
        !matches!(self, PhysDecodeLevel::Nothing)
    }

    pub(crate) fn data_enabled(&self) -> bool {
        matches!(self, PhysDecodeLevel::Data)
    }
}
