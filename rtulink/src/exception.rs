use crate::constants::exceptions;

/// Exception codes a slave may return instead of a normal response
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Ord, Eq, thiserror::Error)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum ExceptionCode {
    /// The function code is not supported by the slave
    #[error("function code is not an allowable action for the slave")]
    IllegalFunction,
    /// The data address is not available on the slave
    #[error("data address is not an allowable address for the slave")]
    IllegalDataAddress,
    /// A value in the request is not acceptable to the slave
    #[error("value in the request is not an allowable value for the slave")]
    IllegalDataValue,
    /// An unrecoverable error occurred while the slave was processing the request
    #[error("unrecoverable error occurred while the slave was performing the requested action")]
    SlaveDeviceFailure,
    /// The slave accepted a long running request and is processing it
    #[error("slave has accepted the request and is processing it")]
    Acknowledge,
    /// The slave is busy with a long running request, try again later
    #[error("slave is busy processing a long running command, try again later")]
    SlaveDeviceBusy,
    /// The slave detected a parity error in its extended memory
    #[error("slave detected a parity error in memory while reading a record file")]
    MemoryParityError,
    /// A gateway could not allocate a path to the target
    #[error("gateway was unable to allocate a path from the input port to the output port")]
    GatewayPathUnavailable,
    /// A gateway got no answer from the target
    #[error("gateway did not receive a response from the target device")]
    GatewayTargetDeviceFailedToRespond,
    /// A code outside the standard set
    #[error("received unknown exception code: {0}")]
    Unknown(u8),
}

impl From<u8> for ExceptionCode {
    fn from(value: u8) -> Self {
        match value {
            exceptions::ILLEGAL_FUNCTION => ExceptionCode::IllegalFunction,
            exceptions::ILLEGAL_DATA_ADDRESS => ExceptionCode::IllegalDataAddress,
            exceptions::ILLEGAL_DATA_VALUE => ExceptionCode::IllegalDataValue,
            exceptions::SLAVE_DEVICE_FAILURE => ExceptionCode::SlaveDeviceFailure,
            exceptions::ACKNOWLEDGE => ExceptionCode::Acknowledge,
            exceptions::SLAVE_DEVICE_BUSY => ExceptionCode::SlaveDeviceBusy,
            exceptions::MEMORY_PARITY_ERROR => ExceptionCode::MemoryParityError,
            exceptions::GATEWAY_PATH_UNAVAILABLE => ExceptionCode::GatewayPathUnavailable,
            exceptions::GATEWAY_TARGET_DEVICE_FAILED_TO_RESPOND => {
                ExceptionCode::GatewayTargetDeviceFailedToRespond
            }
            _ => ExceptionCode::Unknown(value),
        }
    }
}

impl From<ExceptionCode> for u8 {
    fn from(code: ExceptionCode) -> Self {
        match code {
            ExceptionCode::IllegalFunction => exceptions::ILLEGAL_FUNCTION,
            ExceptionCode::IllegalDataAddress => exceptions::ILLEGAL_DATA_ADDRESS,
            ExceptionCode::IllegalDataValue => exceptions::ILLEGAL_DATA_VALUE,
            ExceptionCode::SlaveDeviceFailure => exceptions::SLAVE_DEVICE_FAILURE,
            ExceptionCode::Acknowledge => exceptions::ACKNOWLEDGE,
            ExceptionCode::SlaveDeviceBusy => exceptions::SLAVE_DEVICE_BUSY,
            ExceptionCode::MemoryParityError => exceptions::MEMORY_PARITY_ERROR,
            ExceptionCode::GatewayPathUnavailable => exceptions::GATEWAY_PATH_UNAVAILABLE,
            ExceptionCode::GatewayTargetDeviceFailedToRespond => {
                exceptions::GATEWAY_TARGET_DEVICE_FAILED_TO_RESPOND
            }
            ExceptionCode::Unknown(value) => value,
        }
    }
}
