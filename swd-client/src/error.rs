use std::{error::Error, fmt::Display};

/// Errors that may occur when accessing a register through [crate::SwdClient].
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum AccessError<E> {
    /// The target still answered `WAIT` after the last allowed attempt
    Wait { attempts: u32 },
    /// The target answered `FAULT`. Sticky errors must be cleared before continuing.
    Fault,
    /// The acknowledgment was malformed or the read data failed its parity check
    Invalid { data: Option<u32> },
    /// The debug or system power domain never acknowledged the power-up request
    PowerUpTimeout { ctrl_stat: u32 },
    /// The transport failed
    Transport(E),
}

impl<E: Display> Display for AccessError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessError::Wait { attempts } => {
                write!(f, "Target still busy after {} attempts", attempts)
            }
            AccessError::Fault => write!(f, "Target answered FAULT"),
            AccessError::Invalid { data: Some(data) } => {
                write!(f, "Invalid response (data 0x{:08x})", data)
            }
            AccessError::Invalid { data: None } => write!(f, "Invalid response"),
            AccessError::PowerUpTimeout { ctrl_stat } => {
                write!(f, "Power-up not acknowledged, CTRL/STAT is 0x{:08x}", ctrl_stat)
            }
            AccessError::Transport(error) => write!(f, "{}", error),
        }
    }
}

impl<E: Error + 'static> Error for AccessError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AccessError::Transport(error) => Some(error),
            _ => None,
        }
    }
}
