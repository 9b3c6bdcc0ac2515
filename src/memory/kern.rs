// Wed Jan 15 2026 - Alex

use std::fmt;

/// Status code returned by the Mach VM calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KernReturn(pub i32);

impl KernReturn {
    pub const SUCCESS: Self = Self(0);
    pub const INVALID_ADDRESS: Self = Self(1);
    pub const PROTECTION_FAILURE: Self = Self(2);
    pub const NO_SPACE: Self = Self(3);
    pub const INVALID_ARGUMENT: Self = Self(4);
    pub const FAILURE: Self = Self(5);
    pub const NO_ACCESS: Self = Self(8);
    pub const MEMORY_FAILURE: Self = Self(9);
    pub const MEMORY_ERROR: Self = Self(10);
    pub const INVALID_NAME: Self = Self(15);
    pub const INVALID_TASK: Self = Self(16);
    pub const INVALID_RIGHT: Self = Self(17);
    pub const TERMINATED: Self = Self(37);

    pub fn code(self) -> i32 {
        self.0
    }

    pub fn is_success(self) -> bool {
        self == Self::SUCCESS
    }

    pub fn into_result(self) -> Result<(), KernReturn> {
        if self.is_success() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// The task port itself is unusable (dead name, wrong right, exited task).
    pub fn is_handle_error(self) -> bool {
        matches!(
            self,
            Self::INVALID_TASK
                | Self::INVALID_NAME
                | Self::INVALID_RIGHT
                | Self::INVALID_ARGUMENT
                | Self::TERMINATED
        )
    }

    pub fn is_access_error(self) -> bool {
        matches!(self, Self::PROTECTION_FAILURE | Self::NO_ACCESS)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::SUCCESS => "KERN_SUCCESS",
            Self::INVALID_ADDRESS => "KERN_INVALID_ADDRESS",
            Self::PROTECTION_FAILURE => "KERN_PROTECTION_FAILURE",
            Self::NO_SPACE => "KERN_NO_SPACE",
            Self::INVALID_ARGUMENT => "KERN_INVALID_ARGUMENT",
            Self::FAILURE => "KERN_FAILURE",
            Self::NO_ACCESS => "KERN_NO_ACCESS",
            Self::MEMORY_FAILURE => "KERN_MEMORY_FAILURE",
            Self::MEMORY_ERROR => "KERN_MEMORY_ERROR",
            Self::INVALID_NAME => "KERN_INVALID_NAME",
            Self::INVALID_TASK => "KERN_INVALID_TASK",
            Self::INVALID_RIGHT => "KERN_INVALID_RIGHT",
            Self::TERMINATED => "KERN_TERMINATED",
            _ => "KERN_UNKNOWN",
        }
    }
}

impl fmt::Display for KernReturn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.0)
    }
}

impl From<i32> for KernReturn {
    fn from(code: i32) -> Self {
        Self(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_result() {
        assert!(KernReturn::SUCCESS.into_result().is_ok());
        assert_eq!(KernReturn(2).into_result(), Err(KernReturn::PROTECTION_FAILURE));
    }

    #[test]
    fn test_classification() {
        assert!(KernReturn::INVALID_TASK.is_handle_error());
        assert!(KernReturn::TERMINATED.is_handle_error());
        assert!(!KernReturn::INVALID_ADDRESS.is_handle_error());
        assert!(KernReturn::NO_ACCESS.is_access_error());
        assert_eq!(KernReturn(99).name(), "KERN_UNKNOWN");
        assert_eq!(KernReturn::INVALID_ADDRESS.to_string(), "KERN_INVALID_ADDRESS (1)");
    }
}
