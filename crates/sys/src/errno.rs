use core::ffi::c_int;

/// Error codes reported through newlib's `errno`.
///
/// Values follow newlib's `<sys/errno.h>`, which differs from Linux for
/// `ENOSYS` (88 rather than 38).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[repr(i32)]
pub enum Errno {
    /// `EBADF`: the call does not serve this descriptor.
    #[error("bad file descriptor")]
    BadFd = 9,
    /// `EINVAL`: null output pointer or out-of-range argument.
    #[error("invalid argument")]
    Invalid = 22,
    /// `ENOSYS`: no backing resource for the operation.
    #[error("function not implemented")]
    NoSys = 88,
}

impl Errno {
    pub const fn code(self) -> c_int {
        self as c_int
    }

    pub const fn from_code(code: c_int) -> Option<Self> {
        match code {
            9 => Some(Self::BadFd),
            22 => Some(Self::Invalid),
            88 => Some(Self::NoSys),
            _ => None,
        }
    }
}

pub type SysResult<T> = Result<T, Errno>;
