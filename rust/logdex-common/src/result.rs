pub type Result<T> = std::result::Result<T, crate::error::Error>;

/// Returns `InvalidArgument` from the enclosing function unless `$cond`
/// holds. The stringified condition becomes the error message.
#[macro_export]
macro_rules! verify_arg {
    ($name:ident, $cond:expr) => {
        if !$cond {
            return Err($crate::result::failed_arg(
                stringify!($name),
                stringify!($cond),
            ));
        }
    };
}

/// Returns `InvalidFormat` from the enclosing function unless `$cond` holds.
/// Used where stored bytes do not have the expected shape.
#[macro_export]
macro_rules! verify_data {
    ($element:ident, $cond:expr) => {
        if !$cond {
            return Err($crate::result::failed_data(
                stringify!($element),
                stringify!($cond),
            ));
        }
    };
}

#[cold]
#[doc(hidden)]
pub fn failed_arg(name: &str, condition: &str) -> crate::error::Error {
    crate::error::Error::invalid_arg(name, format!("expected {condition}"))
}

#[cold]
#[doc(hidden)]
pub fn failed_data(element: &str, condition: &str) -> crate::error::Error {
    crate::error::Error::invalid_format(element, format!("expected {condition}"))
}

#[cfg(test)]
mod tests {
    use crate::{ErrorKind, Result};

    fn half(n: u32) -> Result<u32> {
        verify_arg!(n, n % 2 == 0);
        Ok(n / 2)
    }

    fn first_byte(bytes: &[u8]) -> Result<u8> {
        verify_data!(payload, !bytes.is_empty());
        Ok(bytes[0])
    }

    #[test]
    fn test_verify_macros() {
        assert_eq!(half(8).unwrap(), 4);
        let err = half(7).unwrap_err();
        assert_eq!(err.to_string(), "invalid argument n: expected n % 2 == 0");

        assert_eq!(first_byte(&[3]).unwrap(), 3);
        assert!(matches!(
            first_byte(&[]).unwrap_err().kind(),
            ErrorKind::InvalidFormat { .. }
        ));
    }
}
