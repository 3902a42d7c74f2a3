pub type Result<T> = std::result::Result<T, crate::error::Error>;

#[macro_export]
macro_rules! verify_arg {
    ($name:expr, $expr:expr) => {{
        let result = $expr;
        $crate::result::verify_arg(result, stringify!($name), stringify!($expr))?;
    }};
}

#[inline]
pub fn verify_arg(predicate: bool, name: &str, condition: &str) -> Result<()> {
    if predicate {
        Ok(())
    } else {
        invalid_arg(name, condition)
    }
}

#[cold]
pub fn invalid_arg(name: &str, condition: &str) -> Result<()> {
    Err(crate::error::ErrorKind::InvalidArgument {
        name: name.to_string(),
        message: condition.to_string(),
    }
    .into())
}

#[cfg(test)]
mod tests {
    use crate::error::ErrorKind;

    fn check_size(segment_size: usize) -> crate::Result<usize> {
        verify_arg!(segment_size, segment_size.is_power_of_two());
        Ok(segment_size)
    }

    #[test]
    fn test_verify_arg() {
        assert_eq!(check_size(4096).unwrap(), 4096);
        let err = check_size(3000).unwrap_err();
        match err.kind() {
            ErrorKind::InvalidArgument { name, message } => {
                assert_eq!(name, "segment_size");
                assert_eq!(message, "segment_size.is_power_of_two()");
            }
            other => panic!("unexpected error kind: {other:?}"),
        }
    }
}
