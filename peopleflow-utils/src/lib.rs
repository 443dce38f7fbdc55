pub mod date_utils;
pub mod holiday;
pub mod hours;

pub use date_utils::{DateUtilsError, IsoWeek};
pub use holiday::{Holiday, Region};

/// Implement `From<T>` for a type which already implement From<&T>
#[macro_export]
macro_rules! derive_from_reference {
    ($from_type:ty, $impl_type:ty) => {
        impl From<$from_type> for $impl_type {
            fn from(value: $from_type) -> Self {
                Self::from(&value)
            }
        }
    };
}

/// Implement `TryFrom<T>` for a type which already implement TryFrom<&T>
#[macro_export]
macro_rules! derive_try_from_reference {
    ($from_type:ty, $impl_type:ty, $error_type:ty) => {
        impl TryFrom<$from_type> for $impl_type {
            type Error = $error_type;

            fn try_from(value: $from_type) -> Result<Self, Self::Error> {
                Self::try_from(&value)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    struct FirstStruct(i32);
    struct SecondStruct(i32);
    struct ThirdStruct(u8);

    impl From<&FirstStruct> for SecondStruct {
        fn from(value: &FirstStruct) -> Self {
            SecondStruct(value.0)
        }
    }
    derive_from_reference!(FirstStruct, SecondStruct);

    impl TryFrom<&FirstStruct> for ThirdStruct {
        type Error = std::num::TryFromIntError;

        fn try_from(value: &FirstStruct) -> Result<Self, Self::Error> {
            Ok(ThirdStruct(u8::try_from(value.0)?))
        }
    }
    derive_try_from_reference!(FirstStruct, ThirdStruct, std::num::TryFromIntError);

    #[test]
    fn test_derive_from_reference() {
        let first = FirstStruct(42);
        let second: SecondStruct = first.into();
        assert_eq!(second.0, 42);
    }

    #[test]
    fn test_derive_try_from_reference() {
        let third: ThirdStruct = FirstStruct(42).try_into().unwrap();
        assert_eq!(third.0, 42);
        let failed: Result<ThirdStruct, _> = FirstStruct(-1).try_into();
        assert!(failed.is_err());
    }
}
