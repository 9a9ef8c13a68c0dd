//! Defines helper macros for generating domain port error enums.

macro_rules! define_port_error {
    (@ctor $variant:ident) => {
        ::paste::paste! {
            pub fn [<$variant:snake>]() -> Self {
                Self::$variant
            }
        }
    };

    (@ctor $variant:ident { $($field:ident : $ty:ty),* $(,)? }) => {
        define_port_error!(@ctor_impl $variant () () $( $field : $ty, )*);
    };

    (@ctor_impl $variant:ident ($($params:tt)*) ($($inits:tt)*) ) => {
        ::paste::paste! {
            pub fn [<$variant:snake>]($($params)*) -> Self {
                Self::$variant { $($inits)* }
            }
        }
    };

    (@ctor_impl $variant:ident ($($params:tt)*) ($($inits:tt)*) $field:ident : $ty:ty, $($rest:tt)*) => {
        define_port_error!(
            @ctor_impl
            $variant
            ($($params)* $field: impl Into<$ty>,)
            ($($inits)* $field: $field.into(),)
            $($rest)*
        );
    };
    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $( { $($field:ident : $ty:ty),* $(,)? } )? => $message:expr
            ),* $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[error($message)]
                $variant $( { $($field : $ty),* } )?,
            )*
        }

        impl $name {
            $(
                define_port_error!(@ctor $variant $( { $($field : $ty),* } )?);
            )*
        }
    };
}

pub(crate) use define_port_error;

#[cfg(test)]
mod tests {
    //! Constructor generation coverage for port error enums.
    define_port_error! {
        pub enum ProbePortError {
            Transport { message: String } => "transport: {message}",
            Exit { status: Option<i32> } => "exit: {status:?}",
            Missing { collection_id: String, attempts: u32 } => "missing {collection_id} after {attempts}",
            Closed => "closed",
        }
    }

    #[test]
    fn constructors_accept_str_for_string_fields() {
        let err = ProbePortError::transport("socket reset");
        assert_eq!(err.to_string(), "transport: socket reset");
    }

    #[test]
    fn constructors_preserve_non_string_types() {
        let err = ProbePortError::exit(Some(2));
        assert_eq!(err.to_string(), "exit: Some(2)");
    }

    #[test]
    fn constructors_support_mixed_fields() {
        let err = ProbePortError::missing("landsat", 3_u32);
        assert_eq!(err.to_string(), "missing landsat after 3");
    }

    #[test]
    fn unit_variants_get_zero_argument_constructors() {
        assert_eq!(ProbePortError::closed(), ProbePortError::Closed);
    }
}
