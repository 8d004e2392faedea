/// Defines a newtype ID wrapper around a `uuid::Uuid` and generates:
/// - derives (Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)
/// - transparent serde representation (the bare UUID string)
/// - `Display` and `FromStr`
/// - `From<Uuid> for $name` and `From<$name> for Uuid`
///
/// Usage:
///   define_id_type!(UserId);
#[macro_export]
macro_rules! define_id_type {
    ($name:ident) => {
        #[derive(
            Debug,
            Copy,
            Clone,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub ::uuid::Uuid);

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                ::std::write!(f, "{}", self.0)
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = ::uuid::Error;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                ::uuid::Uuid::parse_str(s.trim()).map($name)
            }
        }

        impl ::std::convert::From<::uuid::Uuid> for $name {
            fn from(v: ::uuid::Uuid) -> Self {
                $name(v)
            }
        }

        impl ::std::convert::From<$name> for ::uuid::Uuid {
            fn from(v: $name) -> Self {
                v.0
            }
        }

        impl $name {
            pub fn new(value: ::uuid::Uuid) -> Self {
                $name(value)
            }

            /// Fresh random (v4) identifier.
            pub fn random() -> Self {
                $name(::uuid::Uuid::new_v4())
            }

            pub fn value(&self) -> ::uuid::Uuid {
                self.0
            }
        }
    };
}
