//! Newtype IDs for type-safe entity references.
//!
//! Every row in the hosted backend is keyed by a UUID. The `define_id!`
//! macro wraps that UUID per entity so a `MenuId` can never be passed where
//! a `CampaignId` is expected.

use uuid::Uuid;

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around [`uuid::Uuid`] with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Constructors `new()` (random v4) and `from_uuid()`, accessor `as_uuid()`
/// - `From<Uuid>` and `Into<Uuid>` implementations
///
/// # Example
///
/// ```rust
/// # use restodash_core::define_id;
/// define_id!(TableId);
/// define_id!(WaiterId);
///
/// let table = TableId::new();
/// let raw = table.as_uuid();
/// assert_eq!(TableId::from_uuid(raw), table);
///
/// // These are different types, so this won't compile:
/// // let _: WaiterId = table;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(::uuid::Uuid);

        impl $name {
            /// Generate a fresh random ID.
            #[must_use]
            pub fn new() -> Self {
                Self(::uuid::Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            #[must_use]
            pub const fn from_uuid(id: ::uuid::Uuid) -> Self {
                Self(id)
            }

            /// Get the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> ::uuid::Uuid {
                self.0
            }
        }

        impl ::core::default::Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ::uuid::Error;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                ::uuid::Uuid::parse_str(s).map(Self)
            }
        }

        impl From<::uuid::Uuid> for $name {
            fn from(id: ::uuid::Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for ::uuid::Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

// Define standard entity IDs
define_id!(UserId);
define_id!(RestaurantId);
define_id!(MenuId);
define_id!(MenuItemId);
define_id!(CampaignId);
define_id!(SubscriptionId);
define_id!(LandingPageId);

impl RestaurantId {
    /// The restaurant owned by `owner`.
    ///
    /// Restaurants are one-to-one with identities and share the owner's key.
    #[must_use]
    pub const fn for_owner(owner: UserId) -> Self {
        Self(owner.as_uuid())
    }
}

impl From<UserId> for RestaurantId {
    fn from(owner: UserId) -> Self {
        Self::for_owner(owner)
    }
}

/// Parse any entity ID from its hyphenated string form.
///
/// # Errors
///
/// Returns `uuid::Error` if the input is not a valid UUID.
pub fn parse_id<T: From<Uuid>>(s: &str) -> Result<T, uuid::Error> {
    Uuid::parse_str(s).map(T::from)
}
