use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            pub fn to_uuid(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$name> for Uuid {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

// Combat participants
define_id!(ActorId);
define_id!(ItemId);

// Armed reactions
define_id!(ReactionId);

// One concrete action being performed (a check, a strike, a movement action).
// Used to scope declines and to dedup provocations.
define_id!(ActionInstanceId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_round_trip_through_uuid() {
        let a = ActorId::new();
        let b = ActorId::new();
        assert_ne!(a, b);
        assert_eq!(ActorId::from_uuid(a.to_uuid()), a);
    }

    #[test]
    fn id_display_matches_uuid() {
        let id = ReactionId::new();
        assert_eq!(id.to_string(), id.as_uuid().to_string());
    }
}
