// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! entity_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.trim().is_empty()
            }

            /// First eight characters, the way ids are shown in headings.
            pub fn short(&self) -> &str {
                match self.0.char_indices().nth(8) {
                    Some((end, _)) => &self.0[..end],
                    None => &self.0,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

entity_id!(LoanApplicationId);
entity_id!(LoanTypeId);
entity_id!(CustomerId);
entity_id!(ApplicantId);

#[cfg(test)]
mod tests {
    use super::LoanApplicationId;

    #[test]
    fn short_id_truncates_to_eight_chars() {
        let id = LoanApplicationId::new("66f1c0ffee0123456789abcd");
        assert_eq!(id.short(), "66f1c0ff");
        assert_eq!(LoanApplicationId::new("abc").short(), "abc");
    }

    #[test]
    fn ids_serialize_as_plain_strings() -> anyhow::Result<()> {
        let id = LoanApplicationId::from("app-1");
        assert_eq!(serde_json::to_string(&id)?, "\"app-1\"");
        Ok(())
    }
}
