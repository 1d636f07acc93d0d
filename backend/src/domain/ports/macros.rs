//! Port error enums with struct-like variants and snake-case constructors.
//!
//! Each variant `Name { field: Ty, .. } => "format"` becomes a
//! `thiserror` variant plus `fn name(field: impl Into<Ty>, ..) -> Self`.

macro_rules! define_port_error {
    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident { $($field:ident : $ty:ty),+ $(,)? } => $message:literal
            ),+ $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[error($message)]
                $variant { $($field: $ty),+ },
            )+
        }

        impl $name {
            $(
                ::paste::paste! {
                    #[doc = "Build a [`" $name "::" $variant "`] error."]
                    pub fn [<$variant:snake>]($($field: impl Into<$ty>),+) -> Self {
                        Self::$variant { $($field: $field.into()),+ }
                    }
                }
            )+
        }
    };
}

pub(crate) use define_port_error;

#[cfg(test)]
mod tests {
    use crate::domain::EntityId;
    use rstest::rstest;

    define_port_error! {
        pub enum AssignmentPortError {
            Rejected { reason: String } => "rejected: {reason}",
            OverCapacity { assignee: EntityId, open: u64 } => "{assignee} already holds {open} duties",
        }
    }

    #[rstest]
    fn string_fields_accept_str() {
        let err = AssignmentPortError::rejected("closed");
        assert_eq!(err, AssignmentPortError::Rejected { reason: "closed".to_owned() });
        assert_eq!(err.to_string(), "rejected: closed");
    }

    #[rstest]
    fn mixed_fields_render_in_the_message() {
        let assignee = EntityId::random();
        let err = AssignmentPortError::over_capacity(assignee, 7_u64);
        assert_eq!(err.to_string(), format!("{assignee} already holds 7 duties"));
    }
}
