//! Domain models shared by every service

pub mod account;
pub mod attendance;
pub mod employee;
pub mod employee_id;
pub mod payroll;
pub mod session;
pub mod setting;

// Re-export for convenience
pub use account::{Account, Role};
pub use attendance::{AttendanceFilter, AttendanceRecord, AttendanceStatus};
pub use employee::{Employee, EmployeeFilter, EmployeeStatus, EmployeeUpdate};
pub use employee_id::{EmployeeId, InvalidEmployeeId};
pub use payroll::{PayrollFilter, PayrollRecord, PayrollStatus};
pub use session::{NewSession, Session};
pub use setting::Setting;

/// Error returned when a stored or submitted enum value is unknown
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("Unknown {kind} value: {value:?}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Declare a lower_snake_case text enum persisted as `TEXT`
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::models::UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err($crate::models::UnknownVariant {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

pub(crate) use text_enum;
