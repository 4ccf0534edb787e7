//! Sequential identifiers and money amounts.
//!
//! Downstream loaders join tables on these identifiers, so their textual
//! form is part of the interchange contract: a fixed prefix followed by a
//! zero-padded 1-based sequence number.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! sequential_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal, $width:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u32);

        impl $name {
            /// The textual prefix shared by every identifier of this kind.
            pub const PREFIX: &'static str = $prefix;
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{:0", $width, "}"), self.0)
            }
        }
    };
}

sequential_id!(
    /// Patient key shared by both record systems, e.g. `PT00001`.
    PatientId, "PT", 5
);
sequential_id!(
    /// Prescription lineage number, e.g. `RX00000001`. Refills reuse it.
    RxNumber, "RX", 8
);
sequential_id!(
    /// Adjudication transaction key, e.g. `TXN0000001`.
    TransactionId, "TXN", 7
);
sequential_id!(
    /// Clinical note key, e.g. `NOTE00000001`.
    NoteId, "NOTE", 8
);

/// A non-negative US dollar amount held in whole cents.
///
/// Integer cents keep `paid + patient_pay == submitted` exact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cents(pub u64);

impl Cents {
    pub const ZERO: Cents = Cents(0);

    /// Build an amount from whole dollars.
    pub fn from_dollars(dollars: u64) -> Self {
        Self(dollars * 100)
    }

    pub fn saturating_sub(self, other: Cents) -> Cents {
        Cents(self.0.saturating_sub(other.0))
    }
}

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}
