//! TDS protocol version definitions.

use core::fmt;

/// TDS protocol version, as negotiated at login.
///
/// The codec layer only cares about a handful of cut lines: the Sybase
/// 5.0 family versus the Microsoft 7.x family, and within 7.x the 7.1
/// (collation) and 7.2 (chunked large objects, multi-part table names)
/// feature levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TdsVersion(u32);

impl TdsVersion {
    /// TDS 5.0 (Sybase ASE)
    pub const V5_0: Self = Self(0x0500_0000);

    /// TDS 7.0 (SQL Server 7.0)
    pub const V7_0: Self = Self(0x7000_0000);

    /// TDS 7.1 (SQL Server 2000)
    pub const V7_1: Self = Self(0x7100_0000);

    /// TDS 7.2 (SQL Server 2005)
    pub const V7_2: Self = Self(0x7209_0002);

    /// TDS 7.3A (SQL Server 2008)
    pub const V7_3A: Self = Self(0x730A_0003);

    /// TDS 7.4 (SQL Server 2012+)
    pub const V7_4: Self = Self(0x7400_0004);

    /// TDS 8.0 (SQL Server 2022+ strict encryption mode)
    ///
    /// Note: TDS 8.0 uses a different version encoding that is numerically
    /// lower than the 7.x values, but it is semantically the newest.
    pub const V8_0: Self = Self(0x0800_0000);

    /// Create a version from the raw negotiated value.
    #[must_use]
    pub const fn new(version: u32) -> Self {
        Self(version)
    }

    /// Get the raw version value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Check if this is TDS 8.0.
    #[must_use]
    pub const fn is_tds_8(self) -> bool {
        self.0 == Self::V8_0.0
    }

    /// Check if this version is in the Sybase 5.0 family.
    #[must_use]
    pub const fn is_tds_5(self) -> bool {
        self.0 == Self::V5_0.0
    }

    /// Check if this version is in the Microsoft 7.x family (or newer).
    #[must_use]
    pub const fn is_tds_7_plus(self) -> bool {
        self.is_tds_8() || self.0 >= Self::V7_0.0
    }

    /// Check if this version carries collation tags on character columns.
    ///
    /// Collations were introduced in TDS 7.1 (SQL Server 2000).
    #[must_use]
    pub const fn is_tds_71_plus(self) -> bool {
        self.is_tds_8() || self.0 >= Self::V7_1.0
    }

    /// Check if this version supports chunked large-object transfer and
    /// multi-part table names.
    ///
    /// Both were introduced in TDS 7.2 (SQL Server 2005).
    #[must_use]
    pub const fn is_tds_72_plus(self) -> bool {
        self.is_tds_8() || self.0 >= Self::V7_2.0
    }

    /// Check if this version supports DATE, TIME, DATETIME2, and
    /// DATETIMEOFFSET columns (TDS 7.3, SQL Server 2008).
    #[must_use]
    pub const fn supports_date_time_types(self) -> bool {
        self.is_tds_8() || self.0 >= Self::V7_3A.0
    }

    /// Get the SQL Server / ASE product name for this version.
    #[must_use]
    pub const fn product_name(self) -> &'static str {
        match self.0 {
            0x0500_0000 => "Sybase ASE",
            0x7000_0000 => "SQL Server 7.0",
            0x7100_0000 => "SQL Server 2000",
            0x7209_0002 => "SQL Server 2005",
            0x730A_0003 => "SQL Server 2008",
            0x7400_0004 => "SQL Server 2012+",
            0x0800_0000 => "SQL Server 2022+ (strict mode)",
            _ => "unknown server version",
        }
    }
}

impl Default for TdsVersion {
    fn default() -> Self {
        Self::V7_4
    }
}

impl fmt::Display for TdsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            0x0500_0000 => write!(f, "TDS 5.0"),
            0x7000_0000 => write!(f, "TDS 7.0"),
            0x7100_0000 => write!(f, "TDS 7.1"),
            0x7209_0002 => write!(f, "TDS 7.2"),
            0x730A_0003 => write!(f, "TDS 7.3"),
            0x7400_0004 => write!(f, "TDS 7.4"),
            0x0800_0000 => write!(f, "TDS 8.0"),
            other => write!(f, "TDS (0x{other:08X})"),
        }
    }
}

impl From<u32> for TdsVersion {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<TdsVersion> for u32 {
    fn from(version: TdsVersion) -> Self {
        version.0
    }
}
