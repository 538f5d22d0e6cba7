//! File access policy.
//!
//! A [`FileAccess`] value travels with every open database and decides
//! whether reading or writing its file is allowed at all. The default is
//! [`FileAccess::NONE`]: callers opt in explicitly.

use crate::Scope;

bitflags::bitflags! {
    /// Which preferences files may be read or written.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FileAccess: u32 {
        /// Applications may read user preference files.
        const USER_READ_OK = 0x0001;
        /// Applications may create and write user preference files.
        const USER_WRITE_OK = 0x0002;
        /// Applications may read, create and write user preference files.
        const USER_OK = Self::USER_READ_OK.bits() | Self::USER_WRITE_OK.bits();
        /// Applications may read system-wide preference files.
        const SYSTEM_READ_OK = 0x0004;
        /// Applications may create and write system-wide preference files.
        const SYSTEM_WRITE_OK = 0x0008;
        /// Applications may read, create and write system-wide preference files.
        const SYSTEM_OK = Self::SYSTEM_READ_OK.bits() | Self::SYSTEM_WRITE_OK.bits();
        /// Applications may read, create and write any preference file.
        const APP_OK = Self::SYSTEM_OK.bits() | Self::USER_OK.bits();
        /// Core library databases may be read. A scope read bit is also needed.
        const CORE_READ_OK = 0x0010;
        /// Core library databases may be written. A scope write bit is also needed.
        const CORE_WRITE_OK = 0x0020;
        /// Core library databases may be read, created and written.
        const CORE_OK = Self::CORE_READ_OK.bits() | Self::CORE_WRITE_OK.bits();
        /// Everything may be read.
        const ALL_READ_OK = Self::USER_READ_OK.bits()
            | Self::SYSTEM_READ_OK.bits()
            | Self::CORE_READ_OK.bits();
        /// Everything may be created and written.
        const ALL_WRITE_OK = Self::USER_WRITE_OK.bits()
            | Self::SYSTEM_WRITE_OK.bits()
            | Self::CORE_WRITE_OK.bits();
        /// Everything may be read, created and written.
        const ALL = Self::ALL_READ_OK.bits() | Self::ALL_WRITE_OK.bits();
    }
}

impl FileAccess {
    /// No filesystem access at all.
    pub const NONE: Self = Self::empty();

    /// Whether a database in `scope` may be read.
    pub fn allows_read(self, scope: Scope, core: bool) -> bool {
        let scope_bit = match scope {
            Scope::User => Self::USER_READ_OK,
            Scope::System => Self::SYSTEM_READ_OK,
        };
        self.contains(scope_bit) && (!core || self.contains(Self::CORE_READ_OK))
    }

    /// Whether a database in `scope` may be created or written.
    pub fn allows_write(self, scope: Scope, core: bool) -> bool {
        let scope_bit = match scope {
            Scope::User => Self::USER_WRITE_OK,
            Scope::System => Self::SYSTEM_WRITE_OK,
        };
        self.contains(scope_bit) && (!core || self.contains(Self::CORE_WRITE_OK))
    }
}
