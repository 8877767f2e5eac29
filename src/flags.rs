// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! The `OptionInfo.flags` bit set.

use bitflags::bitflags;

bitflags! {
    /// Bits controlling where an option may come from and how its value
    /// behaves.
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
    pub struct OptionFlags: u32 {
        /// May be supplied on the command line.
        const COMMAND_LINE          = 1 << 0;
        /// May be supplied via the configured environment variable.
        const ENVIRONMENT_VARIABLE  = 1 << 1;
        /// May be supplied in a configuration file.
        const CONFIGURATION_FILE    = 1 << 2;
        /// A value is required whenever the option is given.
        const REQUIRED              = 1 << 3;
        /// Accepts repeated/extra values.
        const MULTIPLE              = 1 << 4;
        /// Boolean presence; takes no value.
        const FLAG                  = 1 << 5;
        /// Absorbs positional arguments. Mutually exclusive with `FLAG`.
        const DEFAULT_OPTION        = 1 << 6;
        /// On a parse-time problem with this option, the caller should show
        /// usage text (the core only records the bit; rendering is external).
        const SHOW_USAGE_ON_ERROR   = 1 << 7;
        /// Registered at parse time rather than at catalog-build time.
        const DYNAMIC                = 1 << 8;
    }
}

impl OptionFlags {
    /// May this option be supplied from `source`?
    pub fn accepts(self, source: crate::value_store::Source) -> bool {
        use crate::value_store::Source;
        match source {
            Source::CommandLine => self.contains(OptionFlags::COMMAND_LINE),
            Source::Environment => self.contains(OptionFlags::ENVIRONMENT_VARIABLE),
            Source::Configuration => self.contains(OptionFlags::CONFIGURATION_FILE),
            // DIRECT/DEFAULT assignments are API-driven, not source-restricted.
            Source::Direct | Source::Default => true,
        }
    }

    /// Every source the catalog author might have forgotten to restrict the
    /// option to; used only to produce a friendlier "not supported in X"
    /// diagnostic message.
    pub fn display_source(source: crate::value_store::Source) -> &'static str {
        use crate::value_store::Source;
        match source {
            Source::CommandLine => "the command line",
            Source::Environment => "the environment variable",
            Source::Configuration => "a configuration file",
            Source::Direct => "a direct assignment",
            Source::Default => "a default",
        }
    }
}
