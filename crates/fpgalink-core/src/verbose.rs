//! Verbosity levels shared by every component

/// How chatty a component should be
///
/// This gates output the components produce on their own (scan tables,
/// chain listings, command echo). Filtering of regular `log` records is left
/// to the logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum VerboseLevel {
    /// Errors only
    Quiet = -1,
    /// Default level
    #[default]
    Normal = 0,
    /// Extra progress and listing output
    Verbose = 1,
    /// Everything, including raw traffic
    Debug = 2,
}

impl VerboseLevel {
    /// Map a signed level as used on the command line (-1..=2)
    pub fn from_level(level: i8) -> Self {
        match level {
            i8::MIN..=-1 => VerboseLevel::Quiet,
            0 => VerboseLevel::Normal,
            1 => VerboseLevel::Verbose,
            _ => VerboseLevel::Debug,
        }
    }

    /// True above [`VerboseLevel::Normal`]
    pub fn is_verbose(self) -> bool {
        self > VerboseLevel::Normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_level() {
        assert_eq!(VerboseLevel::from_level(-5), VerboseLevel::Quiet);
        assert_eq!(VerboseLevel::from_level(0), VerboseLevel::Normal);
        assert_eq!(VerboseLevel::from_level(1), VerboseLevel::Verbose);
        assert_eq!(VerboseLevel::from_level(7), VerboseLevel::Debug);
        assert!(VerboseLevel::Verbose.is_verbose());
        assert!(!VerboseLevel::Normal.is_verbose());
    }
}
