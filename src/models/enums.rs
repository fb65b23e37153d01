use crate::db::DatabaseError;

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(SampleStatus {
    Open => "open",
    Done => "done",
});

str_enum!(StatusFilter {
    Open => "open",
    Done => "done",
    All => "all",
});

/// Configurable locations in the settings file.
str_enum!(PathKey {
    Database => "database",
    AuditFile => "audit-file",
    ExportDir => "export-dir",
});

impl StatusFilter {
    pub fn accepts(&self, status: SampleStatus) -> bool {
        match self {
            Self::All => true,
            Self::Open => status == SampleStatus::Open,
            Self::Done => status == SampleStatus::Done,
        }
    }
}
