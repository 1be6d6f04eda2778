//! Operation mode enums. Each one is parsed leniently from the tool argument:
//! an absent or unrecognized value falls back to the documented default.

use std::fmt;

/// Declare a mode enum with its wire labels and default variant
macro_rules! define_mode {
    (
        $(#[$meta:meta])*
        $name:ident, default = $default:ident, { $($variant:ident => $label:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Every variant, in declaration order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Wire label of this mode
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }

            /// Parse a wire label, falling back to the default for unknown or missing input
            pub fn parse_or_default(value: Option<&str>) -> Self {
                let Some(value) = value else {
                    return Self::default();
                };
                let value = value.trim().to_lowercase();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|mode| mode.as_str() == value)
                    .unwrap_or_default()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }
    };
}

define_mode!(
    /// Summary style for `summarize`
    SummaryMode, default = Brief, {
        Brief => "brief",
        Detailed => "detailed",
        BulletPoints => "bullet_points",
    }
);

define_mode!(
    /// Matching strategy for `search`
    SearchMode, default = Fuzzy, {
        Exact => "exact",
        Fuzzy => "fuzzy",
        Regex => "regex",
    }
);

define_mode!(
    /// Comparison report kind for `compare`
    ComparisonMode, default = Content, {
        Content => "content",
        Structure => "structure",
        Metadata => "metadata",
        Comprehensive => "comprehensive",
    }
);

define_mode!(
    /// Report depth for `analyze_structure`
    AnalysisDepth, default = Detailed, {
        Basic => "basic",
        Detailed => "detailed",
        Comprehensive => "comprehensive",
    }
);

define_mode!(
    /// Combination strategy for `merge`
    MergeStrategy, default = Smart, {
        Sequential => "sequential",
        Interleaved => "interleaved",
        Smart => "smart",
    }
);

define_mode!(
    /// Segmentation strategy for `split`
    SplitMethod, default = BySections, {
        ByPages => "by_pages",
        ByHeadings => "by_headings",
        BySections => "by_sections",
        BySize => "by_size",
    }
);

define_mode!(
    /// Surface syntax of template placeholders
    TemplateSyntax, default = Mustache, {
        Mustache => "mustache",
        Percent => "percent",
        Dollar => "dollar",
    }
);

define_mode!(
    /// What `read_document` returns
    ExtractType, default = Text, {
        Text => "text",
        Structured => "structured",
        Metadata => "metadata",
    }
);

define_mode!(
    /// Output representation for extracted tables
    TableFormat, default = Json, {
        Json => "json",
        Csv => "csv",
        Markdown => "markdown",
    }
);
