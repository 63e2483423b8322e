//! Naming convention for completed downloads.
//!
//! Payloads are named `<hash>--[[<catalogID>]]<optional .ext>`, for example
//! `abc123--[[4567]].mkv`. The hash and catalog ID are required; the
//! extension, when present, includes its leading dot.
//!
//! Naming metadata is derived by an ordered chain of pure strategies that
//! stops at the first success:
//!
//! 1. [`NamingStrategy::Primary`] parses the final name handed over by the
//!    download manager.
//! 2. [`NamingStrategy::DirectoryToken`] parses the completion directory name
//!    as a full token.
//! 3. [`NamingStrategy::DirectoryFallback`] takes the leading alphanumeric run
//!    of the completion directory name as the hash, and the catalog ID and
//!    extension from a `name.<digits>.<anything>.<ext>` payload file name.

use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::NamingError;

/// Human-readable form of the naming convention, used in error messages.
pub const NAMING_PATTERN: &str = "<hash>--[[<catalogID>]]<optional .ext>";

static TOKEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9]+)--\[\[([0-9]+)\]\](\.[^/]+)?$").expect("valid regex")
});

static LEADING_ALNUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]+").expect("valid regex"));

static PAYLOAD_CATALOG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.*\.([0-9]+)\..+\.([^.]+)$").expect("valid regex")
});

/// A parsed `(hash, catalogID, extension)` triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingToken {
    /// Alphanumeric content identifier.
    pub hash: String,
    /// Decimal external catalog identifier.
    pub catalog_id: String,
    /// Extension including the leading dot, if the name carried one.
    pub extension: Option<String>,
}

impl NamingToken {
    /// Parse a token from a complete name such as `abc123--[[4567]].mkv`.
    ///
    /// # Returns
    /// `None` unless both hash and catalog ID are present and well formed.
    pub fn parse(name: &str) -> Option<Self> {
        let captures = TOKEN_PATTERN.captures(name)?;
        Some(Self {
            hash: captures[1].to_string(),
            catalog_id: captures[2].to_string(),
            extension: captures.get(3).map(|m| m.as_str().to_string()),
        })
    }

    /// Extension or the empty string.
    pub fn extension_or_empty(&self) -> &str {
        self.extension.as_deref().unwrap_or("")
    }

    /// File name the payload is stored under: `<hash><extension>`.
    pub fn file_name(&self) -> String {
        format!("{}{}", self.hash, self.extension_or_empty())
    }
}

impl fmt::Display for NamingToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}--[[{}]]{}",
            self.hash,
            self.catalog_id,
            self.extension_or_empty()
        )
    }
}

/// Inputs available to the naming strategies.
#[derive(Debug, Clone, Copy)]
pub struct NamingInput<'a> {
    /// Final name from the download manager (bare name or full path).
    pub final_name: &'a str,
    /// Base name of the completion directory before any rename.
    pub directory_name: &'a str,
    /// File name of the selected payload.
    pub payload_name: &'a str,
}

/// A single way of deriving a naming token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamingStrategy {
    /// Parse the final name as a full token.
    Primary,
    /// Parse the completion directory name as a full token.
    DirectoryToken,
    /// Combine the directory name prefix with catalog data from the payload name.
    DirectoryFallback,
}

impl NamingStrategy {
    /// Strategies in the order they are attempted.
    pub const CHAIN: [NamingStrategy; 3] = [
        NamingStrategy::Primary,
        NamingStrategy::DirectoryToken,
        NamingStrategy::DirectoryFallback,
    ];

    /// Short name for logs.
    pub fn name(self) -> &'static str {
        match self {
            NamingStrategy::Primary => "primary",
            NamingStrategy::DirectoryToken => "directory-token",
            NamingStrategy::DirectoryFallback => "directory-fallback",
        }
    }

    /// Attempt this strategy against the inputs.
    pub fn apply(self, input: &NamingInput<'_>) -> Option<NamingToken> {
        match self {
            NamingStrategy::Primary => {
                let final_name: &str = Path::new(input.final_name)
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or(input.final_name);
                NamingToken::parse(final_name)
            }
            NamingStrategy::DirectoryToken => NamingToken::parse(input.directory_name),
            NamingStrategy::DirectoryFallback => {
                let hash: &str = LEADING_ALNUM.find(input.directory_name)?.as_str();
                let captures = PAYLOAD_CATALOG_PATTERN.captures(input.payload_name)?;
                Some(NamingToken {
                    hash: hash.to_string(),
                    catalog_id: captures[1].to_string(),
                    extension: Some(format!(".{}", &captures[2])),
                })
            }
        }
    }
}

/// A token together with the strategy that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    pub token: NamingToken,
    pub strategy: NamingStrategy,
}

/// Run the naming chain, returning the first successful parse.
///
/// # Errors
/// Returns `NamingError` when no strategy matches.
pub fn parse_naming(input: &NamingInput<'_>) -> Result<ParsedName, NamingError> {
    NamingStrategy::CHAIN
        .iter()
        .find_map(|strategy: &NamingStrategy| {
            strategy.apply(input).map(|token: NamingToken| ParsedName {
                token,
                strategy: *strategy,
            })
        })
        .ok_or_else(|| {
            NamingError::new(input.final_name, input.directory_name, input.payload_name)
        })
}
