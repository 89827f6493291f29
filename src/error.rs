//! Error types for parsing and XPath evaluation.
//!
//! Every failure carries a stable numeric code. The high 16 bits name the
//! domain (`1` for the parser, `12` for XPath) and the low bits the
//! condition, so an empty document reports `0x10004`.

use thiserror::Error;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

const PARSER_DOMAIN: u32 = 1 << 16;
const XPATH_DOMAIN: u32 = 12 << 16;

/// Broad failure category, independent of the precise condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The input bytes are not a well-formed XML document.
    MalformedDocument,
    /// The XPath expression could not be compiled or evaluated.
    InvalidExpression,
}

/// Well-formedness conditions reported by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ParseErrorCode {
    DepthLimitExceeded = 1,
    /// No root element: empty input, whitespace only, or prolog only.
    DocumentEmpty = 4,
    /// Content after the root element.
    ExtraContent = 5,
    InvalidCharRef = 8,
    InvalidChar = 9,
    EntityRefSemicolonMissing = 23,
    UndeclaredEntity = 26,
    LtInAttributeValue = 38,
    AttributeNotStarted = 39,
    AttributeNotFinished = 40,
    AttributeWithoutValue = 41,
    AttributeRedefined = 42,
    CommentNotFinished = 45,
    PiNotFinished = 47,
    XmlDeclNotFinished = 57,
    DoctypeNotFinished = 61,
    MisplacedCdataEnd = 62,
    CdataNotFinished = 63,
    /// `<?xml ...?>` anywhere but the very start of the input.
    ReservedXmlName = 64,
    NameRequired = 68,
    GtRequired = 73,
    TagNameMismatch = 76,
    TagNotFinished = 77,
    HyphenInComment = 80,
    InvalidEncoding = 81,
}

impl ParseErrorCode {
    /// Stable numeric value including the parser domain.
    #[inline]
    pub fn value(self) -> u32 {
        PARSER_DOMAIN | self as u32
    }
}

/// XPath compilation and evaluation conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum XPathErrorCode {
    NumberError = 1201,
    UnfinishedLiteral = 1202,
    UndefinedVariable = 1205,
    InvalidPredicate = 1206,
    ExpressionError = 1207,
    Unclosed = 1208,
    UnknownFunction = 1209,
    InvalidType = 1211,
    InvalidArity = 1212,
    InvalidChar = 1221,
}

impl XPathErrorCode {
    /// Stable numeric value including the XPath domain.
    #[inline]
    pub fn value(self) -> u32 {
        XPATH_DOMAIN | self as u32
    }
}

/// A well-formedness error with the byte offset where it was detected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (code {:#x}, offset {position})", .code.value())]
pub struct ParseError {
    pub code: ParseErrorCode,
    pub message: String,
    pub position: usize,
}

impl ParseError {
    pub fn new(code: ParseErrorCode, message: impl Into<String>, position: usize) -> Self {
        ParseError {
            code,
            message: message.into(),
            position,
        }
    }

    #[inline]
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::MalformedDocument
    }
}

/// An XPath error. `position` is the character offset in the expression
/// when the failure is syntactic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (code {:#x})", .code.value())]
pub struct XPathError {
    pub code: XPathErrorCode,
    pub message: String,
    pub position: Option<usize>,
}

impl XPathError {
    pub fn new(code: XPathErrorCode, message: impl Into<String>) -> Self {
        XPathError {
            code,
            message: message.into(),
            position: None,
        }
    }

    pub fn at(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    #[inline]
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidExpression
    }
}

/// Any error produced by this crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("malformed document: {0}")]
    Parse(#[from] ParseError),

    #[error("invalid XPath expression: {0}")]
    XPath(#[from] XPathError),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Parse(e) => e.kind(),
            Error::XPath(e) => e.kind(),
        }
    }

    /// Stable numeric code, e.g. `0x10004` for an empty document.
    pub fn code(&self) -> u32 {
        match self {
            Error::Parse(e) => e.code.value(),
            Error::XPath(e) => e.code.value(),
        }
    }
}
