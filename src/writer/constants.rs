//! Writer constants: MATLAB v7.3 tagging names and layout limits.

/// Default ceiling on chunk length, in samples (1 MiB of float64).
pub const DEFAULT_MAX_CHUNK_LEN: u64 = 131_072;

/// Attribute carrying the MATLAB class tag on every group and dataset.
pub(crate) const CLASS_ATTR: &str = "MATLAB_class";

/// Attribute marking uint16 datasets as UTF-16 char data.
pub(crate) const INT_DECODE_ATTR: &str = "MATLAB_int_decode";

/// `MATLAB_int_decode` value for UTF-16 code units.
pub(crate) const UTF16_INT_DECODE: i64 = 2;

pub(crate) const CLASS_STRUCT: &str = "struct";
pub(crate) const CLASS_DOUBLE: &str = "double";
pub(crate) const CLASS_CHAR: &str = "char";
pub(crate) const CLASS_CELL: &str = "cell";

/// Hidden group holding the indirection text datasets.
pub(crate) const REFS_GROUP: &str = "#refs#";

/// Root struct-group holding session-wide text fields.
pub(crate) const PROPERTIES_GROUP: &str = "properties";

/// Text field names under the root properties group.
pub(crate) const DATE_TIME_FIELD: &str = "date_time";
pub(crate) const SAMPLE_PERIOD_FIELD: &str = "sample_period";

/// Optional per-catalog text field carrying the host metadata blob.
pub(crate) const CATALOG_PROPERTIES_FIELD: &str = "properties";

/// Indirection-slot names in insertion order: lowercase, uppercase, digits,
/// then the two trailing symbols. One session supports at most 64 deferred
/// text entries.
pub(crate) const SLOT_ALPHABET: &[u8; 64] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789_-";
