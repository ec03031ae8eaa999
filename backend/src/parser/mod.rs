//! CSV parsing with encoding and delimiter auto-detection.
//!
//! Turns raw CSV text into [`Record`]s keyed by header name. Knows nothing
//! about employees or projects: the typed mapping lives in [`tables`].

pub mod tables;

use std::collections::HashMap;

pub use tables::{assignments_from_records, employees_from_records, projects_from_records};

/// CSV parsing error with the line it was found on
#[derive(Debug, Clone, PartialEq)]
pub struct CsvError {
    pub line: usize,
    pub message: String,
}

impl std::fmt::Display for CsvError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for CsvError {}

impl CsvError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

impl From<csv::Error> for CsvError {
    fn from(err: csv::Error) -> Self {
        let line = err.position().map(|p| p.line() as usize).unwrap_or(0);
        CsvError::new(line, err.to_string())
    }
}

/// One data row. Values are trimmed; empty cells read as absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    /// 1-based source line the row starts on.
    pub line: usize,
    fields: HashMap<String, String>,
}

impl Record {
    /// Value of `column`, or `None` if the column is missing or the cell is empty.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .get(column)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// First non-empty value among `columns`.
    pub fn get_any(&self, columns: &[&str]) -> Option<&str> {
        columns.iter().find_map(|c| self.get(c))
    }

    /// Owned copy of [`Record::get`].
    pub fn text(&self, column: &str) -> Option<String> {
        self.get(column).map(str::to_string)
    }

    #[cfg(test)]
    pub(crate) fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self {
            line: 0,
            fields: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Parsed records, in file order
    pub records: Vec<Record>,
    /// Detected or used delimiter
    pub delimiter: char,
    /// Column headers
    pub headers: Vec<String>,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => String::from_utf8_lossy(bytes).into_owned(),
        "iso-8859-1" | "latin-1" | "latin1" => {
            encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned()
        }
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Decode a CSV file's bytes.
///
/// A UTF-8 BOM or valid UTF-8 wins outright; anything else (spreadsheet
/// exports in a legacy code page) goes through chardet.
pub fn decode_bytes(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(rest).into_owned();
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => decode_content(bytes, &detect_encoding(bytes)),
    }
}

/// Detect the delimiter by counting occurrences in the first line.
/// Defaults to `,`.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse CSV text, detecting the delimiter from the header line.
///
/// # Example
/// ```ignore
/// use directory::parse_csv;
///
/// let result = parse_csv("id,first_name\n1,Jo\n\n2,Sam\n").unwrap();
/// assert_eq!(result.records.len(), 2);
/// assert_eq!(result.records[0].get("first_name"), Some("Jo"));
/// ```
pub fn parse_csv(text: &str) -> Result<ParseResult, CsvError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    parse_csv_with_delimiter(text, detect_delimiter(text))
}

#[derive(Clone, Copy, PartialEq)]
enum QuoteState {
    FieldStart,
    Unquoted,
    Quoted,
    AfterQuote,
}

/// Reject quoting the csv reader would silently accept: a quote that is
/// never closed, a quote inside an unquoted field, and text after a
/// closing quote. Whitespace after a closing quote is allowed.
fn check_quoting(text: &str, delimiter: char) -> Result<(), CsvError> {
    let mut state = QuoteState::FieldStart;
    let mut line = 1;
    let mut opened_on = 1;

    for c in text.chars() {
        state = match (state, c) {
            (QuoteState::Quoted, '"') => QuoteState::AfterQuote,
            (QuoteState::Quoted, _) => QuoteState::Quoted,
            (QuoteState::AfterQuote, '"') => QuoteState::Quoted,
            (_, c) if c == delimiter || c == '\n' => QuoteState::FieldStart,
            (QuoteState::FieldStart, '"') => {
                opened_on = line;
                QuoteState::Quoted
            }
            (QuoteState::FieldStart, _) => QuoteState::Unquoted,
            (QuoteState::Unquoted, '"') => {
                return Err(CsvError::new(line, "Invalid quote in unquoted field"));
            }
            (QuoteState::Unquoted, _) => QuoteState::Unquoted,
            (QuoteState::AfterQuote, ' ' | '\t' | '\r') => QuoteState::AfterQuote,
            (QuoteState::AfterQuote, _) => {
                return Err(CsvError::new(line, "Invalid character after closing quote"));
            }
        };
        if c == '\n' {
            line += 1;
        }
    }

    if state == QuoteState::Quoted {
        return Err(CsvError::new(opened_on, "Quote not closed"));
    }
    Ok(())
}

/// Parse CSV text with an explicit delimiter.
///
/// Blank lines are skipped. Malformed quoting, a data row with a different
/// field count than the header row, and text with no header row are errors.
pub fn parse_csv_with_delimiter(text: &str, delimiter: char) -> Result<ParseResult, CsvError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let delimiter_byte = u8::try_from(delimiter)
        .map_err(|_| CsvError::new(0, format!("Unsupported delimiter '{}'", delimiter)))?;
    check_quoting(text, delimiter)?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter_byte)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(CsvError::new(1, "Empty CSV file: no header row"));
    }

    let mut records = Vec::new();

    for result in reader.records() {
        let row = result?;
        let line = row.position().map(|p| p.line() as usize).unwrap_or(0);

        if row.iter().all(str::is_empty) {
            continue;
        }

        if row.len() != headers.len() {
            return Err(CsvError::new(
                line,
                format!("found {} fields, expected {}", row.len(), headers.len()),
            ));
        }

        let fields = headers
            .iter()
            .cloned()
            .zip(row.iter().map(str::to_string))
            .collect();

        records.push(Record { line, fields });
    }

    Ok(ParseResult {
        records,
        delimiter,
        headers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_csv() {
        let csv = "name,age\nAlice,30\nBob,25";
        let result = parse_csv(csv).unwrap();

        assert_eq!(result.records.len(), 2);
        assert_eq!(result.records[0].get("name"), Some("Alice"));
        assert_eq!(result.records[0].get("age"), Some("30"));
        assert_eq!(result.records[1].get("name"), Some("Bob"));
        assert_eq!(result.headers, vec!["name", "age"]);
    }

    #[test]
    fn test_semicolon_delimiter() {
        let csv = "a;b;c\n1;2;3";
        let result = parse_csv(csv).unwrap();

        assert_eq!(result.delimiter, ';');
        assert_eq!(result.records[0].get("b"), Some("2"));
    }

    #[test]
    fn test_bom_is_stripped_from_first_header() {
        let csv = "\u{feff}id,first_name\n7,Jo";
        let result = parse_csv(csv).unwrap();

        assert_eq!(result.headers[0], "id");
        assert_eq!(result.records[0].get("id"), Some("7"));
    }

    #[test]
    fn test_quoted_values_keep_delimiters() {
        let csv = "name,office\n\"Lee, Jo\",\"Boston Studio 01\"";
        let result = parse_csv(csv).unwrap();

        assert_eq!(result.records[0].get("name"), Some("Lee, Jo"));
        assert_eq!(result.records[0].get("office"), Some("Boston Studio 01"));
    }

    #[test]
    fn test_whitespace_trimmed() {
        let csv = " id , name \n 1 ,  Jo  ";
        let result = parse_csv(csv).unwrap();

        assert_eq!(result.headers, vec!["id", "name"]);
        assert_eq!(result.records[0].get("name"), Some("Jo"));
    }

    #[test]
    fn test_empty_lines_skipped() {
        let csv = "a,b\n1,2\n\n3,4\n\n";
        let result = parse_csv(csv).unwrap();

        assert_eq!(result.records.len(), 2);
        assert_eq!(result.records[1].get("a"), Some("3"));
    }

    #[test]
    fn test_empty_cell_reads_as_absent() {
        let csv = "a,b,c\n1,,3";
        let result = parse_csv(csv).unwrap();

        assert_eq!(result.records[0].get("b"), None);
        assert_eq!(result.records[0].get("missing"), None);
        assert_eq!(result.records[0].get_any(&["b", "c"]), Some("3"));
    }

    #[test]
    fn test_ragged_row_is_an_error() {
        let csv = "a,b\n1,2\n1,2,3";
        let err = parse_csv(csv).unwrap_err();

        assert_eq!(err.line, 3);
        assert!(err.message.contains("expected 2"));
    }

    #[test]
    fn test_header_only_yields_no_records() {
        let result = parse_csv("id,name\n").unwrap();
        assert!(result.records.is_empty());
    }

    #[test]
    fn test_empty_csv_error() {
        let err = parse_csv("").unwrap_err();
        assert!(err.message.contains("Empty"));
    }

    #[test]
    fn test_error_message_format() {
        assert_eq!(CsvError::new(5, "bad value").to_string(), "Line 5: bad value");
    }

    #[test]
    fn test_unclosed_quote_is_an_error() {
        let err = parse_csv("id,name\n1,\"Jo\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("not closed"));
    }

    #[test]
    fn test_quote_inside_unquoted_field_is_an_error() {
        let err = parse_csv("id,name\n1,Jo\"Lee\"x\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("unquoted field"));
    }

    #[test]
    fn test_text_after_closing_quote_is_an_error() {
        let err = parse_csv("id,name\n1,ok\n2,\"Jo\"Lee\n").unwrap_err();
        assert_eq!(err.line, 3);
    }

    #[test]
    fn test_valid_quoting_accepted() {
        let csv = "id,name,note\n1,\"Lee, Jo\" ,\"said \"\"hi\"\"\"\n2,\"two\nlines\",x\r\n";
        let result = parse_csv(csv).unwrap();

        assert_eq!(result.records.len(), 2);
        assert_eq!(result.records[0].get("name"), Some("Lee, Jo"));
        assert_eq!(result.records[0].get("note"), Some("said \"hi\""));
        assert_eq!(result.records[1].get("name"), Some("two\nlines"));
    }

    #[test]
    fn test_detect_delimiter_defaults_to_comma() {
        assert_eq!(detect_delimiter("single_column\n1"), ',');
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), '\t');
        assert_eq!(detect_delimiter("a|b|c"), '|');
    }

    #[test]
    fn test_decode_utf8_with_bom() {
        let bytes = b"\xEF\xBB\xBFid,name\n1,Jos\xC3\xA9";
        let text = decode_bytes(bytes);
        assert!(text.starts_with("id,"));
        assert!(text.ends_with("José"));
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1");
        assert_eq!(decoded, "Société");
        assert_eq!(decode_content(&[0xA4], "iso-8859-1"), "¤");
        assert!(!decode_bytes(bytes).is_empty());
    }
}
