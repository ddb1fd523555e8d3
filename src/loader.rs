//! Loader for delimited S-N data files.
//!
//! A data file starts with a fixed number of free-text header lines, kept
//! verbatim, followed by one `<stress><delim><cycles>` row per test. A row
//! whose stress field is prefixed with the runout marker is a runout: the
//! marker is stripped and the row flagged.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, SnError};
use crate::types::{DataSet, Observation, Slot};

/// Runout markers that cannot be confused with numeric syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunoutMarker {
    Asterisk,
    Caret,
    Ampersand,
}

impl RunoutMarker {
    pub const fn as_char(self) -> char {
        match self {
            Self::Asterisk => '*',
            Self::Caret => '^',
            Self::Ampersand => '&',
        }
    }
}

impl TryFrom<char> for RunoutMarker {
    type Error = SnError;

    fn try_from(value: char) -> Result<Self> {
        match value {
            '*' => Ok(Self::Asterisk),
            '^' => Ok(Self::Caret),
            '&' => Ok(Self::Ampersand),
            other => Err(SnError::UnsupportedRunoutMarker(other)),
        }
    }
}

/// How a data file is laid out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Field delimiter.
    pub delimiter: char,
    /// Prefix marking a runout row.
    pub runout_marker: char,
    /// Free-text lines preceding the data.
    pub header_lines: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            runout_marker: '*',
            header_lines: 2,
        }
    }
}

impl LoadOptions {
    /// Validates the marker and delimiter, returning the marker and the
    /// delimiter byte.
    pub fn validate(&self) -> Result<(RunoutMarker, u8)> {
        let marker = RunoutMarker::try_from(self.runout_marker)?;
        let d = self.delimiter;
        let byte = u8::try_from(d)
            .ok()
            .filter(u8::is_ascii)
            .ok_or(SnError::InvalidDelimiter(d, "must be a single ASCII character"))?;
        if d.is_ascii_digit() || matches!(d, '.' | '+' | '-' | 'e' | 'E') {
            return Err(SnError::InvalidDelimiter(d, "collides with numeric syntax"));
        }
        if matches!(d, '"' | '\n' | '\r') {
            return Err(SnError::InvalidDelimiter(d, "is reserved"));
        }
        if d == marker.as_char() {
            return Err(SnError::InvalidDelimiter(d, "is also the runout marker"));
        }
        Ok((marker, byte))
    }
}

/// Reads a delimiter as given on a command line: a single character, the
/// escape `\t`, or one of the names `tab`, `space`, `comma`, `semicolon`.
pub fn parse_delimiter(text: &str) -> Result<char> {
    match text {
        "\\t" | "tab" | "TAB" => Ok('\t'),
        "space" => Ok(' '),
        "comma" => Ok(','),
        "semicolon" => Ok(';'),
        _ => {
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(c),
                _ => Err(SnError::InvalidSetting(format!(
                    "delimiter must be a single character, '\\t' or a name such as 'tab', got '{text}'"
                ))),
            }
        }
    }
}

/// Reads a data file into a data set for `slot`.
pub fn load_dataset(path: &Path, slot: Slot, options: &LoadOptions) -> Result<DataSet> {
    let content = fs::read_to_string(path).map_err(|source| SnError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let origin = path.display().to_string();
    let (headers, observations) = parse_rows(&content, options, &origin)?;

    let runouts = observations.iter().filter(|o| o.runout).count();
    info!(
        slot = %slot,
        path = %origin,
        rows = observations.len(),
        runouts,
        "loaded data set"
    );

    Ok(DataSet {
        slot,
        headers,
        observations,
        source: Some(path.to_path_buf()),
    })
}

/// Parses data-file text into a data set for `slot`.
pub fn parse_dataset(content: &str, slot: Slot, options: &LoadOptions) -> Result<DataSet> {
    let (headers, observations) = parse_rows(content, options, "input")?;
    Ok(DataSet::new(slot, headers, observations))
}

fn parse_rows(
    content: &str,
    options: &LoadOptions,
    origin: &str,
) -> Result<(Vec<String>, Vec<Observation>)> {
    let (marker, delimiter) = options.validate()?;
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let mut rest = content;
    let mut headers = Vec::with_capacity(options.header_lines);
    for _ in 0..options.header_lines {
        if rest.is_empty() {
            break;
        }
        let (line, tail) = rest.split_once('\n').unwrap_or((rest, ""));
        headers.push(line.trim_end_matches('\r').to_string());
        rest = tail;
    }
    let line_offset = headers.len() as u64;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(rest.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map_or(0, csv::Position::line) + line_offset;
        if record.iter().all(str::is_empty) {
            continue;
        }
        if record.len() < 2 {
            return Err(SnError::Parse {
                line,
                message: format!(
                    "expected stress and cycles separated by {:?}, found {} field(s)",
                    options.delimiter,
                    record.len()
                ),
            });
        }

        let (stress, runout) = parse_field(&record[0], Some(marker), line)?;
        let (cycles, _) = parse_field(&record[1], None, line)?;
        rows.push((
            line,
            Observation {
                stress,
                cycles,
                runout,
            },
        ));
    }

    // Checked only once the whole file has parsed: a negative value is
    // usually a runout marker the options did not name.
    if let Some((line, _)) = rows
        .iter()
        .find(|(_, o)| o.stress < 0.0 || o.cycles < 0.0)
    {
        return Err(SnError::NegativeValue {
            line: *line,
            marker: marker.as_char(),
        });
    }
    if let Some((line, _)) = rows
        .iter()
        .find(|(_, o)| o.stress == 0.0 || o.cycles == 0.0)
    {
        return Err(SnError::ZeroValue { line: *line });
    }
    if rows.is_empty() {
        return Err(SnError::NoObservations {
            origin: origin.to_string(),
        });
    }

    debug!(headers = headers.len(), rows = rows.len(), "parsed data rows");
    Ok((headers, rows.into_iter().map(|(_, o)| o).collect()))
}

/// Parses one token. Only a token read with `marker` may carry it.
fn parse_field(token: &str, marker: Option<RunoutMarker>, line: u64) -> Result<(f64, bool)> {
    if let Some(value) = parse_number(token) {
        return Ok((value, false));
    }
    marker
        .and_then(|marker| token.strip_prefix(marker.as_char()))
        .and_then(|rest| parse_number(rest.trim_start()))
        .map(|value| (value, true))
        .ok_or_else(|| SnError::Parse {
            line,
            message: format!("'{token}' is not a number"),
        })
}

fn parse_number(token: &str) -> Option<f64> {
    token.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = "Butt weld, as welded\nR=0.1, 10 Hz\n200,120000\n150,410000\n*90,5000000\n";

    #[test]
    fn test_parse_headers_and_rows() {
        let data = parse_dataset(SAMPLE, Slot::First, &LoadOptions::default()).unwrap();
        assert_eq!(data.headers, vec!["Butt weld, as welded", "R=0.1, 10 Hz"]);
        assert_eq!(
            data.observations,
            vec![
                Observation::failure(200.0, 120_000.0),
                Observation::failure(150.0, 410_000.0),
                Observation::runout(90.0, 5_000_000.0),
            ]
        );
    }

    #[test]
    fn test_runout_mask_positions() {
        let content = "h1\nh2\n^120,1e6\n100,2e6\n^80,1e7\n95,3e6\n";
        let options = LoadOptions {
            runout_marker: '^',
            ..LoadOptions::default()
        };
        let data = parse_dataset(content, Slot::Second, &options).unwrap();
        assert_eq!(data.runout_mask(), vec![true, false, true, false]);
        assert!((data.observations[0].stress - 120.0).abs() < f64::EPSILON);
        assert!((data.observations[2].stress - 80.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_custom_delimiter_and_header_count() {
        let content = "only header\n100;1000000\n200\t;\t50000\n";
        let options = LoadOptions {
            delimiter: ';',
            header_lines: 1,
            ..LoadOptions::default()
        };
        let data = parse_dataset(content, Slot::First, &options).unwrap();
        assert_eq!(data.headers, vec!["only header"]);
        assert_eq!(data.len(), 2);
        assert!((data.observations[1].cycles - 50_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_extra_columns_and_blank_lines_ignored() {
        let content = "a\nb\n100,1000000,note\n\n200,50000\n";
        let data = parse_dataset(content, Slot::First, &LoadOptions::default()).unwrap();
        assert_eq!(data.len(), 2);
    }

    #[test]
    fn test_negative_value_rejected() {
        // A '-' runout marker read with the default '*' marker.
        let content = "a\nb\n100,1000000\n-80,5000000\n";
        let err = parse_dataset(content, Slot::First, &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, SnError::NegativeValue { line: 4, marker: '*' }));
        assert!(err.to_string().contains("runout indicator"));
    }

    #[test]
    fn test_zero_value_rejected() {
        let content = "a\nb\n100,0\n";
        let err = parse_dataset(content, Slot::First, &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, SnError::ZeroValue { line: 3 }));
    }

    #[test]
    fn test_malformed_token_is_parse_error() {
        let content = "a\nb\n100,1000000\n#90,5000000\n";
        let err = parse_dataset(content, Slot::First, &LoadOptions::default()).unwrap_err();
        match err {
            SnError::Parse { line, message } => {
                assert_eq!(line, 4);
                assert!(message.contains("#90"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_non_finite_token_is_parse_error() {
        let content = "a\nb\ninf,1000000\n";
        assert!(matches!(
            parse_dataset(content, Slot::First, &LoadOptions::default()),
            Err(SnError::Parse { line: 3, .. })
        ));
    }

    #[test]
    fn test_missing_field_is_parse_error() {
        let content = "a\nb\n100\n";
        assert!(matches!(
            parse_dataset(content, Slot::First, &LoadOptions::default()),
            Err(SnError::Parse { line: 3, .. })
        ));
    }

    #[test]
    fn test_empty_data_rejected() {
        let content = "a\nb\n";
        assert!(matches!(
            parse_dataset(content, Slot::First, &LoadOptions::default()),
            Err(SnError::NoObservations { .. })
        ));
    }

    #[test]
    fn test_marker_on_cycles_is_parse_error() {
        let content = "a\nb\n100,1000000\n90,*5000000\n";
        match parse_dataset(content, Slot::First, &LoadOptions::default()).unwrap_err() {
            SnError::Parse { line, message } => {
                assert_eq!(line, 4);
                assert!(message.contains("*5000000"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_delimiter_names_and_escapes() {
        assert_eq!(parse_delimiter("\\t").unwrap(), '\t');
        assert_eq!(parse_delimiter("tab").unwrap(), '\t');
        assert_eq!(parse_delimiter("\t").unwrap(), '\t');
        assert_eq!(parse_delimiter(";").unwrap(), ';');
        assert_eq!(parse_delimiter("semicolon").unwrap(), ';');
        assert!(matches!(
            parse_delimiter(";;"),
            Err(SnError::InvalidSetting(_))
        ));
        assert!(parse_delimiter("").is_err());
    }

    #[test]
    fn test_tab_delimited_file() {
        let options = LoadOptions {
            delimiter: parse_delimiter("tab").unwrap(),
            ..LoadOptions::default()
        };
        let data = parse_dataset("a\nb\n100\t1000000\n*80\t6000000\n", Slot::First, &options)
            .unwrap();
        assert_eq!(data.runout_mask(), vec![false, true]);
        assert!((data.observations[1].cycles - 6_000_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_unsupported_marker() {
        let options = LoadOptions {
            runout_marker: '#',
            ..LoadOptions::default()
        };
        assert!(matches!(
            options.validate(),
            Err(SnError::UnsupportedRunoutMarker('#'))
        ));
    }

    #[test]
    fn test_invalid_delimiters() {
        for delimiter in ['.', '-', '5', 'e', '*', 'é'] {
            let options = LoadOptions {
                delimiter,
                ..LoadOptions::default()
            };
            assert!(
                matches!(options.validate(), Err(SnError::InvalidDelimiter(..))),
                "delimiter {delimiter:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_load_from_file_roundtrip() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let data = load_dataset(file.path(), Slot::Second, &LoadOptions::default()).unwrap();
        assert_eq!(data.slot, Slot::Second);
        assert_eq!(data.source.as_deref(), Some(file.path()));
        let values: Vec<(f64, f64)> = data
            .observations
            .iter()
            .map(|o| (o.stress, o.cycles))
            .collect();
        assert_eq!(
            values,
            vec![(200.0, 120_000.0), (150.0, 410_000.0), (90.0, 5_000_000.0)]
        );
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_dataset(
            Path::new("/nonexistent/data.sn"),
            Slot::First,
            &LoadOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, SnError::Io { .. }));
    }
}
