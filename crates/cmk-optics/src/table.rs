use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use cmk_core::{CmkError, ErrorInfo, SourceDigest};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

fn data_error(code: &str, message: impl Into<String>) -> CmkError {
    CmkError::Data(ErrorInfo::new(code, message))
}

const REQUIRED_COLUMNS: [&str; 6] = ["NAME", "S", "BETX", "BETY", "MUX", "MUY"];

/// Optical functions at one lattice element.
///
/// Phase advances are in tune units (fractions of 2π), matching the source
/// table convention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpticsRecord {
    /// Element name as written in the table.
    pub name: String,
    /// Longitudinal position in meters.
    pub s: f64,
    /// Horizontal beta function in meters.
    pub betx: f64,
    /// Vertical beta function in meters.
    pub bety: f64,
    /// Horizontal phase advance in tune units.
    pub mux: f64,
    /// Vertical phase advance in tune units.
    pub muy: f64,
}

impl OpticsRecord {
    /// Returns the horizontal-minus-vertical phase difference in radians.
    pub fn phase_difference(&self) -> f64 {
        std::f64::consts::TAU * (self.mux - self.muy)
    }

    /// Returns the coupling weight `sqrt(betx * bety)`.
    pub fn coupling_weight(&self) -> f64 {
        (self.betx * self.bety).sqrt()
    }
}

/// Parsed optics table.
///
/// Only the named fields the synthesizer needs are extracted; unknown
/// columns are ignored and header scalars are kept verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct OpticsTable {
    headers: BTreeMap<String, String>,
    records: Vec<OpticsRecord>,
    digest: Option<SourceDigest>,
}

impl OpticsTable {
    /// Reads and parses an optics table from disk, recording a content hash
    /// of the raw file for provenance.
    pub fn from_path(path: &Path) -> Result<Self, CmkError> {
        let content = fs::read_to_string(path).map_err(|err| {
            CmkError::Data(
                ErrorInfo::new("optics-read", "failed to read optics table")
                    .with_context("path", path.display().to_string())
                    .with_hint(err.to_string()),
            )
        })?;
        let mut table = Self::from_str_content(&content)?;
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        table.digest = Some(SourceDigest::new(
            path.display().to_string(),
            format!("{:x}", hasher.finalize()),
        ));
        Ok(table)
    }

    /// Parses an optics table from already-loaded text.
    pub fn from_str_content(content: &str) -> Result<Self, CmkError> {
        let mut headers = BTreeMap::new();
        let mut layout: Option<(usize, BTreeMap<&'static str, usize>)> = None;
        let mut records = Vec::new();

        for (line_no, raw_line) in content.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('!') || line.starts_with("//") {
                continue;
            }
            if let Some(rest) = line.strip_prefix('@') {
                parse_header(rest, &mut headers);
                continue;
            }
            if let Some(rest) = line.strip_prefix('*') {
                let names: Vec<String> = rest
                    .split_whitespace()
                    .map(|token| token.to_ascii_uppercase())
                    .collect();
                layout = Some((names.len(), column_indices(&names)?));
                continue;
            }
            if line.starts_with('$') {
                continue;
            }

            let (column_count, indices) = layout.as_ref().ok_or_else(|| {
                CmkError::Data(
                    ErrorInfo::new("optics-no-columns", "data row before column header line")
                        .with_context("line", (line_no + 1).to_string()),
                )
            })?;
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() < *column_count {
                return Err(CmkError::Data(
                    ErrorInfo::new("optics-short-row", "data row has fewer fields than columns")
                        .with_context("line", (line_no + 1).to_string())
                        .with_context("fields", tokens.len().to_string())
                        .with_context("columns", column_count.to_string()),
                ));
            }
            records.push(parse_record(&tokens, indices, line_no + 1)?);
        }

        if records.is_empty() {
            return Err(data_error("optics-empty", "optics table contains no data rows"));
        }
        Ok(Self {
            headers,
            records,
            digest: None,
        })
    }

    /// Returns all parsed records in file order.
    pub fn records(&self) -> &[OpticsRecord] {
        &self.records
    }

    /// Returns a header scalar verbatim, e.g. `header("Q1")`.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(&key.to_ascii_uppercase()).map(String::as_str)
    }

    /// Returns a header scalar parsed as a float.
    ///
    /// `Ok(None)` when the header is absent; `Data` error when present but
    /// not numeric.
    pub fn numeric_header(&self, key: &str) -> Result<Option<f64>, CmkError> {
        match self.header(key) {
            None => Ok(None),
            Some(text) => text.parse::<f64>().map(Some).map_err(|err| {
                CmkError::Data(
                    ErrorInfo::new("optics-bad-header", "header value is not numeric")
                        .with_context("header", key.to_string())
                        .with_context("value", text.to_string())
                        .with_hint(err.to_string()),
                )
            }),
        }
    }

    /// Returns the provenance digest when the table was read from disk.
    pub fn digest(&self) -> Option<&SourceDigest> {
        self.digest.as_ref()
    }
}

fn parse_header(rest: &str, headers: &mut BTreeMap<String, String>) {
    // "@ Q1  %le  62.31" or "@ SEQUENCE  %06s \"LHCB1\""
    let mut tokens = rest.split_whitespace();
    let key = match tokens.next() {
        Some(key) => key.to_ascii_uppercase(),
        None => return,
    };
    let mut remainder: Vec<&str> = tokens.collect();
    if remainder
        .first()
        .is_some_and(|token| token.starts_with('%'))
    {
        remainder.remove(0);
    }
    let value = remainder.join(" ");
    headers.insert(key, unquote(&value).to_string());
}

fn unquote(token: &str) -> &str {
    token
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(token)
}

fn column_indices(names: &[String]) -> Result<BTreeMap<&'static str, usize>, CmkError> {
    let mut indices = BTreeMap::new();
    let mut missing = Vec::new();
    for required in REQUIRED_COLUMNS {
        match names.iter().position(|name| name == required) {
            Some(idx) => {
                indices.insert(required, idx);
            }
            None => missing.push(required),
        }
    }
    if !missing.is_empty() {
        return Err(CmkError::Data(
            ErrorInfo::new("optics-missing-columns", "optics table lacks required columns")
                .with_context("missing", missing.join(",")),
        ));
    }
    Ok(indices)
}

fn parse_record(
    tokens: &[&str],
    indices: &BTreeMap<&'static str, usize>,
    line_no: usize,
) -> Result<OpticsRecord, CmkError> {
    let field = |column: &'static str| tokens[indices[column]];
    let float = |column: &'static str| -> Result<f64, CmkError> {
        let token = field(column);
        token.parse::<f64>().map_err(|err| {
            CmkError::Data(
                ErrorInfo::new("optics-bad-float", "field is not a valid float")
                    .with_context("column", column.to_string())
                    .with_context("value", token.to_string())
                    .with_context("line", line_no.to_string())
                    .with_hint(err.to_string()),
            )
        })
    };
    Ok(OpticsRecord {
        name: unquote(field("NAME")).to_string(),
        s: float("S")?,
        betx: float("BETX")?,
        bety: float("BETY")?,
        mux: float("MUX")?,
        muy: float("MUY")?,
    })
}
