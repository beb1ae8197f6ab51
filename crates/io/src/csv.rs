// Feed CSV import / view export

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use feedsync_recon::model::{Columns, Row};
use feedsync_recon::project::ProjectedView;

use crate::error::IoError;

/// Read a feed file: first record is the header, every later record a row.
pub fn read_feed(path: &Path) -> Result<Vec<Row>, IoError> {
    let content = read_file_as_utf8(path)?;
    let delimiter = sniff_delimiter(&content);
    let rows = parse_feed(&content, delimiter).map_err(|e| IoError::csv(path, e))?;
    log::debug!(
        "read {} row(s) from {} (delimiter {:?})",
        rows.len(),
        path.display(),
        delimiter as char
    );
    Ok(rows)
}

/// Parse feed text. Header names are cleaned; a repeated header keeps its
/// first position and the last value. Short records are padded with empty
/// strings, extra fields are ignored.
pub fn parse_feed(content: &str, delimiter: u8) -> Result<Vec<Row>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut records = reader.records();
    let Some(header) = records.next().transpose()? else {
        return Ok(Vec::new());
    };

    let names: Vec<String> = header.iter().map(clean_header).collect();
    let columns = Arc::new(Columns::new(names.iter().cloned()));
    let positions: Vec<usize> = names
        .iter()
        .filter_map(|name| columns.position(name))
        .collect();

    let mut rows = Vec::new();
    for result in records {
        let record = result?;
        let mut values = vec![String::new(); columns.len()];
        for (field, &pos) in record.iter().zip(&positions) {
            values[pos] = field.to_string();
        }
        rows.push(Row::new(columns.clone(), values));
    }
    Ok(rows)
}

/// Strip a leading BOM and zero-width characters, then trim.
pub fn clean_header(name: &str) -> String {
    name.strip_prefix('\u{FEFF}')
        .unwrap_or(name)
        .chars()
        .filter(|c| !matches!(c, '\u{200B}'..='\u{200D}' | '\u{FEFF}'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Candidate delimiters, in tie-break order.
const DELIMITERS: [u8; 4] = [b'\t', b';', b',', b'|'];

/// Lines inspected when sniffing.
const SNIFF_LINES: usize = 10;

/// Pick the delimiter that splits the header into the most fields and
/// keeps that field count on the following lines. Falls back to `,`.
pub fn sniff_delimiter(content: &str) -> u8 {
    let sample: Vec<&str> = content.lines().take(SNIFF_LINES).collect();

    DELIMITERS
        .iter()
        .filter_map(|&delim| {
            let widths: Vec<usize> = sample.iter().map(|line| field_count(line, delim)).collect();
            let header = *widths.first()?;
            if header <= 1 {
                return None;
            }
            let agreeing = widths.iter().filter(|&&w| w == header).count();
            Some((delim, agreeing * header))
        })
        // max_by_key keeps the last maximum; reverse so earlier candidates win ties
        .rev()
        .max_by_key(|&(_, score)| score)
        .map_or(b',', |(delim, _)| delim)
}

/// Fields on one line under `delim`, honoring quotes.
fn field_count(line: &str, delim: u8) -> usize {
    csv::ReaderBuilder::new()
        .delimiter(delim)
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes())
        .records()
        .next()
        .and_then(Result::ok)
        .map_or(1, |record| record.len())
}

/// Read file and convert to UTF-8 if needed (Windows-1252 exports are common).
pub fn read_file_as_utf8(path: &Path) -> Result<String, IoError> {
    let mut file = std::fs::File::open(path).map_err(|e| IoError::io(path, e))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|e| IoError::io(path, e))?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            log::warn!("{} is not UTF-8, decoding as Windows-1252", path.display());
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

/// Write a projected view as comma-separated text. An empty view writes
/// nothing and returns `false`.
pub fn write_view(path: &Path, view: &ProjectedView) -> Result<bool, IoError> {
    if view.is_empty() {
        log::info!("view '{}' is empty, not writing {}", view.name, path.display());
        return Ok(false);
    }

    let mut writer = csv::Writer::from_path(path).map_err(|e| IoError::csv(path, e))?;
    writer
        .write_record(view.header())
        .map_err(|e| IoError::csv(path, e))?;
    for record in view.records() {
        writer.write_record(&record).map_err(|e| IoError::csv(path, e))?;
    }
    writer.flush().map_err(|e| IoError::io(path, e))?;

    log::info!("wrote {} row(s) to {}", view.len(), path.display());
    Ok(true)
}
