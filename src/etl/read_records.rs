use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::{debug, info, warn};
use xz::bufread::XzDecoder;

use crate::data::record::VersionedRecord;
use crate::errors::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    /// Observed edits. `action` is required.
    Current,
    /// Fetched predecessors. Carry no action, changeset or author.
    Prior,
}

impl StreamKind {
    fn name(&self) -> &'static str {
        match self {
            StreamKind::Current => "current",
            StreamKind::Prior => "prior",
        }
    }
}

#[derive(Debug, Default)]
pub struct StreamRead {
    pub records: Vec<VersionedRecord>,
    pub skipped: usize,
    /// Reading stopped early on an I/O error; `records` holds what came before it.
    pub truncated: bool,
}

/// Opens a newline-delimited JSON file, decompressing `.xz` files on the fly.
pub fn open_stream(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = fs::File::open(path)?;
    let file_reader = BufReader::new(file);
    if path.extension().is_some_and(|ext| ext == "xz") {
        let xz_reader = XzDecoder::new(file_reader);
        Ok(Box::new(BufReader::new(xz_reader)))
    } else {
        Ok(Box::new(file_reader))
    }
}

fn parse_line(line: &[u8], kind: StreamKind) -> Result<VersionedRecord> {
    let record = VersionedRecord::from_json_line(line)?;
    if kind == StreamKind::Current && record.action.is_none() {
        return Err("Current record without action".into());
    }
    Ok(record)
}

/// Reads every record of a stream. Malformed lines are skipped and counted. An I/O failure
/// part way through, such as a truncated archive, ends the stream at the last complete line.
pub fn read_stream<R: BufRead>(mut reader: R, kind: StreamKind) -> Result<StreamRead> {
    let mut read = StreamRead::default();
    let mut buf = Vec::new();
    let mut line_no = 0_usize;

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => (),
            Err(err) => {
                warn!(stream = kind.name(), line = line_no + 1, err = err.to_string().as_str(); "Stream ended early, keeping records read so far");
                read.truncated = true;
                break;
            }
        }
        line_no += 1;
        if buf.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        match parse_line(&buf, kind) {
            Ok(record) => read.records.push(record),
            Err(err) => {
                debug!(stream = kind.name(), line = line_no, err = err.message.as_str(); "Skipping malformed line");
                read.skipped += 1;
            }
        }
    }

    if read.skipped > 0 {
        warn!(stream = kind.name(), skipped = read.skipped; "Skipped malformed lines");
    }
    info!(stream = kind.name(), records = read.records.len(); "Read edit stream");
    Ok(read)
}

pub fn read_stream_file(path: &Path, kind: StreamKind) -> Result<StreamRead> {
    read_stream(open_stream(path)?, kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::record::LooseId;
    use std::io::{self, Read};

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::UnexpectedEof, "archive truncated"))
        }
    }

    fn ids(read: &StreamRead) -> Vec<LooseId> {
        read.records.iter().map(|r| r.obj_id.clone()).collect()
    }

    const LINES: &str = concat!(
        r#"{"obj_type":"node","obj_id":1,"version":1,"action":"create"}"#, "\n",
        "{broken\n",
        "\n",
        r#"{"obj_type":"node","obj_id":2,"version":3}"#, "\n",
        r#"[1,2,3]"#, "\n",
        r#"{"obj_type":"way","obj_id":3,"version":2,"action":"modify"}"#,
    );

    #[test]
    fn current_stream_skips_malformed_and_actionless_lines() {
        let read = read_stream(LINES.as_bytes(), StreamKind::Current).unwrap();
        assert_eq!(ids(&read), vec![LooseId::Int(1), LooseId::Int(3)]);
        assert_eq!(read.skipped, 3);
    }

    #[test]
    fn prior_stream_does_not_need_action() {
        let read = read_stream(LINES.as_bytes(), StreamKind::Prior).unwrap();
        assert_eq!(ids(&read), vec![LooseId::Int(1), LooseId::Int(2), LooseId::Int(3)]);
        assert_eq!(read.skipped, 2);
    }

    #[test]
    fn invalid_utf8_line_is_skipped() {
        let mut bytes = b"\xff\xfe\n".to_vec();
        bytes.extend_from_slice(br#"{"obj_type":"node","obj_id":1,"version":1}"#);
        let read = read_stream(bytes.as_slice(), StreamKind::Prior).unwrap();
        assert_eq!(read.records.len(), 1);
        assert_eq!(read.skipped, 1);
    }

    #[test]
    fn io_error_mid_stream_keeps_earlier_records() {
        let good = concat!(
            r#"{"obj_type":"node","obj_id":1,"version":1,"action":"create"}"#, "\n",
            r#"{"obj_type":"node","obj_id":2,"#,
        );
        let reader = BufReader::new(good.as_bytes().chain(FailingReader));
        let read = read_stream(reader, StreamKind::Current).unwrap();

        assert!(read.truncated);
        assert_eq!(ids(&read), vec![LooseId::Int(1)]);
        assert_eq!(read.skipped, 0);
    }

    #[test]
    fn complete_stream_is_not_truncated() {
        assert!(!read_stream(LINES.as_bytes(), StreamKind::Prior).unwrap().truncated);
    }
}
