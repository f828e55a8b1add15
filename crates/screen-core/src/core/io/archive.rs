use flate2::read::MultiGzDecoder;
use std::borrow::Cow;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Header line that opens every record of a Tripos MOL2 multi-molecule file.
pub const TRIPOS_MOLECULE_MARKER: &str = "@<TRIPOS>MOLECULE";

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const READ_CHUNK_BYTES: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Failed to open archive: {0}")]
    Open(#[source] io::Error),
    #[error("Failed to read archive after {records} record(s): {source}")]
    Read {
        records: usize,
        #[source]
        source: io::Error,
    },
}

/// One record cut out of an archive, re-prefixed with the marker it was split on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Zero-based position of the record within its archive.
    pub index: usize,
    pub payload: Vec<u8>,
}

impl Record {
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

/// Lazily splits a stream of concatenated records on a literal header marker.
///
/// The splitter reads the underlying stream in fixed-size chunks and only keeps the
/// bytes of the record currently being assembled, so archives far larger than memory
/// can be screened. Bytes preceding the first marker and whitespace-only pieces are
/// not records and are skipped.
///
/// The marker is matched literally wherever it occurs. A payload that happens to
/// contain the marker text is cut in two at that point.
pub struct RecordSplitter<R> {
    reader: R,
    marker: Vec<u8>,
    buffer: Vec<u8>,
    scan_from: usize,
    seen_marker: bool,
    eof: bool,
    finished: bool,
    emitted: usize,
}

impl RecordSplitter<Box<dyn Read + Send>> {
    /// Opens an archive on disk, transparently decompressing it when it starts with the
    /// gzip magic bytes. Multi-member gzip files are read to the end.
    pub fn open<P: AsRef<Path>>(path: P, marker: &str) -> Result<Self, ArchiveError> {
        let file = File::open(path.as_ref()).map_err(ArchiveError::Open)?;
        let mut reader = BufReader::new(file);
        let is_gzip = reader
            .fill_buf()
            .map_err(ArchiveError::Open)?
            .starts_with(&GZIP_MAGIC);

        let source: Box<dyn Read + Send> = if is_gzip {
            Box::new(MultiGzDecoder::new(reader))
        } else {
            debug!(
                "Archive {:?} is not gzip-compressed; reading it as plain text.",
                path.as_ref()
            );
            Box::new(reader)
        };
        Ok(Self::new(source, marker))
    }
}

impl<R: Read> RecordSplitter<R> {
    pub fn new(reader: R, marker: &str) -> Self {
        assert!(!marker.is_empty(), "record marker must not be empty");
        Self {
            reader,
            marker: marker.as_bytes().to_vec(),
            buffer: Vec::new(),
            scan_from: 0,
            seen_marker: false,
            eof: false,
            finished: false,
            emitted: 0,
        }
    }

    /// Returns the next raw piece of the stream and whether it was preceded by a marker.
    fn next_piece(&mut self) -> io::Result<Option<(Vec<u8>, bool)>> {
        loop {
            if let Some(pos) = find(&self.buffer[self.scan_from..], &self.marker) {
                let end = self.scan_from + pos;
                let piece: Vec<u8> = self.buffer.drain(..end).collect();
                self.buffer.drain(..self.marker.len());
                self.scan_from = 0;
                let follows_marker = std::mem::replace(&mut self.seen_marker, true);
                return Ok(Some((piece, follows_marker)));
            }

            if self.eof {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                let piece = std::mem::take(&mut self.buffer);
                self.scan_from = 0;
                return Ok(Some((piece, self.seen_marker)));
            }

            // A marker may straddle two chunks; rescan the tail of what we already hold.
            self.scan_from = self.buffer.len().saturating_sub(self.marker.len() - 1);
            self.fill()?;
        }
    }

    fn fill(&mut self) -> io::Result<()> {
        let start = self.buffer.len();
        self.buffer.resize(start + READ_CHUNK_BYTES, 0);
        let result = self.reader.read(&mut self.buffer[start..]);
        match result {
            Ok(0) => {
                self.buffer.truncate(start);
                self.eof = true;
                Ok(())
            }
            Ok(n) => {
                self.buffer.truncate(start + n);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                self.buffer.truncate(start);
                Ok(())
            }
            Err(e) => {
                self.buffer.truncate(start);
                Err(e)
            }
        }
    }
}

impl<R: Read> Iterator for RecordSplitter<R> {
    type Item = Result<Record, ArchiveError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        loop {
            match self.next_piece() {
                Ok(Some((piece, true))) if !is_blank(&piece) => {
                    let mut payload = Vec::with_capacity(self.marker.len() + piece.len());
                    payload.extend_from_slice(&self.marker);
                    payload.extend_from_slice(&piece);
                    let record = Record {
                        index: self.emitted,
                        payload,
                    };
                    self.emitted += 1;
                    return Some(Ok(record));
                }
                Ok(Some((piece, follows_marker))) => {
                    if !follows_marker && !is_blank(&piece) {
                        debug!(
                            bytes = piece.len(),
                            "Skipping preamble before the first record marker."
                        );
                    }
                }
                Ok(None) => {
                    self.finished = true;
                    return None;
                }
                Err(source) => {
                    self.finished = true;
                    return Some(Err(ArchiveError::Read {
                        records: self.emitted,
                        source,
                    }));
                }
            }
        }
    }
}

/// Counts the records of an archive with a decompression-only pass.
pub fn count_records<P: AsRef<Path>>(path: P, marker: &str) -> Result<usize, ArchiveError> {
    RecordSplitter::open(path, marker)?.try_fold(0, |count, record| record.map(|_| count + 1))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn is_blank(bytes: &[u8]) -> bool {
    bytes.iter().all(u8::is_ascii_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    fn mol2(id: &str) -> String {
        format!(
            "{TRIPOS_MOLECULE_MARKER}\n{id}\n 2 1 0 0 0\nSMALL\nGASTEIGER\n\n@<TRIPOS>ATOM\n      1 C1  0.0 0.0 0.0 C.3 1 LIG 0.0\n      2 O1  1.4 0.0 0.0 O.3 1 LIG 0.0\n@<TRIPOS>BOND\n     1 1 2 1\n"
        )
    }

    fn gzip(bytes: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(bytes).unwrap();
        encoder.finish().unwrap()
    }

    fn write_archive(dir: &Path, name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    /// Hands out at most `step` bytes per read so markers straddle chunk boundaries.
    struct TrickleReader {
        data: Vec<u8>,
        pos: usize,
        step: usize,
    }

    impl Read for TrickleReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn splits_gzipped_archive_into_records_with_marker_restored() {
        let dir = tempfile::tempdir().unwrap();
        let content = format!("{}{}{}", mol2("ZINC01"), mol2("ZINC02"), mol2("ZINC03"));
        let path = write_archive(dir.path(), "ligands.mol2.gz", &gzip(content.as_bytes()));

        let records: Vec<Record> = RecordSplitter::open(&path, TRIPOS_MOLECULE_MARKER)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(records.len(), 3);
        for (i, record) in records.iter().enumerate() {
            assert_eq!(record.index, i);
            assert!(record.text().starts_with(TRIPOS_MOLECULE_MARKER));
            assert_eq!(
                record.text().lines().nth(1).unwrap(),
                format!("ZINC0{}", i + 1)
            );
        }
        assert_eq!(records[1].payload, mol2("ZINC02").into_bytes());
    }

    #[test]
    fn exhausted_splitter_keeps_returning_none() {
        let content = format!("{}{}", mol2("LAST01"), mol2("LAST02"));
        let mut splitter = RecordSplitter::new(content.as_bytes(), TRIPOS_MOLECULE_MARKER);

        assert!(matches!(splitter.next(), Some(Ok(_))));
        let last = splitter.next().unwrap().unwrap();
        assert_eq!(last.payload, mol2("LAST02").into_bytes());
        assert!(splitter.next().is_none());
        assert!(splitter.next().is_none());
    }

    #[test]
    fn trailing_record_without_newline_is_emitted_once() {
        let content = format!("{}{TRIPOS_MOLECULE_MARKER}
TAIL
 1 0 0 0 0
SMALL", mol2("HEAD"));
        let reader = TrickleReader {
            data: content.into_bytes(),
            pos: 0,
            step: 7,
        };

        let ids: Vec<String> = RecordSplitter::new(reader, TRIPOS_MOLECULE_MARKER)
            .map(|r| r.unwrap().text().lines().nth(1).unwrap().to_string())
            .collect();

        assert_eq!(ids, vec!["HEAD", "TAIL"]);
    }

    #[test]
    fn empty_archive_yields_no_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_archive(dir.path(), "empty.mol2.gz", &gzip(b""));

        let mut splitter = RecordSplitter::open(&path, TRIPOS_MOLECULE_MARKER).unwrap();
        assert!(splitter.next().is_none());
        assert!(splitter.next().is_none());
        assert_eq!(count_records(&path, TRIPOS_MOLECULE_MARKER).unwrap(), 0);
    }

    #[test]
    fn preamble_and_blank_pieces_are_not_records() {
        let content = format!(
            "# exported by a database dump\n{}\n\n{}{TRIPOS_MOLECULE_MARKER}\n   \n",
            mol2("A"),
            mol2("B")
        );
        let splitter = RecordSplitter::new(content.as_bytes(), TRIPOS_MOLECULE_MARKER);

        let ids: Vec<String> = splitter
            .map(|r| r.unwrap().text().lines().nth(1).unwrap().to_string())
            .collect();

        assert_eq!(ids, vec!["A", "B"]);
    }

    #[test]
    fn markers_straddling_read_chunks_are_found() {
        let content = format!("{}{}{}", mol2("A"), mol2("B"), mol2("C"));
        let reader = TrickleReader {
            data: content.clone().into_bytes(),
            pos: 0,
            step: 5,
        };

        let records: Vec<Record> = RecordSplitter::new(reader, TRIPOS_MOLECULE_MARKER)
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(records.len(), 3);
        let rejoined: Vec<u8> = records.into_iter().flat_map(|r| r.payload).collect();
        assert_eq!(rejoined, content.into_bytes());
    }

    #[test]
    fn marker_inside_payload_splits_the_record() {
        let content = format!(
            "{TRIPOS_MOLECULE_MARKER}\nA\ncomment mentions {TRIPOS_MOLECULE_MARKER} inline\n"
        );

        let count = RecordSplitter::new(content.as_bytes(), TRIPOS_MOLECULE_MARKER).count();

        assert_eq!(count, 2);
    }

    #[test]
    fn plain_archives_are_read_without_decompression() {
        let dir = tempfile::tempdir().unwrap();
        let content = format!("{}{}", mol2("P1"), mol2("P2"));
        let path = write_archive(dir.path(), "ligands.mol2", content.as_bytes());

        assert_eq!(count_records(&path, TRIPOS_MOLECULE_MARKER).unwrap(), 2);
    }

    #[test]
    fn truncated_gzip_stream_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let content = (0..50).map(|i| mol2(&format!("Z{i}"))).collect::<String>();
        let compressed = gzip(content.as_bytes());
        let path = write_archive(
            dir.path(),
            "truncated.mol2.gz",
            &compressed[..compressed.len() / 2],
        );

        let result = count_records(&path, TRIPOS_MOLECULE_MARKER);

        assert!(matches!(result, Err(ArchiveError::Read { .. })));
    }

    #[test]
    fn splitter_stops_after_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let compressed = gzip(mol2("A").as_bytes());
        let path = write_archive(dir.path(), "bad.mol2.gz", &compressed[..12]);

        let mut splitter = RecordSplitter::open(&path, TRIPOS_MOLECULE_MARKER).unwrap();

        assert!(matches!(splitter.next(), Some(Err(ArchiveError::Read { .. }))));
        assert!(splitter.next().is_none());
    }

    #[test]
    fn missing_archive_is_an_open_error() {
        let result = RecordSplitter::open("/nonexistent/ligands.mol2.gz", TRIPOS_MOLECULE_MARKER);
        assert!(matches!(result, Err(ArchiveError::Open(_))));
    }
}
