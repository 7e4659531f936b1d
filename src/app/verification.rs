//! Validity checking of downloaded media files
//!
//! Decides whether a file already on disk is a complete, playable artifact.
//! The check is fail-closed: any error while probing means "not usable" and
//! is never propagated to the caller.
//!
//! For ISO-BMFF (MP4) files the probe walks the top-level box headers,
//! requires `ftyp` and `moov`, locates the first video track and checks that
//! its first sample lies inside the file and carries non-zero data. Only box
//! headers, the `moov` box and a few sample bytes are read, so the cost does
//! not grow with the size of the media payload.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncSeekExt, SeekFrom};
use tracing::debug;

use crate::app::models::DownloadTask;
use crate::constants::probe;

/// How thoroughly existing files are inspected
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeMode {
    /// Parse the MP4 container and inspect the first video sample
    #[default]
    Container,
    /// Accept any existing non-empty file
    Size,
}

impl std::str::FromStr for ProbeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "container" => Ok(Self::Container),
            "size" => Ok(Self::Size),
            other => Err(format!(
                "unknown probe mode '{}', expected container or size",
                other
            )),
        }
    }
}

/// Classification of a destination path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validity {
    /// File exists and passed the probe
    Usable,
    /// Nothing at the path
    Missing,
    /// File exists but failed the probe
    Corrupt(String),
}

impl Validity {
    pub fn is_usable(&self) -> bool {
        matches!(self, Validity::Usable)
    }
}

/// Reasons a probe rejects a file
#[derive(Error, Debug)]
enum ProbeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("file is empty")]
    Empty,

    #[error("box header at offset {offset} is truncated or malformed")]
    MalformedBox { offset: u64 },

    #[error("box '{fourcc}' at offset {offset} extends past end of file")]
    TruncatedBox { fourcc: String, offset: u64 },

    #[error("missing '{0}' box")]
    MissingBox(&'static str),

    #[error("moov box of {0} bytes is too large to inspect")]
    OversizedMoov(u64),

    #[error("no video track found")]
    NoVideoTrack,

    #[error("video track has no samples")]
    NoSamples,

    #[error("first video sample has zero size")]
    EmptySample,

    #[error("first video sample lies outside the file")]
    SampleOutOfBounds,

    #[error("first video sample contains only zero bytes")]
    BlankSample,
}

/// Report produced when checking a whole task list
#[derive(Debug, Clone, Default)]
pub struct VerificationReport {
    /// Total files checked
    pub files_checked: usize,
    /// Files that passed the probe
    pub files_usable: usize,
    /// Files that do not exist
    pub files_missing: usize,
    /// Files that exist but failed the probe
    pub files_corrupt: usize,
    /// Total verification time
    pub verification_time: Duration,
    /// Corrupt files with the probe's reason
    pub corrupt_files: Vec<(PathBuf, String)>,
}

impl VerificationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Percentage of checked files that are usable
    pub fn success_rate(&self) -> f64 {
        if self.files_checked == 0 {
            0.0
        } else {
            (self.files_usable as f64 / self.files_checked as f64) * 100.0
        }
    }

    /// True when every checked file is usable
    pub fn is_complete(&self) -> bool {
        self.files_usable == self.files_checked
    }

    /// Record one classification
    pub fn record(&mut self, path: &Path, validity: Validity) {
        self.files_checked += 1;
        match validity {
            Validity::Usable => self.files_usable += 1,
            Validity::Missing => self.files_missing += 1,
            Validity::Corrupt(reason) => {
                self.files_corrupt += 1;
                self.corrupt_files.push((path.to_path_buf(), reason));
            }
        }
    }
}

/// Fail-closed usability check for files on disk
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidityChecker {
    mode: ProbeMode,
}

impl ValidityChecker {
    pub fn new(mode: ProbeMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ProbeMode {
        self.mode
    }

    /// Whether the file at `path` is a complete, playable artifact
    pub async fn is_usable(&self, path: &Path) -> bool {
        self.classify(path).await.is_usable()
    }

    /// Classify the file at `path`, keeping the rejection reason
    pub async fn classify(&self, path: &Path) -> Validity {
        match fs::try_exists(path).await {
            Ok(true) => {}
            Ok(false) => return Validity::Missing,
            Err(e) => return Validity::Corrupt(format!("cannot stat file: {}", e)),
        }

        let result = match self.mode {
            ProbeMode::Container => probe_container(path).await,
            ProbeMode::Size => probe_size(path).await,
        };

        match result {
            Ok(()) => Validity::Usable,
            Err(e) => {
                debug!("Probe rejected {}: {}", path.display(), e);
                Validity::Corrupt(e.to_string())
            }
        }
    }

    /// Check every task destination and summarise
    pub async fn verify_tasks(&self, tasks: &[DownloadTask]) -> VerificationReport {
        let start = std::time::Instant::now();
        let mut report = VerificationReport::new();
        for task in tasks {
            let validity = self.classify(&task.destination).await;
            report.record(&task.destination, validity);
        }
        report.verification_time = start.elapsed();
        report
    }
}

async fn probe_size(path: &Path) -> Result<(), ProbeError> {
    let metadata = fs::metadata(path).await?;
    if metadata.len() == 0 {
        return Err(ProbeError::Empty);
    }
    Ok(())
}

/// Parse a box header: returns `(total_box_size, fourcc, header_size)`
///
/// `available` is the number of bytes from the header start to the end of the
/// enclosing range; it resolves `size == 0` (box runs to the end).
fn read_box_header(data: &[u8], available: u64) -> Option<(u64, [u8; 4], u64)> {
    if data.len() < 8 {
        return None;
    }

    let size = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as u64;
    let fourcc = [data[4], data[5], data[6], data[7]];

    match size {
        1 => {
            if data.len() < 16 {
                return None;
            }
            let mut ext = [0u8; 8];
            ext.copy_from_slice(&data[8..16]);
            Some((u64::from_be_bytes(ext), fourcc, 16))
        }
        0 => Some((available, fourcc, 8)),
        size => Some((size, fourcc, 8)),
    }
}

fn fourcc_str(fourcc: &[u8; 4]) -> String {
    String::from_utf8_lossy(fourcc).into_owned()
}

/// Bodies of the direct children of an in-memory box body
fn child_boxes(data: &[u8]) -> Vec<([u8; 4], &[u8])> {
    let mut children = Vec::new();
    let mut offset = 0usize;
    while offset < data.len() {
        let remaining = &data[offset..];
        let Some((size, fourcc, header)) = read_box_header(remaining, remaining.len() as u64)
        else {
            break;
        };
        let (size, header) = (size as usize, header as usize);
        if size < header || size > remaining.len() {
            break;
        }
        children.push((fourcc, &remaining[header..size]));
        offset += size;
    }
    children
}

fn find_child<'a>(data: &'a [u8], target: &[u8; 4]) -> Option<&'a [u8]> {
    child_boxes(data)
        .into_iter()
        .find(|(fourcc, _)| fourcc == target)
        .map(|(_, body)| body)
}

fn read_u32(data: &[u8], at: usize) -> Option<u32> {
    let bytes = data.get(at..at + 4)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn read_u64(data: &[u8], at: usize) -> Option<u64> {
    let bytes = data.get(at..at + 8)?;
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    Some(u64::from_be_bytes(buf))
}

/// Sample table of the first video track: `Ok(None)` when it holds no samples
fn first_video_sample(moov: &[u8]) -> Result<Option<(u64, u64)>, ProbeError> {
    let video_trak = child_boxes(moov)
        .into_iter()
        .filter(|(fourcc, _)| fourcc == b"trak")
        .find_map(|(_, trak)| {
            let mdia = find_child(trak, b"mdia")?;
            let hdlr = find_child(mdia, b"hdlr")?;
            // version/flags (4) + pre_defined (4) + handler_type (4)
            (hdlr.get(8..12)? == b"vide").then_some(mdia)
        })
        .ok_or(ProbeError::NoVideoTrack)?;

    let stbl = find_child(video_trak, b"minf")
        .and_then(|minf| find_child(minf, b"stbl"))
        .ok_or(ProbeError::MissingBox("stbl"))?;

    let stsz = find_child(stbl, b"stsz").ok_or(ProbeError::MissingBox("stsz"))?;
    let fixed_size = read_u32(stsz, 4).ok_or(ProbeError::MissingBox("stsz"))?;
    let sample_count = read_u32(stsz, 8).ok_or(ProbeError::MissingBox("stsz"))?;
    if sample_count == 0 {
        return Ok(None);
    }
    let sample_size = if fixed_size != 0 {
        fixed_size
    } else {
        read_u32(stsz, 12).ok_or(ProbeError::NoSamples)?
    };

    let chunk_offset = if let Some(stco) = find_child(stbl, b"stco") {
        if read_u32(stco, 4).unwrap_or(0) == 0 {
            return Ok(None);
        }
        read_u32(stco, 8).map(u64::from)
    } else if let Some(co64) = find_child(stbl, b"co64") {
        if read_u32(co64, 4).unwrap_or(0) == 0 {
            return Ok(None);
        }
        read_u64(co64, 8)
    } else {
        return Err(ProbeError::MissingBox("stco"));
    }
    .ok_or(ProbeError::NoSamples)?;

    Ok(Some((chunk_offset, sample_size as u64)))
}

async fn probe_container(path: &Path) -> Result<(), ProbeError> {
    let mut file = File::open(path).await?;
    let file_len = file.metadata().await?.len();
    if file_len == 0 {
        return Err(ProbeError::Empty);
    }

    let mut has_ftyp = false;
    let mut has_moof = false;
    let mut has_media_data = false;
    let mut moov: Option<Vec<u8>> = None;
    let mut offset = 0u64;

    for _ in 0..probe::MAX_TOP_LEVEL_BOXES {
        if offset >= file_len {
            break;
        }
        let available = file_len - offset;
        let mut header = vec![0u8; available.min(16) as usize];
        file.seek(SeekFrom::Start(offset)).await?;
        file.read_exact(&mut header).await?;

        let (size, fourcc, header_len) =
            read_box_header(&header, available).ok_or(ProbeError::MalformedBox { offset })?;
        if size < header_len {
            return Err(ProbeError::MalformedBox { offset });
        }
        if size > available {
            return Err(ProbeError::TruncatedBox {
                fourcc: fourcc_str(&fourcc),
                offset,
            });
        }

        match &fourcc {
            b"ftyp" => has_ftyp = true,
            b"moof" => has_moof = true,
            b"mdat" => has_media_data |= size > header_len,
            b"moov" => {
                let body_len = size - header_len;
                if body_len > probe::MAX_MOOV_SIZE {
                    return Err(ProbeError::OversizedMoov(body_len));
                }
                let mut body = vec![0u8; body_len as usize];
                file.seek(SeekFrom::Start(offset + header_len)).await?;
                file.read_exact(&mut body).await?;
                moov = Some(body);
            }
            _ => {}
        }

        offset += size;
    }

    if !has_ftyp {
        return Err(ProbeError::MissingBox("ftyp"));
    }
    let moov = moov.ok_or(ProbeError::MissingBox("moov"))?;

    let Some((sample_offset, sample_size)) = first_video_sample(&moov)? else {
        // Fragmented files keep their samples in moof/mdat pairs
        if has_moof && has_media_data {
            return Ok(());
        }
        return Err(ProbeError::NoSamples);
    };

    if sample_size == 0 {
        return Err(ProbeError::EmptySample);
    }
    match sample_offset.checked_add(sample_size) {
        Some(end) if end <= file_len => {}
        _ => return Err(ProbeError::SampleOutOfBounds),
    }

    let peek_len = sample_size.min(probe::SAMPLE_PEEK_BYTES as u64) as usize;
    let mut peek = vec![0u8; peek_len];
    file.seek(SeekFrom::Start(sample_offset)).await?;
    file.read_exact(&mut peek).await?;
    if peek.iter().all(|&b| b == 0) {
        return Err(ProbeError::BlankSample);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn mp4_box(fourcc: &[u8; 4], body: &[u8]) -> Vec<u8> {
        let mut out = ((body.len() + 8) as u32).to_be_bytes().to_vec();
        out.extend_from_slice(fourcc);
        out.extend_from_slice(body);
        out
    }

    fn moov_with_sample(handler: &[u8; 4], sample_count: u32, sample_len: u32, offset: u32) -> Vec<u8> {
        let mut hdlr = vec![0u8; 8];
        hdlr.extend_from_slice(handler);
        hdlr.extend_from_slice(&[0u8; 13]);

        let mut stsz = vec![0u8; 4];
        stsz.extend_from_slice(&0u32.to_be_bytes());
        stsz.extend_from_slice(&sample_count.to_be_bytes());
        if sample_count > 0 {
            stsz.extend_from_slice(&sample_len.to_be_bytes());
        }

        let mut stco = vec![0u8; 4];
        stco.extend_from_slice(&sample_count.min(1).to_be_bytes());
        if sample_count > 0 {
            stco.extend_from_slice(&offset.to_be_bytes());
        }

        let stbl = mp4_box(b"stbl", &[mp4_box(b"stsz", &stsz), mp4_box(b"stco", &stco)].concat());
        let minf = mp4_box(b"minf", &stbl);
        let mdia = mp4_box(b"mdia", &[mp4_box(b"hdlr", &hdlr), minf].concat());
        let trak = mp4_box(b"trak", &mdia);
        mp4_box(b"moov", &trak)
    }

    fn mp4_file(sample: &[u8]) -> Vec<u8> {
        let ftyp = mp4_box(b"ftyp", b"isom\0\0\x02\0isomiso2");
        let probe_moov = moov_with_sample(b"vide", 1, sample.len() as u32, 0);
        let offset = (ftyp.len() + probe_moov.len() + 8) as u32;
        let moov = moov_with_sample(b"vide", 1, sample.len() as u32, offset);
        [ftyp, moov, mp4_box(b"mdat", sample)].concat()
    }

    async fn write(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, bytes).await.unwrap();
        path
    }

    #[tokio::test]
    async fn test_valid_mp4_is_usable() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "ok.mp4", &mp4_file(b"\x00\x00\x01\x65frame-data")).await;

        let checker = ValidityChecker::default();
        assert!(checker.is_usable(&path).await);
    }

    #[tokio::test]
    async fn test_missing_and_empty_files_are_unusable() {
        let dir = TempDir::new().unwrap();
        let checker = ValidityChecker::default();

        let missing = dir.path().join("nope.mp4");
        assert_eq!(checker.classify(&missing).await, Validity::Missing);

        let empty = write(&dir, "empty.mp4", b"").await;
        assert!(!checker.is_usable(&empty).await);
        assert!(!ValidityChecker::new(ProbeMode::Size).is_usable(&empty).await);
    }

    #[tokio::test]
    async fn test_truncated_file_is_unusable() {
        let dir = TempDir::new().unwrap();
        let full = mp4_file(&[7u8; 512]);
        let path = write(&dir, "cut.mp4", &full[..full.len() - 100]).await;

        let checker = ValidityChecker::default();
        assert!(matches!(checker.classify(&path).await, Validity::Corrupt(_)));
    }

    #[tokio::test]
    async fn test_garbage_is_unusable() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "junk.mp4", b"<html>404 not found</html>").await;
        assert!(!ValidityChecker::default().is_usable(&path).await);

        // Size mode only requires content
        assert!(ValidityChecker::new(ProbeMode::Size).is_usable(&path).await);
    }

    #[tokio::test]
    async fn test_blank_first_sample_is_unusable() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "zeros.mp4", &mp4_file(&[0u8; 128])).await;

        match ValidityChecker::default().classify(&path).await {
            Validity::Corrupt(reason) => assert!(reason.contains("zero bytes")),
            other => panic!("expected corrupt, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_audio_only_file_is_unusable() {
        let dir = TempDir::new().unwrap();
        let ftyp = mp4_box(b"ftyp", b"M4A \0\0\0\0");
        let moov = moov_with_sample(b"soun", 1, 4, 0);
        let bytes = [ftyp, moov, mp4_box(b"mdat", b"abcd")].concat();
        let path = write(&dir, "audio.mp4", &bytes).await;

        assert!(!ValidityChecker::default().is_usable(&path).await);
    }

    #[tokio::test]
    async fn test_fragmented_mp4_is_usable() {
        let dir = TempDir::new().unwrap();
        let ftyp = mp4_box(b"ftyp", b"iso5\0\0\0\0");
        let moov = moov_with_sample(b"vide", 0, 0, 0);
        let moof = mp4_box(b"moof", &mp4_box(b"mfhd", &[0u8; 8]));
        let bytes = [ftyp.clone(), moov.clone(), moof, mp4_box(b"mdat", b"fragment")].concat();
        let path = write(&dir, "frag.mp4", &bytes).await;
        assert!(ValidityChecker::default().is_usable(&path).await);

        // Same header with no media at all
        let bytes = [ftyp, moov].concat();
        let path = write(&dir, "hollow.mp4", &bytes).await;
        assert!(!ValidityChecker::default().is_usable(&path).await);
    }

    #[test]
    fn test_read_box_header_sizes() {
        let mut large = 1u32.to_be_bytes().to_vec();
        large.extend_from_slice(b"mdat");
        large.extend_from_slice(&40u64.to_be_bytes());
        assert_eq!(read_box_header(&large, 100), Some((40, *b"mdat", 16)));

        let mut to_end = 0u32.to_be_bytes().to_vec();
        to_end.extend_from_slice(b"mdat");
        assert_eq!(read_box_header(&to_end, 77), Some((77, *b"mdat", 8)));

        assert_eq!(read_box_header(b"abc", 3), None);
    }

    #[test]
    fn test_report_counts() {
        let mut report = VerificationReport::new();
        report.record(Path::new("a"), Validity::Usable);
        report.record(Path::new("b"), Validity::Missing);
        report.record(Path::new("c"), Validity::Corrupt("bad".into()));

        assert_eq!(report.files_checked, 3);
        assert_eq!(report.files_usable, 1);
        assert_eq!(report.files_missing, 1);
        assert_eq!(report.files_corrupt, 1);
        assert!(!report.is_complete());
        assert_eq!(report.corrupt_files[0].1, "bad");
    }
}
