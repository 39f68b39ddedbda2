//! Builders for the BAM, FASTA and CIF fixtures used by the integration tests.

use std::fs;
use std::io::Write;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use bcqc_lib::record::{Cigar, CigarKind};
use bstr::BString;
use noodles::bam;
use noodles::core::Position;
use noodles::sam::Header;
use noodles::sam::alignment::RecordBuf;
use noodles::sam::alignment::io::Write as AlignmentWrite;
use noodles::sam::alignment::record::Flags;
use noodles::sam::alignment::record::cigar::Op;
use noodles::sam::alignment::record::cigar::op::Kind;
use noodles::sam::alignment::record_buf::Sequence;
use noodles::sam::header::record::value::{Map, map::ReferenceSequence};

/// A deterministic, non-repetitive-looking reference sequence of `len` bases.
pub fn reference_sequence(len: usize, seed: usize) -> Vec<u8> {
    const PATTERN: &[u8] = b"ACGTTGCAAGCTTCGA";
    (0..len).map(|i| PATTERN[(i * 7 + i / 11 + seed) % PATTERN.len()]).collect()
}

/// Creates a header with the given `(name, length)` reference sequences.
pub fn create_header(references: &[(&str, usize)]) -> Header {
    references
        .iter()
        .fold(Header::builder(), |builder, (name, len)| {
            builder.add_reference_sequence(
                BString::from(*name),
                Map::<ReferenceSequence>::new(
                    NonZeroUsize::new(*len).expect("reference length must be non-zero"),
                ),
            )
        })
        .build()
}

/// Builds a mapped record.
///
/// `start` is the 1-based alignment start and `cigar` a SAM CIGAR string.
pub fn mapped_record(
    name: &str,
    ref_id: usize,
    start: usize,
    reverse: bool,
    cigar: &str,
    bases: &[u8],
) -> RecordBuf {
    let cigar: Cigar = cigar.parse().expect("valid CIGAR");
    let mut record = RecordBuf::default();
    *record.name_mut() = Some(BString::from(name));
    *record.flags_mut() = if reverse { Flags::REVERSE_COMPLEMENTED } else { Flags::empty() };
    *record.reference_sequence_id_mut() = Some(ref_id);
    *record.alignment_start_mut() = Some(Position::try_from(start).expect("1-based start"));
    *record.cigar_mut() = cigar
        .ops()
        .iter()
        .map(|op| {
            let kind = match op.kind {
                CigarKind::Match => Kind::Match,
                CigarKind::Insertion => Kind::Insertion,
                CigarKind::Deletion => Kind::Deletion,
                CigarKind::SoftClip => Kind::SoftClip,
                CigarKind::HardClip => Kind::HardClip,
            };
            Op::new(kind, op.len)
        })
        .collect();
    *record.sequence_mut() = Sequence::from(bases.to_vec());
    record
}

/// Builds an unmapped record.
pub fn unmapped_record(name: &str, bases: &[u8]) -> RecordBuf {
    let mut record = RecordBuf::default();
    *record.name_mut() = Some(BString::from(name));
    *record.flags_mut() = Flags::UNMAPPED;
    *record.sequence_mut() = Sequence::from(bases.to_vec());
    record
}

/// Writes `records` to a BAM file at `path`.
pub fn write_bam(path: &Path, header: &Header, records: &[RecordBuf]) {
    let mut writer =
        bam::io::Writer::new(fs::File::create(path).expect("Failed to create BAM file"));
    writer.write_header(header).expect("Failed to write header");
    for record in records {
        writer.write_alignment_record(header, record).expect("Failed to write record");
    }
    writer.finish(header).expect("Failed to finish BAM");
}

/// Writes a FASTA file holding one record, wrapped at 60 bases per line.
pub fn write_fasta(path: &Path, name: &str, sequence: &[u8]) {
    let mut file = fs::File::create(path).expect("Failed to create FASTA");
    writeln!(file, ">{name}").expect("Failed to write FASTA");
    for line in sequence.chunks(60) {
        file.write_all(line).expect("Failed to write FASTA");
        writeln!(file).expect("Failed to write FASTA");
    }
}

/// Writes `<dir>/<name>.fa` for every `(name, sequence)` pair.
pub fn write_fasta_dir(dir: &Path, chromosomes: &[(&str, &[u8])]) -> Vec<PathBuf> {
    chromosomes
        .iter()
        .map(|(name, sequence)| {
            let path = dir.join(format!("{name}.fa"));
            write_fasta(&path, name, sequence);
            path
        })
        .collect()
}

/// Writes a CIF file with 16-bit samples taken from `value(cycle, channel, cluster)`.
pub fn write_cif(
    path: &Path,
    first_cycle: u16,
    cycles: u16,
    clusters: u32,
    value: impl Fn(u16, usize, u32) -> i16,
) {
    let mut bytes = b"CIF".to_vec();
    bytes.push(1);
    bytes.push(2);
    bytes.extend_from_slice(&first_cycle.to_le_bytes());
    bytes.extend_from_slice(&cycles.to_le_bytes());
    bytes.extend_from_slice(&clusters.to_le_bytes());
    for cycle in 0..cycles {
        for channel in 0..4 {
            for cluster in 0..clusters {
                bytes.extend_from_slice(&value(cycle, channel, cluster).to_le_bytes());
            }
        }
    }
    fs::write(path, bytes).expect("Failed to write CIF");
}
